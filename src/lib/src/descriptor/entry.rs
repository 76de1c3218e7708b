use std::fmt;

use log::debug;

use super::fw_info::FirmwareInfoLeaf;
use super::log_root::{LogRoot, LOG_ROOT_MAX_SIZE};
use super::{DescriptorLimits, ENTRY_HEADER_SIZE};
use crate::error::ParseError;
use crate::hash::{Digest, DIGEST_SIZE};
use crate::merkle;
use crate::reader::ByteReader;

/// One inclusion proof: a log's claim that a firmware-info leaf is at
/// `leaf_index` in the tree described by the signed `log_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcpEntry {
    log_url: String,
    leaf_index: u64,
    log_root: LogRoot,
    fw_info_leaf: FirmwareInfoLeaf,
    log_root_signature: Vec<u8>,
    proofs: Vec<Digest>,
}

fn is_valid_log_url(url: &[u8]) -> bool {
    !url.is_empty() && url.iter().all(|c| c.is_ascii_graphic())
}

fn check_size(field: &'static str, size: usize, max: usize) -> Result<(), ParseError> {
    if size > max {
        debug!("{} too large: {} > {}", field, size, max);
        return Err(ParseError::FieldTooLarge { field, size, max });
    }
    Ok(())
}

/// Tree invariants shared by the parser and the constructor.
fn check_tree(leaf_index: u64, tree_size: u64, proof_count: usize) -> Result<(), ParseError> {
    if tree_size == 0 {
        return Err(ParseError::EmptyTree);
    }
    let expected = merkle::inclusion_path_len(leaf_index, tree_size).ok_or(
        ParseError::LeafIndexOutOfRange {
            leaf_index,
            tree_size,
        },
    )?;
    if proof_count != expected {
        return Err(ParseError::ProofLengthMismatch {
            expected,
            actual: proof_count,
        });
    }
    Ok(())
}

impl IcpEntry {
    /// Build an entry, enforcing only what the wire format can represent.
    ///
    /// Parse-time caps are not applied here, so an over-limit entry can be
    /// built and encoded. Use [`IcpEntry::validate`] to check an entry
    /// against the [`DescriptorLimits`] a verifier will parse it with.
    pub fn new(
        log_url: impl Into<String>,
        leaf_index: u64,
        log_root: LogRoot,
        fw_info_leaf: FirmwareInfoLeaf,
        log_root_signature: Vec<u8>,
        proofs: Vec<Digest>,
    ) -> Result<Self, ParseError> {
        let log_url = log_url.into();
        if !is_valid_log_url(log_url.as_bytes()) {
            return Err(ParseError::InvalidLogUrl);
        }
        check_size("log_url", log_url.len(), u32::MAX as usize)?;
        check_size("fw_info_leaf", fw_info_leaf.as_bytes().len(), u32::MAX as usize)?;
        check_size(
            "log_root_signature",
            log_root_signature.len(),
            u16::MAX as usize,
        )?;
        check_tree(leaf_index, log_root.tree_size(), proofs.len())?;

        Ok(Self {
            log_url,
            leaf_index,
            log_root,
            fw_info_leaf,
            log_root_signature,
            proofs,
        })
    }

    /// Check the entry against parse-time caps.
    pub fn validate(&self, limits: &DescriptorLimits) -> Result<(), ParseError> {
        check_size("log_url", self.log_url.len(), limits.max_log_url_size)?;
        check_size(
            "fw_info_leaf",
            self.fw_info_leaf.as_bytes().len(),
            limits.max_fw_info_leaf_size,
        )?;
        check_size(
            "log_root_signature",
            self.log_root_signature.len(),
            limits.max_signature_size,
        )
    }

    pub(crate) fn parse(
        reader: &mut ByteReader<'_>,
        limits: &DescriptorLimits,
    ) -> Result<Self, ParseError> {
        let log_url_size = reader.read_u32()? as usize;
        let leaf_index = reader.read_u64()?;
        let log_root_size = reader.read_u32()? as usize;
        let fw_info_leaf_size = reader.read_u32()? as usize;
        let log_root_signature_size = reader.read_u16()? as usize;
        let proof_hash_count = reader.read_u8()? as usize;
        let proof_size = reader.read_u32()? as usize;

        check_size("log_url", log_url_size, limits.max_log_url_size)?;
        check_size("log_root", log_root_size, LOG_ROOT_MAX_SIZE)?;
        check_size("fw_info_leaf", fw_info_leaf_size, limits.max_fw_info_leaf_size)?;
        check_size(
            "log_root_signature",
            log_root_signature_size,
            limits.max_signature_size,
        )?;

        let log_url = reader.read_bytes(log_url_size)?;
        if !is_valid_log_url(log_url) {
            return Err(ParseError::InvalidLogUrl);
        }
        let log_url = String::from_utf8_lossy(log_url).into_owned();

        let mut log_root_reader = reader.sub_reader(log_root_size)?;
        let log_root = LogRoot::parse(&mut log_root_reader)?;
        if !log_root_reader.is_empty() {
            debug!(
                "Log root declared {} bytes, {} left over",
                log_root_size,
                log_root_reader.remaining()
            );
            return Err(ParseError::SizeMismatch {
                declared: log_root_size,
                actual: log_root.encoded_len(),
            });
        }

        let fw_info_leaf = FirmwareInfoLeaf::parse(reader.read_bytes(fw_info_leaf_size)?)?;
        let log_root_signature = reader.read_bytes(log_root_signature_size)?.to_vec();

        check_tree(leaf_index, log_root.tree_size(), proof_hash_count)?;
        if proof_size != proof_hash_count * DIGEST_SIZE {
            return Err(ParseError::SizeMismatch {
                declared: proof_size,
                actual: proof_hash_count * DIGEST_SIZE,
            });
        }
        // proof_hash_count is a u8, so this allocation is small
        let mut proofs = Vec::with_capacity(proof_hash_count);
        for _ in 0..proof_hash_count {
            proofs.push(reader.read_array::<DIGEST_SIZE>()?);
        }

        Ok(Self {
            log_url,
            leaf_index,
            log_root,
            fw_info_leaf,
            log_root_signature,
            proofs,
        })
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        // Field lengths were bounded when the entry was built
        out.extend_from_slice(&(self.log_url.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.leaf_index.to_be_bytes());
        out.extend_from_slice(&(self.log_root.encoded_len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.fw_info_leaf.as_bytes().len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.log_root_signature.len() as u16).to_be_bytes());
        out.push(self.proofs.len() as u8);
        out.extend_from_slice(&((self.proofs.len() * DIGEST_SIZE) as u32).to_be_bytes());

        out.extend_from_slice(self.log_url.as_bytes());
        self.log_root.write_to(out);
        out.extend_from_slice(self.fw_info_leaf.as_bytes());
        out.extend_from_slice(&self.log_root_signature);
        for proof in &self.proofs {
            out.extend_from_slice(proof);
        }
    }

    pub fn encoded_len(&self) -> usize {
        ENTRY_HEADER_SIZE
            + self.log_url.len()
            + self.log_root.encoded_len()
            + self.fw_info_leaf.as_bytes().len()
            + self.log_root_signature.len()
            + self.proofs.len() * DIGEST_SIZE
    }

    pub fn log_url(&self) -> &str {
        &self.log_url
    }

    /// Key selector for the trust store.
    pub fn log_identity(&self) -> &str {
        &self.log_url
    }

    pub fn leaf_index(&self) -> u64 {
        self.leaf_index
    }

    pub fn tree_size(&self) -> u64 {
        self.log_root.tree_size()
    }

    pub fn log_root(&self) -> &LogRoot {
        &self.log_root
    }

    pub fn log_root_hash(&self) -> &Digest {
        self.log_root.root_hash()
    }

    pub fn fw_info_leaf(&self) -> &FirmwareInfoLeaf {
        &self.fw_info_leaf
    }

    pub fn vbmeta_hash(&self) -> &Digest {
        self.fw_info_leaf.vbmeta_hash()
    }

    pub fn log_root_signature(&self) -> &[u8] {
        &self.log_root_signature
    }

    /// Audit path, leaf side first.
    pub fn proofs(&self) -> &[Digest] {
        &self.proofs
    }
}

impl fmt::Display for IcpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    {:<25}{}", "Transparency Log:", self.log_url)?;
        writeln!(f, "    {:<25}{}", "Leaf index:", self.leaf_index)?;
        writeln!(f, "    ICP hashes:")?;
        for proof in &self.proofs {
            writeln!(f, "      {}", hex::encode(proof))?;
        }
        write!(f, "{}", self.log_root)?;
        write!(f, "{}", self.fw_info_leaf)?;
        writeln!(
            f,
            "    {:<25}{}",
            "Log root signature:",
            hex::encode(&self.log_root_signature)
        )
    }
}
