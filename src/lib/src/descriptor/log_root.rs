//! Trillian `LogRoot` v1, the structure a log signs.
//!
//! ```text
//! u16 version (= 1)
//! u64 tree_size
//! u8  root_hash_size (= 32)
//! [root_hash_size] root_hash
//! u64 timestamp_nanos
//! u64 revision
//! u16 metadata_size
//! [metadata_size] metadata
//! ```

use std::fmt;

use crate::error::ParseError;
use crate::hash::{Digest, DIGEST_SIZE};
use crate::reader::ByteReader;

pub const LOG_ROOT_VERSION: u16 = 1;

/// Encoded size of a log root without metadata.
pub const LOG_ROOT_FIXED_SIZE: usize = 2 + 8 + 1 + DIGEST_SIZE + 8 + 8 + 2;

/// Largest possible encoded log root.
pub const LOG_ROOT_MAX_SIZE: usize = LOG_ROOT_FIXED_SIZE + u16::MAX as usize;

/// A signed tree head: the root hash of the log at `tree_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRoot {
    tree_size: u64,
    root_hash: Digest,
    timestamp_nanos: u64,
    revision: u64,
    metadata: Vec<u8>,
}

impl LogRoot {
    pub fn new(
        tree_size: u64,
        root_hash: Digest,
        timestamp_nanos: u64,
        revision: u64,
        metadata: Vec<u8>,
    ) -> Result<Self, ParseError> {
        if metadata.len() > u16::MAX as usize {
            return Err(ParseError::FieldTooLarge {
                field: "log_root_metadata",
                size: metadata.len(),
                max: u16::MAX as usize,
            });
        }
        Ok(Self {
            tree_size,
            root_hash,
            timestamp_nanos,
            revision,
            metadata,
        })
    }

    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let version = reader.read_u16()?;
        if version != LOG_ROOT_VERSION {
            return Err(ParseError::UnsupportedLogRootVersion(version));
        }
        let tree_size = reader.read_u64()?;
        let root_hash_size = reader.read_u8()?;
        if root_hash_size as usize != DIGEST_SIZE {
            return Err(ParseError::InvalidRootHashSize(root_hash_size));
        }
        let root_hash = reader.read_array::<DIGEST_SIZE>()?;
        let timestamp_nanos = reader.read_u64()?;
        let revision = reader.read_u64()?;
        let metadata_size = reader.read_u16()? as usize;
        let metadata = reader.read_bytes(metadata_size)?.to_vec();

        Ok(Self {
            tree_size,
            root_hash,
            timestamp_nanos,
            revision,
            metadata,
        })
    }

    /// Canonical encoding. This is the exact message the log signed.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&LOG_ROOT_VERSION.to_be_bytes());
        out.extend_from_slice(&self.tree_size.to_be_bytes());
        out.push(DIGEST_SIZE as u8);
        out.extend_from_slice(&self.root_hash);
        out.extend_from_slice(&self.timestamp_nanos.to_be_bytes());
        out.extend_from_slice(&self.revision.to_be_bytes());
        // Length bounded by the constructor and the parser
        out.extend_from_slice(&(self.metadata.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.metadata);
    }

    pub fn encoded_len(&self) -> usize {
        LOG_ROOT_FIXED_SIZE + self.metadata.len()
    }

    pub fn tree_size(&self) -> u64 {
        self.tree_size
    }

    pub fn root_hash(&self) -> &Digest {
        &self.root_hash
    }

    pub fn timestamp_nanos(&self) -> u64 {
        self.timestamp_nanos
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

impl fmt::Display for LogRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Log Root Descriptor:")?;
        writeln!(f, "      {:<23}{}", "Version:", LOG_ROOT_VERSION)?;
        writeln!(f, "      {:<23}{}", "Tree size:", self.tree_size)?;
        writeln!(f, "      {:<23}{}", "Root hash:", hex::encode(self.root_hash))?;
        writeln!(f, "      {:<23}{}", "Timestamp (ns):", self.timestamp_nanos)?;
        writeln!(f, "      {:<23}{}", "Revision:", self.revision)?;
        writeln!(f, "      {:<23}{}", "Metadata size:", self.metadata.len())?;
        if !self.metadata.is_empty() {
            writeln!(f, "      {:<23}{}", "Metadata:", hex::encode(&self.metadata))?;
        }
        Ok(())
    }
}
