//! Fixtures shared by the integration tests: a small log with real keys.

#![allow(dead_code)]

use aftl::descriptor::HEADER_SIZE;
use aftl::hash::digest;
use aftl::merkle::MerkleTree;
use aftl::{
    FirmwareInfo, FirmwareInfoLeaf, IcpEntry, LogDescriptor, LogPublicKey, LogRoot, TrustStore,
    TrustedLog,
};
use ed25519_compact::{KeyPair, Seed};
use p256::ecdsa::signature::Signer;

pub const LOG_URL: &str = "aftl.example.com:9000";
pub const OTHER_LOG_URL: &str = "other-log.example.com:9000";

pub const METADATA: &[u8] = b"\x00\x00\x00\x01vbmeta header and descriptors, signed by the OEM";

/// A transparency log that can sign tree heads.
pub enum TestLog {
    Ed25519(KeyPair),
    EcdsaP256(p256::ecdsa::SigningKey),
    Rsa(rsa::RsaPrivateKey),
}

impl TestLog {
    pub fn ed25519(seed: u8) -> Self {
        TestLog::Ed25519(KeyPair::from_seed(Seed::new([seed; 32])))
    }

    pub fn ecdsa_p256(seed: u8) -> Self {
        TestLog::EcdsaP256(p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap())
    }

    /// The 2048-bit key in `tests/data/rsa_log.pem`.
    pub fn rsa() -> Self {
        use rsa::pkcs8::DecodePrivateKey;
        let pem = include_str!("../data/rsa_log.pem");
        TestLog::Rsa(rsa::RsaPrivateKey::from_pkcs8_pem(pem).unwrap())
    }

    pub fn public_key(&self) -> LogPublicKey {
        match self {
            TestLog::Ed25519(kp) => LogPublicKey::Ed25519(kp.pk),
            TestLog::EcdsaP256(sk) => LogPublicKey::EcdsaP256(*sk.verifying_key()),
            TestLog::Rsa(key) => LogPublicKey::Rsa(key.to_public_key()),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            TestLog::Ed25519(kp) => kp.sk.sign(message, None).to_vec(),
            TestLog::EcdsaP256(sk) => {
                let signature: p256::ecdsa::Signature = sk.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            TestLog::Rsa(key) => {
                use rsa::signature::SignatureEncoding;
                rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(key.clone())
                    .sign(message)
                    .to_vec()
            }
        }
    }
}

pub fn trust_store(logs: &[(&str, &TestLog)]) -> TrustStore {
    TrustStore::new(
        logs.iter()
            .map(|(identity, log)| TrustedLog::new(*identity, log.public_key()))
            .collect(),
    )
    .unwrap()
}

/// An entry proving that a leaf for `metadata` sits at `leaf_index` in a
/// tree of `tree_size` leaves, signed by `log`.
pub fn build_entry(
    metadata: &[u8],
    log_url: &str,
    log: &TestLog,
    leaf_index: u64,
    tree_size: u64,
) -> IcpEntry {
    let mut info = FirmwareInfo::new(digest(metadata));
    info.version_incremental = Some("5524043".to_string());
    info.description = Some("test build".to_string());
    let leaf = FirmwareInfoLeaf::new(info).unwrap();

    let mut tree = MerkleTree::new();
    for i in 0..tree_size {
        if i == leaf_index {
            tree.push(leaf.as_bytes());
        } else {
            tree.push(format!("unrelated leaf {}", i).as_bytes());
        }
    }
    let proofs = tree.inclusion_path(leaf_index).unwrap();
    let log_root =
        LogRoot::new(tree_size, tree.root(), 1_600_000_000_000_000_000, 3, vec![]).unwrap();
    let signature = log.sign(&log_root.encode());

    IcpEntry::new(log_url, leaf_index, log_root, leaf, signature, proofs).unwrap()
}

pub fn blob(metadata: &[u8], entries: Vec<IcpEntry>) -> Vec<u8> {
    let mut blob = metadata.to_vec();
    blob.extend(LogDescriptor::new(entries).unwrap().encode().unwrap());
    blob
}

/// Byte offsets of the fields of the first entry inside a blob.
pub struct EntryLayout {
    pub leaf_index: usize,
    pub root_hash: usize,
    pub fw_info_leaf: usize,
    pub signature: usize,
    pub proofs: usize,
}

pub fn first_entry_layout(metadata_len: usize, entry: &IcpEntry) -> EntryLayout {
    let start = metadata_len + HEADER_SIZE;
    let log_root = start + 27 + entry.log_url().len();
    let fw_info_leaf = log_root + entry.log_root().encoded_len();
    let signature = fw_info_leaf + entry.fw_info_leaf().as_bytes().len();
    EntryLayout {
        leaf_index: start + 4,
        root_hash: log_root + 11,
        fw_info_leaf,
        signature,
        proofs: signature + entry.log_root_signature().len(),
    }
}
