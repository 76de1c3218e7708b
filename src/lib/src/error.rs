use crate::verifier::FailedGate;

/// Structural problems found while decoding an AFTL descriptor.
///
/// Every variant is recovered locally by rejecting the whole descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Read out of bounds at offset {offset}: needed {needed} bytes, {available} available")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Bad magic")]
    BadMagic,

    #[error("Unsupported descriptor version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("Declared size {declared} does not match actual size {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("Too many entries: {count} (max: {max})")]
    TooManyEntries { count: usize, max: usize },

    #[error("Descriptor has no inclusion proof entries")]
    NoEntries,

    #[error("Field {field} too large: {size} bytes (max: {max})")]
    FieldTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },

    #[error("Log URL is not printable ASCII")]
    InvalidLogUrl,

    #[error("Unsupported log root version {0}")]
    UnsupportedLogRootVersion(u16),

    #[error("Invalid root hash size {0}")]
    InvalidRootHashSize(u8),

    #[error("Tree size cannot be zero")]
    EmptyTree,

    #[error("Leaf index {leaf_index} is out of range for tree size {tree_size}")]
    LeafIndexOutOfRange { leaf_index: u64, tree_size: u64 },

    #[error("Audit path has {actual} hashes, expected {expected}")]
    ProofLengthMismatch { expected: usize, actual: usize },

    #[error("Invalid firmware info leaf: {0}")]
    InvalidFirmwareInfo(String),
}

/// The AFTL error type.
#[derive(Debug, thiserror::Error)]
pub enum AftlError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error")]
    IOError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Trust store error: {0}")]
    TrustStoreError(String),

    #[error("Invalid public key: {0}")]
    KeyError(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("No AFTL descriptor found")]
    NoDescriptor,

    #[error("Verification failed on entry {entry_index}: {gate}")]
    VerificationFailed { entry_index: usize, gate: FailedGate },

    #[error("Invalid argument")]
    InvalidArgument,

    #[error("Usage error: {0}")]
    UsageError(&'static str),
}

impl From<ed25519_compact::Error> for AftlError {
    fn from(err: ed25519_compact::Error) -> Self {
        AftlError::KeyError(format!("{:?}", err))
    }
}
