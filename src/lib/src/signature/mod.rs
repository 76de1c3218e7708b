//! Log root signature checks.
//!
//! The signed message is the canonical [`LogRoot`](crate::descriptor::LogRoot)
//! encoding. The key is chosen by log identity from the trust store and the
//! algorithm is dispatched by the key's type.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::AftlError;
use crate::trust::TrustStore;

mod keys;

pub use keys::LogPublicKey;

/// Signature schemes a log may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "ecdsa-p256-sha256")]
    EcdsaP256Sha256,
    /// RSASSA-PKCS1-v1_5 with SHA-256, as used by Trillian-backed AFTL logs
    #[serde(rename = "rsa-pkcs1-sha256")]
    RsaPkcs1Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Ed25519 => "ed25519",
            SignatureAlgorithm::EcdsaP256Sha256 => "ecdsa-p256-sha256",
            SignatureAlgorithm::RsaPkcs1Sha256 => "rsa-pkcs1-sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AftlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(SignatureAlgorithm::Ed25519),
            "ecdsa-p256-sha256" => Ok(SignatureAlgorithm::EcdsaP256Sha256),
            "rsa-pkcs1-sha256" => Ok(SignatureAlgorithm::RsaPkcs1Sha256),
            other => Err(AftlError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Why a log root signature was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFailure {
    /// The log is not in the trust store
    UnknownLog,
    Invalid,
}

/// Verify that the log named `log_identity` signed `signed_message`.
pub fn verify_root_signature(
    trust_store: &TrustStore,
    log_identity: &str,
    signed_message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureFailure> {
    let trusted = trust_store.get(log_identity).ok_or_else(|| {
        debug!("No trusted key for log {}", log_identity);
        SignatureFailure::UnknownLog
    })?;
    if !trusted.public_key().verify(signed_message, signature) {
        debug!(
            "{} signature from log {} did not verify",
            trusted.algorithm(),
            log_identity
        );
        return Err(SignatureFailure::Invalid);
    }
    Ok(())
}
