//! Trusted transparency logs.
//!
//! The store is built once, typically from a JSON document embedded in the
//! boot image, and never changes afterwards:
//!
//! ```json
//! {
//!   "logs": [
//!     {
//!       "identity": "aftl.example.com:9000",
//!       "algorithm": "ed25519",
//!       "public_key": "MCowBQYDK2VwAyEA..."
//!     },
//!     {
//!       "identity": "aftl-test.example.com:9000",
//!       "algorithm": "rsa-pkcs1-sha256",
//!       "public_key": "-----BEGIN PUBLIC KEY-----\nMIICIjANBgkq..."
//!     }
//!   ]
//! }
//! ```
//!
//! `algorithm` is one of `ed25519`, `ecdsa-p256-sha256` or `rsa-pkcs1-sha256`.
//! `public_key` is either a PEM block or base64 of the raw, SEC1, PKCS#1 or
//! DER key.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::debug;
use serde::Deserialize;

use crate::error::AftlError;
use crate::signature::{LogPublicKey, SignatureAlgorithm};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrustStoreFile {
    logs: Vec<TrustedLogFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrustedLogFile {
    identity: String,
    algorithm: SignatureAlgorithm,
    public_key: String,
}

/// A log the device is willing to accept inclusion proofs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedLog {
    identity: String,
    public_key: LogPublicKey,
}

impl TrustedLog {
    pub fn new(identity: impl Into<String>, public_key: LogPublicKey) -> Self {
        Self {
            identity: identity.into(),
            public_key,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.public_key.algorithm()
    }

    pub fn public_key(&self) -> &LogPublicKey {
        &self.public_key
    }
}

/// Immutable set of trusted logs, keyed by identity.
#[derive(Debug, Clone)]
pub struct TrustStore {
    logs: Vec<TrustedLog>,
}

impl TrustStore {
    /// Duplicate identities are rejected so a lookup is never ambiguous.
    pub fn new(logs: Vec<TrustedLog>) -> Result<Self, AftlError> {
        let mut seen = HashSet::new();
        for log in &logs {
            if !seen.insert(log.identity.as_str()) {
                return Err(AftlError::TrustStoreError(format!(
                    "duplicate log identity: {}",
                    log.identity
                )));
            }
        }
        Ok(Self { logs })
    }

    pub fn from_json(json: &str) -> Result<Self, AftlError> {
        let file: TrustStoreFile = serde_json::from_str(json)?;
        let mut logs = Vec::with_capacity(file.logs.len());
        for entry in file.logs {
            let key = entry.public_key.trim();
            let public_key = if key.starts_with("-----BEGIN") {
                LogPublicKey::from_pem(entry.algorithm, key)?
            } else {
                LogPublicKey::from_bytes(entry.algorithm, &BASE64.decode(key)?)?
            };
            debug!("Loaded {} key for log {}", entry.algorithm, entry.identity);
            logs.push(TrustedLog::new(entry.identity, public_key));
        }
        Self::new(logs)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AftlError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, identity: &str) -> Option<&TrustedLog> {
        self.logs.iter().find(|log| log.identity == identity)
    }

    pub fn logs(&self) -> &[TrustedLog] {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePublicKey;
    use std::io::Write;

    fn ed25519_pk() -> ed25519_compact::PublicKey {
        ed25519_compact::KeyPair::from_seed(ed25519_compact::Seed::new([1u8; 32])).pk
    }

    fn p256_vk() -> p256::ecdsa::VerifyingKey {
        *p256::ecdsa::SigningKey::from_slice(&[0x22; 32])
            .unwrap()
            .verifying_key()
    }

    #[test]
    fn test_from_json() {
        let pem = p256_vk().to_public_key_pem(Default::default()).unwrap();
        let json = serde_json::json!({
            "logs": [
                {
                    "identity": "a.example:9000",
                    "algorithm": "ed25519",
                    "public_key": BASE64.encode(*ed25519_pk()),
                },
                {
                    "identity": "b.example:9000",
                    "algorithm": "ecdsa-p256-sha256",
                    "public_key": pem,
                }
            ]
        })
        .to_string();

        let store = TrustStore::from_json(&json).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("a.example:9000").unwrap().algorithm(),
            SignatureAlgorithm::Ed25519
        );
        assert_eq!(
            store.get("b.example:9000").unwrap().public_key(),
            &LogPublicKey::EcdsaP256(p256_vk())
        );
        assert!(store.get("c.example:9000").is_none());
    }

    #[test]
    fn test_rsa_log_from_json() {
        use rsa::pkcs1::EncodeRsaPublicKey;
        use rsa::pkcs8::DecodePrivateKey;

        let public = rsa::RsaPrivateKey::from_pkcs8_pem(include_str!("../tests/data/rsa_log.pem"))
            .unwrap()
            .to_public_key();
        let json = serde_json::json!({
            "logs": [
                {
                    "identity": "pem.example:9000",
                    "algorithm": "rsa-pkcs1-sha256",
                    "public_key": public.to_pkcs1_pem(Default::default()).unwrap(),
                },
                {
                    "identity": "der.example:9000",
                    "algorithm": "rsa-pkcs1-sha256",
                    "public_key": BASE64.encode(public.to_public_key_der().unwrap().as_bytes()),
                }
            ]
        })
        .to_string();

        let store = TrustStore::from_json(&json).unwrap();
        for identity in ["pem.example:9000", "der.example:9000"] {
            let log = store.get(identity).unwrap();
            assert_eq!(log.algorithm(), SignatureAlgorithm::RsaPkcs1Sha256);
            assert_eq!(log.public_key(), &LogPublicKey::Rsa(public.clone()));
        }
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let logs = vec![
            TrustedLog::new("same", LogPublicKey::Ed25519(ed25519_pk())),
            TrustedLog::new("same", LogPublicKey::EcdsaP256(p256_vk())),
        ];
        assert!(matches!(
            TrustStore::new(logs),
            Err(AftlError::TrustStoreError(_))
        ));
    }

    #[test]
    fn test_bad_documents() {
        assert!(TrustStore::from_json("not json").is_err());
        assert!(TrustStore::from_json(r#"{"logs":[],"extra":1}"#).is_err());
        assert!(TrustStore::from_json(
            r#"{"logs":[{"identity":"x","algorithm":"rsa","public_key":""}]}"#
        )
        .is_err());
        // Algorithm and key type must agree
        let ed25519_key = BASE64.encode(*ed25519_pk());
        assert!(TrustStore::from_json(&format!(
            r#"{{"logs":[{{"identity":"x","algorithm":"rsa-pkcs1-sha256","public_key":"{}"}}]}}"#,
            ed25519_key
        ))
        .is_err());
        assert!(TrustStore::from_json(
            r#"{"logs":[{"identity":"x","algorithm":"ed25519","public_key":"!!"}]}"#
        )
        .is_err());
        assert!(TrustStore::from_json(r#"{"logs":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_from_file() {
        let json = serde_json::json!({
            "logs": [{
                "identity": "log",
                "algorithm": "ed25519",
                "public_key": ed25519_pk().to_pem(),
            }]
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.to_string().as_bytes()).unwrap();
        let store = TrustStore::from_file(file.path()).unwrap();
        assert_eq!(store.logs()[0].identity(), "log");

        assert!(matches!(
            TrustStore::from_file("/nonexistent/trust.json"),
            Err(AftlError::IOError(_))
        ));
    }
}
