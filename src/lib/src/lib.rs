//! Offline verification of Android Firmware Transparency Log (AFTL)
//! inclusion proofs embedded in vbmeta images.
//!
//! A vbmeta blob may carry an AFTL descriptor holding one or more inclusion
//! proofs. Each proof claims that a transparency log recorded a firmware-info
//! leaf naming the blob's SHA-256, and that the log signed a tree root
//! containing that leaf. [`AftlVerifier`] checks those claims against a
//! fixed [`TrustStore`] of log keys.
//!
//! ```rust,ignore
//! use aftl::{AftlVerifier, TrustStore, VerificationPolicy};
//!
//! let trust_store = TrustStore::from_json(include_str!("trusted_logs.json"))?;
//! let verifier = AftlVerifier::new(trust_store, VerificationPolicy::default());
//! verifier.enforce(&vbmeta)?;
//! ```

#![forbid(unsafe_code)]

mod ct;
mod error;

pub mod reader;

/// SHA-256, the only hash the AFTL format uses
pub mod hash;

pub mod descriptor;
pub mod merkle;
pub mod policy;
pub mod signature;
pub mod trust;
pub mod verifier;

pub use descriptor::{
    find_descriptor, DescriptorLimits, DescriptorLocation, FirmwareInfo, FirmwareInfoLeaf,
    IcpEntry, LogDescriptor, LogRoot,
};
pub use error::*;
pub use policy::{EntryPolicy, FailureMode, MissingDescriptorPolicy, VerificationPolicy};
pub use signature::{verify_root_signature, LogPublicKey, SignatureAlgorithm, SignatureFailure};
pub use trust::{TrustStore, TrustedLog};
pub use verifier::{
    AftlVerifier, EntryOutcome, FailedGate, VerificationReport, VerificationResult,
};

pub mod reexports {
    pub use {log, thiserror};
}
