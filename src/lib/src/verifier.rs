//! Verification orchestrator.
//!
//! Each inclusion proof entry goes through three gates in a fixed order:
//!
//! 1. **Hash**: the firmware-info leaf names the SHA-256 of the metadata
//!    being verified.
//! 2. **Root**: the leaf, its index and the audit path rebuild the root
//!    hash of the signed log root.
//! 3. **Signature**: the log is trusted and its key signed that log root.
//!
//! Entry results are then combined according to the
//! [`VerificationPolicy`]. Anything other than [`VerificationResult::Ok`]
//! must be treated as a failed boot verification.

use std::fmt;

use log::{debug, info, warn};

use crate::ct::ct_eq;
use crate::descriptor::{find_descriptor, IcpEntry, LogDescriptor};
use crate::error::{AftlError, ParseError};
use crate::hash::{self, Digest};
use crate::merkle;
use crate::policy::{EntryPolicy, FailureMode, MissingDescriptorPolicy, VerificationPolicy};
use crate::signature::{verify_root_signature, SignatureFailure};
use crate::trust::TrustStore;

/// The gate an entry failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailedGate {
    HashMismatch,
    RootMismatch,
    SignatureInvalid,
    UnknownLog,
}

impl fmt::Display for FailedGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedGate::HashMismatch => write!(f, "vbmeta hash mismatch"),
            FailedGate::RootMismatch => write!(f, "root hash mismatch"),
            FailedGate::SignatureInvalid => write!(f, "invalid log root signature"),
            FailedGate::UnknownLog => write!(f, "unknown transparency log"),
        }
    }
}

/// Outcome of verifying one metadata blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Ok,
    /// The blob makes no transparency-log claim
    NoDescriptorPresent,
    InvalidDescriptor(ParseError),
    VerificationFailed { entry_index: usize, gate: FailedGate },
}

impl VerificationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationResult::Ok)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Ok => write!(f, "OK"),
            VerificationResult::NoDescriptorPresent => write!(f, "no AFTL descriptor present"),
            VerificationResult::InvalidDescriptor(e) => write!(f, "invalid descriptor: {}", e),
            VerificationResult::VerificationFailed { entry_index, gate } => {
                write!(f, "entry {} failed: {}", entry_index, gate)
            }
        }
    }
}

/// Result of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    pub entry_index: usize,
    pub log_identity: String,
    pub outcome: Result<(), FailedGate>,
}

/// Aggregate result plus the outcome of every entry that was evaluated.
///
/// In short-circuit mode `entries` stops at the decisive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub result: VerificationResult,
    pub entries: Vec<EntryOutcome>,
}

impl VerificationReport {
    fn without_entries(result: VerificationResult) -> Self {
        Self {
            result,
            entries: vec![],
        }
    }
}

/// Verifies AFTL inclusion proofs against a fixed set of trusted logs.
#[derive(Debug, Clone)]
pub struct AftlVerifier {
    trust_store: TrustStore,
    policy: VerificationPolicy,
}

impl AftlVerifier {
    pub fn new(trust_store: TrustStore, policy: VerificationPolicy) -> Self {
        Self {
            trust_store,
            policy,
        }
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Verify a metadata blob with an appended descriptor.
    pub fn verify(&self, blob: &[u8]) -> VerificationResult {
        self.verify_detailed(blob).result
    }

    /// Like [`verify`](Self::verify), also returning per-entry outcomes.
    pub fn verify_detailed(&self, blob: &[u8]) -> VerificationReport {
        let Some(location) = find_descriptor(blob) else {
            debug!("No AFTL descriptor in {} byte blob", blob.len());
            return VerificationReport::without_entries(VerificationResult::NoDescriptorPresent);
        };
        debug!("AFTL descriptor at offset {}", location.offset);
        self.verify_descriptor_detailed(location.metadata(blob), location.descriptor(blob))
    }

    /// Verify `descriptor` against separately supplied `metadata`.
    pub fn verify_descriptor(&self, metadata: &[u8], descriptor: &[u8]) -> VerificationResult {
        self.verify_descriptor_detailed(metadata, descriptor).result
    }

    pub fn verify_descriptor_detailed(
        &self,
        metadata: &[u8],
        descriptor: &[u8],
    ) -> VerificationReport {
        let descriptor = match LogDescriptor::parse_with_limits(descriptor, &self.policy.limits) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Rejecting AFTL descriptor: {}", e);
                return VerificationReport::without_entries(VerificationResult::InvalidDescriptor(
                    e,
                ));
            }
        };
        self.verify_entries(&hash::digest(metadata), descriptor.entries())
    }

    fn verify_entries(&self, metadata_hash: &Digest, entries: &[IcpEntry]) -> VerificationReport {
        let mut outcomes = Vec::with_capacity(entries.len());
        let mut first_failure = None;
        let mut passed = false;

        for (entry_index, entry) in entries.iter().enumerate() {
            let outcome = self.verify_entry(metadata_hash, entry);
            match outcome {
                Ok(()) => {
                    debug!("Entry {} verified against {}", entry_index, entry.log_url());
                    passed = true;
                }
                Err(gate) => {
                    warn!("Entry {} ({}) failed: {}", entry_index, entry.log_url(), gate);
                    first_failure.get_or_insert((entry_index, gate));
                }
            }
            outcomes.push(EntryOutcome {
                entry_index,
                log_identity: entry.log_identity().to_string(),
                outcome,
            });

            if self.policy.failure_mode == FailureMode::ShortCircuit {
                let decisive = match self.policy.entries {
                    EntryPolicy::AllEntries => outcome.is_err(),
                    EntryPolicy::AnyEntry => outcome.is_ok(),
                };
                if decisive {
                    break;
                }
            }
        }

        let result = match (self.policy.entries, first_failure) {
            (_, None) if passed => VerificationResult::Ok,
            (EntryPolicy::AnyEntry, Some(_)) if passed => VerificationResult::Ok,
            (_, Some((entry_index, gate))) => {
                VerificationResult::VerificationFailed { entry_index, gate }
            }
            // Unreachable for parsed descriptors, kept fail-closed
            (_, None) => VerificationResult::InvalidDescriptor(ParseError::NoEntries),
        };
        VerificationReport {
            result,
            entries: outcomes,
        }
    }

    /// Run the hash, root and signature gates for one entry.
    pub fn verify_entry(&self, metadata_hash: &Digest, entry: &IcpEntry) -> Result<(), FailedGate> {
        if !ct_eq(entry.vbmeta_hash(), metadata_hash) {
            return Err(FailedGate::HashMismatch);
        }

        let leaf_hash = entry.fw_info_leaf().leaf_hash();
        if !merkle::verify_inclusion(
            &leaf_hash,
            entry.leaf_index(),
            entry.tree_size(),
            entry.proofs(),
            entry.log_root_hash(),
        ) {
            return Err(FailedGate::RootMismatch);
        }

        verify_root_signature(
            &self.trust_store,
            entry.log_identity(),
            &entry.log_root().encode(),
            entry.log_root_signature(),
        )
        .map_err(|failure| match failure {
            SignatureFailure::UnknownLog => FailedGate::UnknownLog,
            SignatureFailure::Invalid => FailedGate::SignatureInvalid,
        })
    }

    /// Verify a blob and turn anything but success into an error.
    ///
    /// A missing descriptor is accepted only under
    /// [`MissingDescriptorPolicy::Optional`].
    pub fn enforce(&self, blob: &[u8]) -> Result<(), AftlError> {
        self.accept(self.verify(blob))
    }

    /// Map a verification result to the caller contract used by `enforce`.
    pub fn accept(&self, result: VerificationResult) -> Result<(), AftlError> {
        match result {
            VerificationResult::Ok => Ok(()),
            VerificationResult::NoDescriptorPresent => match self.policy.missing_descriptor {
                MissingDescriptorPolicy::Optional => {
                    info!("No AFTL descriptor; accepted by policy");
                    Ok(())
                }
                MissingDescriptorPolicy::Mandatory => Err(AftlError::NoDescriptor),
            },
            VerificationResult::InvalidDescriptor(e) => Err(e.into()),
            VerificationResult::VerificationFailed { entry_index, gate } => {
                Err(AftlError::VerificationFailed { entry_index, gate })
            }
        }
    }

    /// Verify every vbmeta image of a boot slot, stopping at the first failure.
    pub fn verify_images(&self, images: &[&[u8]]) -> Result<(), AftlError> {
        for (i, image) in images.iter().enumerate() {
            self.enforce(image).map_err(|e| {
                warn!("vbmeta image {} failed AFTL verification: {}", i, e);
                e
            })?;
        }
        info!("{} vbmeta image(s) passed AFTL verification", images.len());
        Ok(())
    }
}
