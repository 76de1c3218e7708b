//! How per-entry results combine into one verdict.
//!
//! A [`VerificationPolicy`] is the single configuration point consumed by
//! [`AftlVerifier`](crate::AftlVerifier). The default is the strictest
//! setting: a descriptor is mandatory, every entry must verify, and the
//! first failure ends verification.

use std::fmt;

use crate::descriptor::DescriptorLimits;

/// Which entries of a descriptor must verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPolicy {
    /// Every entry must pass
    #[default]
    AllEntries,
    /// At least one entry must pass
    AnyEntry,
}

/// Whether to stop at the first decisive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    ShortCircuit,
    /// Evaluate every entry and keep each outcome
    Accumulate,
}

/// What to do with a blob that carries no descriptor at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDescriptorPolicy {
    /// Absence fails verification
    #[default]
    Mandatory,
    /// Absence is accepted, for devices still rolling out log support
    Optional,
}

impl fmt::Display for EntryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPolicy::AllEntries => write!(f, "all entries"),
            EntryPolicy::AnyEntry => write!(f, "any entry"),
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::ShortCircuit => write!(f, "short-circuit"),
            FailureMode::Accumulate => write!(f, "accumulate"),
        }
    }
}

impl fmt::Display for MissingDescriptorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDescriptorPolicy::Mandatory => write!(f, "mandatory"),
            MissingDescriptorPolicy::Optional => write!(f, "optional"),
        }
    }
}

/// Verification policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationPolicy {
    pub entries: EntryPolicy,
    pub failure_mode: FailureMode,
    pub missing_descriptor: MissingDescriptorPolicy,
    /// Resource caps applied while parsing
    pub limits: DescriptorLimits,
}

impl VerificationPolicy {
    /// Strict enforcement; same as `default()`.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Like `strict()`, but images without a descriptor are accepted.
    pub fn rollout() -> Self {
        Self {
            missing_descriptor: MissingDescriptorPolicy::Optional,
            ..Self::default()
        }
    }

    pub fn with_entry_policy(mut self, entries: EntryPolicy) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn with_missing_descriptor(mut self, missing_descriptor: MissingDescriptorPolicy) -> Self {
        self.missing_descriptor = missing_descriptor;
        self
    }

    pub fn with_limits(mut self, limits: DescriptorLimits) -> Self {
        self.limits = limits;
        self
    }
}
