//! Fuzz target for the full verification path
//!
//! Feeds arbitrary blobs to AftlVerifier::verify_detailed(), which locates
//! the descriptor, parses it and runs every gate. The trust store holds a
//! fixed Ed25519 key so the signature gate is reachable.

#![no_main]

use aftl::{
    AftlVerifier, FailureMode, LogPublicKey, TrustStore, TrustedLog, VerificationPolicy,
    VerificationResult,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let pk = LogPublicKey::from_bytes(aftl::SignatureAlgorithm::Ed25519, &[0x42; 32]);
    let Ok(pk) = pk else { return };
    let store = TrustStore::new(vec![TrustedLog::new("aftl.example.com", pk)]).unwrap();
    let policy = VerificationPolicy::default().with_failure_mode(FailureMode::Accumulate);
    let verifier = AftlVerifier::new(store, policy);

    let report = verifier.verify_detailed(data);

    // Per-entry outcomes exist only for descriptors that parsed
    if !report.entries.is_empty() {
        assert!(matches!(
            report.result,
            VerificationResult::Ok | VerificationResult::VerificationFailed { .. }
        ));
    }
    if report.result == VerificationResult::NoDescriptorPresent {
        assert!(aftl::find_descriptor(data).is_none());
    }
});
