//! Fuzz target for log public key and trust store parsing
//!
//! This target tests:
//! - Raw, SEC1, PKCS#1 and DER key decoding for every algorithm
//! - PEM decoding
//! - Trust store JSON documents
//!
//! Security concerns:
//! - Malformed PEM/DER structures
//! - Invalid curve points
//! - Signature decoding on arbitrary bytes

#![no_main]

use aftl::{LogPublicKey, SignatureAlgorithm, TrustStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for algorithm in [
        SignatureAlgorithm::Ed25519,
        SignatureAlgorithm::EcdsaP256Sha256,
        SignatureAlgorithm::RsaPkcs1Sha256,
    ] {
        if let Ok(pk) = LogPublicKey::from_bytes(algorithm, data) {
            assert_eq!(pk.algorithm(), algorithm);
            // Arbitrary bytes as a signature over themselves
            let _ = pk.verify(data, data);
        }

        if let Ok(s) = std::str::from_utf8(data) {
            let _ = LogPublicKey::from_pem(algorithm, s);
        }
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = TrustStore::from_json(s);
    }
});
