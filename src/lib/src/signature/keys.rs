use std::fmt;

use log::debug;
use p256::ecdsa::signature::Verifier;
use p256::pkcs8::DecodePublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey as DecodeRsaSpki;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;

use super::SignatureAlgorithm;
use crate::error::AftlError;

/// Smallest RSA modulus accepted for a log key.
const MIN_RSA_BITS: usize = 2048;

/// A transparency log's public key.
#[derive(Clone, PartialEq, Eq)]
pub enum LogPublicKey {
    Ed25519(ed25519_compact::PublicKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    Rsa(rsa::RsaPublicKey),
}

fn check_rsa_size(key: rsa::RsaPublicKey) -> Result<LogPublicKey, AftlError> {
    let bits = key.size() * 8;
    if bits < MIN_RSA_BITS {
        debug!("RSA modulus too small ({} bits)", bits);
        return Err(AftlError::KeyError(format!(
            "RSA key of {} bits is below the {} bit minimum",
            bits, MIN_RSA_BITS
        )));
    }
    Ok(LogPublicKey::Rsa(key))
}

impl LogPublicKey {
    /// Decode a key from binary form.
    ///
    /// Ed25519 keys are accepted raw (32 bytes) or as DER SubjectPublicKeyInfo.
    /// P-256 keys are accepted as SEC1 points or DER SubjectPublicKeyInfo.
    /// RSA keys are accepted as DER SubjectPublicKeyInfo or PKCS#1.
    pub fn from_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self, AftlError> {
        match algorithm {
            SignatureAlgorithm::Ed25519 => {
                let pk = if bytes.len() == ed25519_compact::PublicKey::BYTES {
                    ed25519_compact::PublicKey::from_slice(bytes)?
                } else {
                    ed25519_compact::PublicKey::from_der(bytes)?
                };
                Ok(LogPublicKey::Ed25519(pk))
            }
            SignatureAlgorithm::EcdsaP256Sha256 => {
                let vk = match p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes) {
                    Ok(vk) => vk,
                    Err(_) => p256::ecdsa::VerifyingKey::from_public_key_der(bytes)
                        .map_err(|e| AftlError::KeyError(format!("P-256: {}", e)))?,
                };
                Ok(LogPublicKey::EcdsaP256(vk))
            }
            SignatureAlgorithm::RsaPkcs1Sha256 => {
                let key = match <rsa::RsaPublicKey as DecodeRsaSpki>::from_public_key_der(bytes) {
                    Ok(key) => key,
                    Err(_) => rsa::RsaPublicKey::from_pkcs1_der(bytes)
                        .map_err(|e| AftlError::KeyError(format!("RSA: {}", e)))?,
                };
                check_rsa_size(key)
            }
        }
    }

    /// Decode a PEM `PUBLIC KEY` block, or `RSA PUBLIC KEY` for RSA.
    pub fn from_pem(algorithm: SignatureAlgorithm, pem: &str) -> Result<Self, AftlError> {
        match algorithm {
            SignatureAlgorithm::Ed25519 => Ok(LogPublicKey::Ed25519(
                ed25519_compact::PublicKey::from_pem(pem)?,
            )),
            SignatureAlgorithm::EcdsaP256Sha256 => {
                let vk = p256::ecdsa::VerifyingKey::from_public_key_pem(pem)
                    .map_err(|e| AftlError::KeyError(format!("P-256: {}", e)))?;
                Ok(LogPublicKey::EcdsaP256(vk))
            }
            SignatureAlgorithm::RsaPkcs1Sha256 => {
                let key = if pem.contains("-----BEGIN RSA PUBLIC KEY-----") {
                    rsa::RsaPublicKey::from_pkcs1_pem(pem)
                        .map_err(|e| AftlError::KeyError(format!("RSA: {}", e)))?
                } else {
                    <rsa::RsaPublicKey as DecodeRsaSpki>::from_public_key_pem(pem)
                        .map_err(|e| AftlError::KeyError(format!("RSA: {}", e)))?
                };
                check_rsa_size(key)
            }
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            LogPublicKey::Ed25519(_) => SignatureAlgorithm::Ed25519,
            LogPublicKey::EcdsaP256(_) => SignatureAlgorithm::EcdsaP256Sha256,
            LogPublicKey::Rsa(_) => SignatureAlgorithm::RsaPkcs1Sha256,
        }
    }

    /// Check `signature` over `message`.
    ///
    /// P-256 signatures may be DER or fixed-size `r || s`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            LogPublicKey::Ed25519(pk) => {
                let signature = match ed25519_compact::Signature::from_slice(signature) {
                    Ok(signature) => signature,
                    Err(_) => {
                        debug!("Malformed Ed25519 signature ({} bytes)", signature.len());
                        return false;
                    }
                };
                pk.verify(message, &signature).is_ok()
            }
            LogPublicKey::EcdsaP256(vk) => {
                let signature = match p256::ecdsa::Signature::from_der(signature)
                    .or_else(|_| p256::ecdsa::Signature::from_slice(signature))
                {
                    Ok(signature) => signature,
                    Err(_) => {
                        debug!("Malformed ECDSA signature ({} bytes)", signature.len());
                        return false;
                    }
                };
                vk.verify(message, &signature).is_ok()
            }
            LogPublicKey::Rsa(key) => {
                let signature = match rsa::pkcs1v15::Signature::try_from(signature) {
                    Ok(signature) => signature,
                    Err(_) => {
                        debug!("Malformed RSA signature ({} bytes)", signature.len());
                        return false;
                    }
                };
                rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .is_ok()
            }
        }
    }
}

impl fmt::Debug for LogPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPublicKey::Ed25519(pk) => write!(f, "Ed25519({})", hex::encode(&pk[..])),
            LogPublicKey::EcdsaP256(vk) => write!(
                f,
                "EcdsaP256({})",
                hex::encode(vk.to_encoded_point(true).as_bytes())
            ),
            LogPublicKey::Rsa(key) => write!(f, "Rsa({} bits)", key.size() * 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Signer;
    use p256::pkcs8::EncodePublicKey;

    fn ed25519_keypair() -> ed25519_compact::KeyPair {
        ed25519_compact::KeyPair::from_seed(ed25519_compact::Seed::new([7u8; 32]))
    }

    fn p256_signing_key() -> p256::ecdsa::SigningKey {
        p256::ecdsa::SigningKey::from_slice(&[0x11; 32]).unwrap()
    }

    fn rsa_private_key() -> rsa::RsaPrivateKey {
        use rsa::pkcs8::DecodePrivateKey;
        rsa::RsaPrivateKey::from_pkcs8_pem(include_str!("../../tests/data/rsa_log.pem")).unwrap()
    }

    // 1024-bit SubjectPublicKeyInfo
    const SMALL_RSA_SPKI: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDXN99a2PRzC99/kLUpur5LDCNcrmr13r1cCZBe+sQFJ+2b5V/ahSNO6s7JcKhaFJxuqexLZlVPQeTYuDi25Oe4ezYjQp+lzp+TNN9/O8rypaU2hypcxB7cWM/+o4XRox/3YW/Eh8IeygLUEybC16CKGib2lC9TsPXbuusJn2dImQIDAQAB";

    #[test]
    fn test_ed25519_raw_and_der() {
        let kp = ed25519_keypair();
        let raw = LogPublicKey::from_bytes(SignatureAlgorithm::Ed25519, kp.pk.as_ref()).unwrap();
        let der = LogPublicKey::from_bytes(SignatureAlgorithm::Ed25519, &kp.pk.to_der()).unwrap();
        let pem = LogPublicKey::from_pem(SignatureAlgorithm::Ed25519, &kp.pk.to_pem()).unwrap();
        assert_eq!(raw, der);
        assert_eq!(raw, pem);
        assert_eq!(raw.algorithm(), SignatureAlgorithm::Ed25519);
    }

    #[test]
    fn test_ed25519_verify() {
        let kp = ed25519_keypair();
        let key = LogPublicKey::Ed25519(kp.pk);
        let signature = kp.sk.sign(b"log root", None);
        assert!(key.verify(b"log root", signature.as_ref()));
        assert!(!key.verify(b"log rooT", signature.as_ref()));
        assert!(!key.verify(b"log root", &signature[..63]));
    }

    #[test]
    fn test_p256_encodings() {
        let vk = *p256_signing_key().verifying_key();
        let sec1 = vk.to_encoded_point(false);
        let der = vk.to_public_key_der().unwrap();
        let pem = vk.to_public_key_pem(Default::default()).unwrap();

        let a = LogPublicKey::from_bytes(SignatureAlgorithm::EcdsaP256Sha256, sec1.as_bytes())
            .unwrap();
        let b = LogPublicKey::from_bytes(SignatureAlgorithm::EcdsaP256Sha256, der.as_bytes())
            .unwrap();
        let c = LogPublicKey::from_pem(SignatureAlgorithm::EcdsaP256Sha256, &pem).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_p256_verify_der_and_fixed() {
        let sk = p256_signing_key();
        let key = LogPublicKey::EcdsaP256(*sk.verifying_key());
        let signature: p256::ecdsa::Signature = sk.sign(b"log root");

        assert!(key.verify(b"log root", signature.to_der().as_bytes()));
        assert!(key.verify(b"log root", &signature.to_bytes()));
        assert!(!key.verify(b"other", &signature.to_bytes()));
        assert!(!key.verify(b"log root", b"junk"));
    }

    #[test]
    fn test_rsa_encodings() {
        use rsa::pkcs1::EncodeRsaPublicKey;

        let public = rsa_private_key().to_public_key();
        let spki = public.to_public_key_der().unwrap();
        let pkcs1 = public.to_pkcs1_der().unwrap();
        let spki_pem = public.to_public_key_pem(Default::default()).unwrap();
        let pkcs1_pem = public.to_pkcs1_pem(Default::default()).unwrap();

        let alg = SignatureAlgorithm::RsaPkcs1Sha256;
        let expected = LogPublicKey::Rsa(public.clone());
        assert_eq!(LogPublicKey::from_bytes(alg, spki.as_bytes()).unwrap(), expected);
        assert_eq!(LogPublicKey::from_bytes(alg, pkcs1.as_bytes()).unwrap(), expected);
        assert_eq!(LogPublicKey::from_pem(alg, &spki_pem).unwrap(), expected);
        assert_eq!(LogPublicKey::from_pem(alg, &pkcs1_pem).unwrap(), expected);
        assert_eq!(expected.algorithm(), alg);
        assert_eq!(format!("{:?}", expected), "Rsa(2048 bits)");
    }

    #[test]
    fn test_rsa_verify() {
        use rsa::signature::SignatureEncoding;

        let private = rsa_private_key();
        let key = LogPublicKey::Rsa(private.to_public_key());
        let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private);
        let signature = signing_key.sign(b"log root").to_vec();
        assert_eq!(signature.len(), 256);

        assert!(key.verify(b"log root", &signature));
        assert!(!key.verify(b"log rooT", &signature));
        let mut flipped = signature.clone();
        flipped[100] ^= 0x01;
        assert!(!key.verify(b"log root", &flipped));
        assert!(!key.verify(b"log root", &signature[..255]));
        assert!(!key.verify(b"log root", &[]));
    }

    #[test]
    fn test_rsa_small_modulus_rejected() {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

        let der = BASE64.decode(SMALL_RSA_SPKI).unwrap();
        assert!(matches!(
            LogPublicKey::from_bytes(SignatureAlgorithm::RsaPkcs1Sha256, &der),
            Err(AftlError::KeyError(_))
        ));
    }

    #[test]
    fn test_reject_garbage_keys() {
        assert!(LogPublicKey::from_bytes(SignatureAlgorithm::Ed25519, &[1, 2, 3]).is_err());
        assert!(LogPublicKey::from_bytes(SignatureAlgorithm::EcdsaP256Sha256, &[4; 65]).is_err());
        assert!(LogPublicKey::from_pem(SignatureAlgorithm::EcdsaP256Sha256, "nope").is_err());
        assert!(LogPublicKey::from_bytes(SignatureAlgorithm::RsaPkcs1Sha256, &[0x30; 40]).is_err());
        let ed25519_der = ed25519_keypair().pk.to_der();
        assert!(
            LogPublicKey::from_bytes(SignatureAlgorithm::RsaPkcs1Sha256, &ed25519_der).is_err()
        );
    }
}
