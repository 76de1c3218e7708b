//! Firmware-info leaf, the log entry that names a vbmeta image.
//!
//! The log stores a JSON document of the form
//! `{"Value":{"FwInfo":{"info":{"info":{...}}}}}`. Only the innermost object
//! is interpreted; binary values in it are base64. The raw bytes are kept
//! verbatim since the Merkle leaf hash is computed over them.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{AftlError, ParseError};
use crate::hash::{Digest, DIGEST_SIZE};
use crate::merkle;

#[derive(Debug, Serialize, Deserialize)]
struct LeafDocument {
    #[serde(rename = "Value")]
    value: LeafValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct LeafValue {
    #[serde(rename = "FwInfo")]
    fw_info: SignedFirmwareInfo,
}

#[derive(Debug, Serialize, Deserialize)]
struct SignedFirmwareInfo {
    info: FirmwareInfoWrapper,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirmwareInfoWrapper {
    info: RawFirmwareInfo,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFirmwareInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vbmeta_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_incremental: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manufacturer_key_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Decoded firmware information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfo {
    /// SHA-256 of the vbmeta image this leaf vouches for
    pub vbmeta_hash: Digest,
    /// Incremental part of the build fingerprint
    pub version_incremental: Option<String>,
    /// Key the vbmeta image is signed with
    pub platform_key: Option<Vec<u8>>,
    /// SHA-256 of the manufacturer's public key
    pub manufacturer_key_hash: Option<Vec<u8>>,
    pub description: Option<String>,
}

impl FirmwareInfo {
    pub fn new(vbmeta_hash: Digest) -> Self {
        Self {
            vbmeta_hash,
            version_incremental: None,
            platform_key: None,
            manufacturer_key_hash: None,
            description: None,
        }
    }
}

fn decode_base64(field: &str, value: Option<String>) -> Result<Option<Vec<u8>>, ParseError> {
    value
        .map(|v| {
            BASE64
                .decode(v)
                .map_err(|e| ParseError::InvalidFirmwareInfo(format!("{}: {}", field, e)))
        })
        .transpose()
}

/// A firmware-info leaf together with its exact serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfoLeaf {
    raw: Vec<u8>,
    info: FirmwareInfo,
}

impl FirmwareInfoLeaf {
    /// Serialize `info` into a new leaf.
    pub fn new(info: FirmwareInfo) -> Result<Self, AftlError> {
        let document = LeafDocument {
            value: LeafValue {
                fw_info: SignedFirmwareInfo {
                    info: FirmwareInfoWrapper {
                        info: RawFirmwareInfo {
                            vbmeta_hash: Some(BASE64.encode(info.vbmeta_hash)),
                            version_incremental: info.version_incremental.clone(),
                            platform_key: info.platform_key.as_ref().map(|k| BASE64.encode(k)),
                            manufacturer_key_hash: info
                                .manufacturer_key_hash
                                .as_ref()
                                .map(|h| BASE64.encode(h)),
                            description: info.description.clone(),
                        },
                    },
                },
            },
        };
        let raw = serde_json::to_vec(&document)?;
        Ok(Self { raw, info })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let document: LeafDocument = serde_json::from_slice(bytes)
            .map_err(|e| ParseError::InvalidFirmwareInfo(e.to_string()))?;
        let raw_info = document.value.fw_info.info.info;

        let vbmeta_hash = decode_base64("vbmeta_hash", raw_info.vbmeta_hash)?
            .ok_or_else(|| ParseError::InvalidFirmwareInfo("missing vbmeta_hash".to_string()))?;
        let vbmeta_hash: Digest = vbmeta_hash.as_slice().try_into().map_err(|_| {
            ParseError::InvalidFirmwareInfo(format!(
                "vbmeta_hash is {} bytes, expected {}",
                vbmeta_hash.len(),
                DIGEST_SIZE
            ))
        })?;

        let info = FirmwareInfo {
            vbmeta_hash,
            version_incremental: raw_info.version_incremental,
            platform_key: decode_base64("platform_key", raw_info.platform_key)?,
            manufacturer_key_hash: decode_base64(
                "manufacturer_key_hash",
                raw_info.manufacturer_key_hash,
            )?,
            description: raw_info.description,
        };

        Ok(Self {
            raw: bytes.to_vec(),
            info,
        })
    }

    /// The leaf exactly as it was logged.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn info(&self) -> &FirmwareInfo {
        &self.info
    }

    pub fn vbmeta_hash(&self) -> &Digest {
        &self.info.vbmeta_hash
    }

    /// RFC 6962 leaf hash of the logged bytes.
    pub fn leaf_hash(&self) -> Digest {
        merkle::compute_leaf_hash(&self.raw)
    }
}

impl fmt::Display for FirmwareInfoLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Firmware Info Leaf:")?;
        writeln!(f, "      {:<23}{}", "VBMeta hash:", hex::encode(self.info.vbmeta_hash))?;
        if let Some(version) = &self.info.version_incremental {
            writeln!(f, "      {:<23}{}", "Version incremental:", version)?;
        }
        if let Some(key) = &self.info.platform_key {
            writeln!(f, "      {:<23}{}", "Platform key:", hex::encode(key))?;
        }
        if let Some(hash) = &self.info.manufacturer_key_hash {
            writeln!(f, "      {:<23}{}", "Manufacturer key hash:", hex::encode(hash))?;
        }
        if let Some(description) = &self.info.description {
            writeln!(f, "      {:<23}{}", "Description:", description)?;
        }
        Ok(())
    }
}
