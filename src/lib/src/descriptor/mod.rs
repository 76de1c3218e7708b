//! The AFTL descriptor ("AFTL image") appended to a vbmeta blob.
//!
//! ```text
//! header (18 bytes)
//!   [4]  magic "AFTL"
//!   u32  version_major
//!   u32  version_minor
//!   u32  total_size      header + entries
//!   u16  entry_count
//! entry_count x ICP entry
//! ```
//!
//! All integers are big-endian. Parsing either yields a fully validated
//! [`LogDescriptor`] or an error; nothing partially built escapes.

use std::fmt;

use log::debug;

use crate::error::{AftlError, ParseError};
use crate::reader::ByteReader;

mod entry;
mod fw_info;
mod log_root;

pub use entry::IcpEntry;
pub use fw_info::{FirmwareInfo, FirmwareInfoLeaf};
pub use log_root::{LogRoot, LOG_ROOT_FIXED_SIZE, LOG_ROOT_MAX_SIZE, LOG_ROOT_VERSION};

pub const MAGIC: [u8; 4] = *b"AFTL";
pub const HEADER_SIZE: usize = 18;
pub const ENTRY_HEADER_SIZE: usize = 27;
pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 2;

/// Upper bounds applied while parsing untrusted descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorLimits {
    pub max_entries: usize,
    pub max_log_url_size: usize,
    pub max_fw_info_leaf_size: usize,
    pub max_signature_size: usize,
}

impl Default for DescriptorLimits {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_log_url_size: 2048,
            max_fw_info_leaf_size: 64 * 1024,
            max_signature_size: 1024,
        }
    }
}

/// Where a descriptor starts inside a metadata blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLocation {
    pub offset: usize,
    /// Bytes from `offset` to the end of the blob
    pub len: usize,
}

impl DescriptorLocation {
    /// The metadata preceding the descriptor.
    pub fn metadata<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        &blob[..self.offset.min(blob.len())]
    }

    /// The descriptor candidate bytes.
    pub fn descriptor<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        &blob[self.offset.min(blob.len())..]
    }
}

/// Locate the first AFTL magic in `blob`.
pub fn find_descriptor(blob: &[u8]) -> Option<DescriptorLocation> {
    let offset = blob.windows(MAGIC.len()).position(|w| w == MAGIC)?;
    Some(DescriptorLocation {
        offset,
        len: blob.len() - offset,
    })
}

/// A parsed AFTL descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDescriptor {
    version_major: u32,
    version_minor: u32,
    total_size: usize,
    entries: Vec<IcpEntry>,
}

impl LogDescriptor {
    /// Build a descriptor at the current format version.
    pub fn new(entries: Vec<IcpEntry>) -> Result<Self, AftlError> {
        if entries.is_empty() {
            return Err(ParseError::NoEntries.into());
        }
        if entries.len() > u16::MAX as usize {
            return Err(ParseError::TooManyEntries {
                count: entries.len(),
                max: u16::MAX as usize,
            }
            .into());
        }
        let total_size = entries
            .iter()
            .map(IcpEntry::encoded_len)
            .sum::<usize>()
            + HEADER_SIZE;
        if total_size > u32::MAX as usize {
            return Err(ParseError::FieldTooLarge {
                field: "total_size",
                size: total_size,
                max: u32::MAX as usize,
            }
            .into());
        }
        Ok(Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            total_size,
            entries,
        })
    }

    /// Check that [`LogDescriptor::parse_with_limits`] would accept the
    /// encoding of this descriptor under `limits`.
    pub fn validate(&self, limits: &DescriptorLimits) -> Result<(), ParseError> {
        if self.entries.len() > limits.max_entries {
            return Err(ParseError::TooManyEntries {
                count: self.entries.len(),
                max: limits.max_entries,
            });
        }
        self.entries
            .iter()
            .try_for_each(|entry| entry.validate(limits))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with_limits(bytes, &DescriptorLimits::default())
    }

    /// Parse a descriptor starting at `bytes[0]`.
    ///
    /// Bytes past the declared `total_size` belong to whatever follows the
    /// descriptor and are ignored.
    pub fn parse_with_limits(bytes: &[u8], limits: &DescriptorLimits) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(bytes);

        if reader.read_array::<4>()? != MAGIC {
            debug!("Descriptor magic mismatch");
            return Err(ParseError::BadMagic);
        }
        let version_major = reader.read_u32()?;
        let version_minor = reader.read_u32()?;
        if version_major > VERSION_MAJOR || version_minor > VERSION_MINOR {
            return Err(ParseError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let total_size = reader.read_u32()? as usize;
        if total_size < HEADER_SIZE {
            return Err(ParseError::SizeMismatch {
                declared: total_size,
                actual: HEADER_SIZE,
            });
        }

        let entry_count = reader.read_u16()? as usize;
        if entry_count > limits.max_entries {
            debug!("Descriptor claims {} entries", entry_count);
            return Err(ParseError::TooManyEntries {
                count: entry_count,
                max: limits.max_entries,
            });
        }
        if entry_count == 0 {
            return Err(ParseError::NoEntries);
        }

        let mut body = reader.sub_reader(total_size - HEADER_SIZE)?;
        let mut entries = Vec::with_capacity(entry_count);
        for index in 0..entry_count {
            let entry = IcpEntry::parse(&mut body, limits).map_err(|e| {
                debug!("Entry {} rejected: {}", index, e);
                e
            })?;
            entries.push(entry);
        }
        if !body.is_empty() {
            return Err(ParseError::SizeMismatch {
                declared: total_size,
                actual: HEADER_SIZE + body.position(),
            });
        }

        Ok(Self {
            version_major,
            version_minor,
            total_size,
            entries,
        })
    }

    /// Serialize, recomputing every size field from content.
    pub fn encode(&self) -> Result<Vec<u8>, AftlError> {
        let mut out = Vec::with_capacity(self.total_size);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version_major.to_be_bytes());
        out.extend_from_slice(&self.version_minor.to_be_bytes());
        let total_size =
            u32::try_from(self.total_size).map_err(|_| AftlError::InvalidArgument)?;
        out.extend_from_slice(&total_size.to_be_bytes());
        let entry_count =
            u16::try_from(self.entries.len()).map_err(|_| AftlError::InvalidArgument)?;
        out.extend_from_slice(&entry_count.to_be_bytes());
        for entry in &self.entries {
            entry.write_to(&mut out);
        }
        debug_assert_eq!(out.len(), self.total_size);
        Ok(out)
    }

    pub fn entries(&self) -> &[IcpEntry] {
        &self.entries
    }

    pub fn version(&self) -> (u32, u32) {
        (self.version_major, self.version_minor)
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }
}

impl fmt::Display for LogDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Android Firmware Transparency Image:")?;
        writeln!(f, "  AFTL image header:")?;
        writeln!(f, "    {:<25}{}", "Major version:", self.version_major)?;
        writeln!(f, "    {:<25}{}", "Minor version:", self.version_minor)?;
        writeln!(f, "    {:<25}{}", "Image size:", self.total_size)?;
        writeln!(f, "    {:<25}{}", "ICP entries count:", self.entries.len())?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "  Entry #{}:", i + 1)?;
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(url: &str) -> IcpEntry {
        let root = LogRoot::new(2, [0x11; 32], 0, 0, vec![]).unwrap();
        let leaf = FirmwareInfoLeaf::new(FirmwareInfo::new([0x22; 32])).unwrap();
        IcpEntry::new(url, 1, root, leaf, vec![0x33; 64], vec![[0x44; 32]]).unwrap()
    }

    fn sample() -> LogDescriptor {
        LogDescriptor::new(vec![sample_entry("a.example"), sample_entry("b.example")]).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample().encode().unwrap();
        assert_eq!(&bytes[0..4], b"AFTL");
        assert_eq!(&bytes[4..8], &1u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &VERSION_MINOR.to_be_bytes());
        assert_eq!(&bytes[12..16], &(bytes.len() as u32).to_be_bytes());
        assert_eq!(&bytes[16..18], &2u16.to_be_bytes());
    }

    #[test]
    fn test_parse_encoded() {
        let descriptor = sample();
        let bytes = descriptor.encode().unwrap();
        let parsed = LogDescriptor::parse(&bytes).unwrap();
        assert_eq!(parsed, descriptor);
        assert_eq!(parsed.entries()[1].log_url(), "b.example");
        assert_eq!(parsed.encode().unwrap(), bytes);
    }

    #[test]
    fn test_trailing_bytes_after_total_size_ignored() {
        let mut bytes = sample().encode().unwrap();
        bytes.extend_from_slice(b"trailer");
        assert!(LogDescriptor::parse(&bytes).is_ok());
    }

    #[test]
    fn test_total_size_slack_rejected() {
        let mut bytes = sample().encode().unwrap();
        let total = bytes.len() as u32 + 1;
        bytes[12..16].copy_from_slice(&total.to_be_bytes());
        bytes.push(0);
        assert!(matches!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_total_size_short_rejected() {
        let mut bytes = sample().encode().unwrap();
        let total = bytes.len() as u32 - 1;
        bytes[12..16].copy_from_slice(&total.to_be_bytes());
        assert!(matches!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_total_size_below_header() {
        let mut bytes = sample().encode().unwrap();
        bytes[12..16].copy_from_slice(&17u32.to_be_bytes());
        assert!(matches!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = b'X';
        assert_eq!(LogDescriptor::parse(&bytes), Err(ParseError::BadMagic));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample().encode().unwrap();
        bytes[4..8].copy_from_slice(&2u32.to_be_bytes());
        assert_eq!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::UnsupportedVersion {
                major: 2,
                minor: VERSION_MINOR
            })
        );

        let mut bytes = sample().encode().unwrap();
        bytes[8..12].copy_from_slice(&(VERSION_MINOR + 1).to_be_bytes());
        assert!(matches!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_validate_against_limits() {
        let descriptor = sample();
        assert_eq!(descriptor.validate(&DescriptorLimits::default()), Ok(()));

        let tight = DescriptorLimits {
            max_entries: 1,
            ..DescriptorLimits::default()
        };
        assert_eq!(
            descriptor.validate(&tight),
            Err(ParseError::TooManyEntries { count: 2, max: 1 })
        );

        // Buildable and encodable, but the default parser refuses it
        let long_url = "a".repeat(DescriptorLimits::default().max_log_url_size + 1);
        let oversized = LogDescriptor::new(vec![sample_entry(&long_url)]).unwrap();
        let expected = Err(ParseError::FieldTooLarge {
            field: "log_url",
            size: long_url.len(),
            max: DescriptorLimits::default().max_log_url_size,
        });
        assert_eq!(oversized.validate(&DescriptorLimits::default()), expected);
        assert_eq!(
            LogDescriptor::parse(&oversized.encode().unwrap()).map(|_| ()),
            expected
        );
    }

    #[test]
    fn test_older_versions_accepted() {
        let mut bytes = sample().encode().unwrap();
        bytes[4..8].copy_from_slice(&0u32.to_be_bytes());
        bytes[8..12].copy_from_slice(&0u32.to_be_bytes());
        let parsed = LogDescriptor::parse(&bytes).unwrap();
        assert_eq!(parsed.version(), (0, 0));
        assert_eq!(parsed.entries(), sample().entries());
        assert_eq!(parsed.encode().unwrap(), bytes);
    }

    #[test]
    fn test_entry_count_checked_before_entries() {
        // Header only: the count is rejected without touching entry bytes
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION_MAJOR.to_be_bytes());
        bytes.extend_from_slice(&VERSION_MINOR.to_be_bytes());
        bytes.extend_from_slice(&(HEADER_SIZE as u32).to_be_bytes());
        bytes.extend_from_slice(&257u16.to_be_bytes());
        assert_eq!(
            LogDescriptor::parse(&bytes),
            Err(ParseError::TooManyEntries {
                count: 257,
                max: 256
            })
        );

        let len = bytes.len();
        bytes[len - 2..].copy_from_slice(&0u16.to_be_bytes());
        assert_eq!(LogDescriptor::parse(&bytes), Err(ParseError::NoEntries));
    }

    #[test]
    fn test_custom_entry_limit() {
        let bytes = sample().encode().unwrap();
        let limits = DescriptorLimits {
            max_entries: 1,
            ..DescriptorLimits::default()
        };
        assert!(matches!(
            LogDescriptor::parse_with_limits(&bytes, &limits),
            Err(ParseError::TooManyEntries { count: 2, max: 1 })
        ));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            LogDescriptor::new(vec![]),
            Err(AftlError::Parse(ParseError::NoEntries))
        ));
    }

    #[test]
    fn test_find_descriptor() {
        let mut blob = b"vbmeta-bytes".to_vec();
        let descriptor = sample().encode().unwrap();
        blob.extend_from_slice(&descriptor);

        let location = find_descriptor(&blob).unwrap();
        assert_eq!(location.offset, 12);
        assert_eq!(location.len, descriptor.len());
        assert_eq!(location.metadata(&blob), b"vbmeta-bytes");
        assert_eq!(location.descriptor(&blob), descriptor.as_slice());

        assert!(find_descriptor(b"no magic here").is_none());
        assert!(find_descriptor(b"AFT").is_none());
        assert!(find_descriptor(b"").is_none());
    }

    #[test]
    fn test_display() {
        let text = sample().to_string();
        assert!(text.starts_with("Android Firmware Transparency Image:"));
        assert!(text.contains("ICP entries count:       2"));
        assert!(text.contains("Entry #2:"));
        assert!(text.contains("b.example"));
    }
}
