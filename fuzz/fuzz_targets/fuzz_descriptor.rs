//! Fuzz target for AFTL descriptor parsing
//!
//! This target tests LogDescriptor::parse() on untrusted bytes containing:
//! - The fixed header (magic, versions, total size, entry count)
//! - Length-prefixed ICP entries with nested log roots
//! - Firmware-info JSON leaves
//! - Audit paths whose length depends on the tree position
//!
//! Security concerns:
//! - Reads past the end of the buffer
//! - Integer overflows in length calculations
//! - Memory exhaustion via large length prefixes or entry counts
//! - Panics on unexpected input patterns

#![no_main]

use aftl::LogDescriptor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must never panic, even on completely malformed input
    let result = LogDescriptor::parse(data);

    if let Ok(descriptor) = result {
        // Display walks every field
        let _ = descriptor.to_string();

        // A parsed descriptor re-encodes to exactly the bytes it was read from
        let encoded = descriptor.encode().unwrap();
        assert_eq!(&encoded[..], &data[..descriptor.total_size()]);
        assert_eq!(LogDescriptor::parse(&encoded).unwrap(), descriptor);
    }
});
