//! Constant-time comparison helpers.

use subtle::ConstantTimeEq;

/// Constant-time equality for byte slices.
///
/// Length is treated as public; the contents comparison does not exit early.
#[inline]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
