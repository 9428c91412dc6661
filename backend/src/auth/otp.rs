//! One-time verification codes
//!
//! Fixed-length decimal codes drawn from the OS random source, bound to an
//! identity with an expiry by the verification service.

use rand::{rngs::OsRng, Rng};

/// Generate a fixed-length decimal code
///
/// Each digit is drawn uniformly from `OsRng`; codes are never derived from
/// counters or timestamps.
pub fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Exact-match code comparison
///
/// Compares every byte regardless of where the first difference occurs, so
/// the comparison time does not depend on how much of the code was right.
/// Codes are fixed-length, so the length check leaks nothing useful.
pub fn codes_match(submitted: &str, stored: &str) -> bool {
    if submitted.len() != stored.len() {
        return false;
    }
    submitted
        .bytes()
        .zip(stored.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
