//! Correlation token generation.

use rand::Rng;

/// Fixed alphabet correlation tokens are drawn from.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh correlation token of `len` symbols.
///
/// Drawn from a thread-local RNG seeded from process entropy. Not
/// cryptographic: the requirement is uniqueness across in-flight calls, and
/// 26^32 possible tokens at [`crate::TOKEN_LENGTH`] makes a collision
/// vanishingly unlikely. Safe to call concurrently; each call is
/// independent.
#[must_use]
pub fn generate(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
