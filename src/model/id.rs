// src/model/id.rs

//! Identifier derivation. This is the only randomized behaviour in the core.

use rand::seq::SliceRandom;

/// Alphabet used for generated suffixes (lowercase letters + digits).
pub const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Shortest suffix ever generated, whatever the parent id length.
pub const MIN_SUFFIX_LEN: usize = 4;

/// Generate a random string of `len` characters drawn from [`ID_ALPHABET`].
pub fn generate_random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .filter_map(|_| ID_ALPHABET.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
}

/// Derive a fresh child id from `parent`: `<parent>-<suffix>`.
///
/// The suffix is as long as the parent id (never shorter than
/// [`MIN_SUFFIX_LEN`]) and is regenerated on every call.
pub fn derive_child_id(parent: &str) -> String {
    let len = parent.chars().count().max(MIN_SUFFIX_LEN);
    format!("{parent}-{}", generate_random_id(len))
}
