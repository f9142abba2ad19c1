//! Jaro-Winkler similarity over normalized supply names.
//!
//! Catalog names share long common prefixes ("ANESTESIA GENERAL ...") far more
//! often than suffixes, so the Jaro score is boosted by a common-prefix bonus:
//! `jaro + prefix_len * PREFIX_SCALE * (1 - jaro)`. The bonus applies at every
//! Jaro score; `strsim::jaro_winkler` only boosts scores above 0.7, which would
//! skew low-tier diagnostic matches.

use crate::normalize::normalize;

/// Winkler weight per matching prefix character.
pub const PREFIX_SCALE: f64 = 0.1;
/// Prefix characters compared for the bonus.
pub const MAX_PREFIX_LEN: usize = 4;

/// Similarity of two already-normalized names, in `[0.0, 1.0]`.
///
/// Arguments are ordered before scoring so the result is exactly symmetric.
/// Two empty strings score 1.0; one empty string against a non-empty one scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let jaro = strsim::jaro(a, b);
    let prefix_len = a
        .chars()
        .zip(b.chars())
        .take(MAX_PREFIX_LEN)
        .take_while(|(x, y)| x == y)
        .count();
    let score = jaro + prefix_len as f64 * PREFIX_SCALE * (1.0 - jaro);
    score.clamp(0.0, 1.0)
}

/// Normalize both raw names, then score them.
pub fn name_similarity(raw_a: &str, raw_b: &str) -> f64 {
    similarity(&normalize(raw_a), &normalize(raw_b))
}
