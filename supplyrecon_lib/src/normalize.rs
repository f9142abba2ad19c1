//! Supply-name normalization shared by legacy and catalog names.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Punctuation replaced by a single space before whitespace is collapsed.
const SEPARATORS: &[char] = &['(', ')', ':', ',', '.', '-'];

/// Normalize a supply name for comparison.
///
/// Steps:
/// 1. Unicode canonical decomposition (NFD), dropping combining marks
/// 2. Uppercase
/// 3. Replace `( ) : , . -` with a space
/// 4. Collapse whitespace runs and trim
///
/// Returns empty string for empty input.
pub fn normalize(raw: &str) -> String {
    let uppercased: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase();

    let spaced: String = uppercased
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();

    let words: Vec<&str> = spaced.split_whitespace().collect();
    words.join(" ")
}
