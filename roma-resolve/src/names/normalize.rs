//! Text normalization for place-name matching.
//!
//! Performs:
//! - Unicode NFKD fold, dropping combining marks (strips diacritics)
//! - Lowercase conversion
//! - Strip punctuation (replace with space)
//! - Collapse whitespace
//! - Drop Latin epithet/title tokens

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use roma_core::constants::NAME_EPITHETS;

/// Normalize a place name for matching.
pub fn normalize_name(s: &str) -> String {
    // NFKD fold, then drop the combining marks that carried diacritics.
    let folded: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    // Replace non-alphanumeric with space, lowercase.
    let stripped: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();

    stripped
        .split_whitespace()
        .filter(|t| !is_epithet(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized tokens, for overlap checks.
pub fn tokenize(s: &str) -> Vec<String> {
    normalize_name(s)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

fn is_epithet(token: &str) -> bool {
    NAME_EPITHETS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize_name("Córdoba"), "cordoba");
        assert_eq!(normalize_name("Nîmes"), "nimes");
    }

    #[test]
    fn test_strips_epithets() {
        assert_eq!(normalize_name("Colonia Iulia Carthago"), "iulia carthago");
        assert_eq!(normalize_name("Portus Ostiae"), "ostiae");
    }

    #[test]
    fn test_punctuation_and_case() {
        assert_eq!(normalize_name("ROMA (Rome)"), "roma rome");
        assert_eq!(normalize_name("Aquae-Sulis"), "aquae sulis");
    }

    #[test]
    fn test_all_epithets_yields_empty() {
        assert_eq!(normalize_name("Colonia"), "");
    }
}
