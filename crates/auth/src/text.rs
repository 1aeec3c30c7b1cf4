//! Free-text normalization for directory fields.
//!
//! Positions, locations and business units are typed by people, so every
//! comparison runs on a canonical form: diacritics stripped, upper-cased,
//! trimmed, internal whitespace collapsed.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Canonical form of a free-text directory value.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a normalized text contains a word starting with `keyword`.
///
/// Matching on word starts keeps `GENTE` from firing inside `AGENTE` while
/// still accepting inflections (`HUMANO` matches `HUMANOS`).
pub fn has_keyword(normalized: &str, keyword: &str) -> bool {
    !keyword.is_empty()
        && normalized
            .split(|c: char| !(c.is_alphanumeric() || c == '.'))
            .any(|word| word.starts_with(keyword))
}

/// Whether a normalized text matches any of `keywords` (see [`has_keyword`]).
pub fn has_any_keyword(normalized: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| has_keyword(normalized, k))
}

/// Whether a normalized text contains any of `keywords` anywhere, including
/// inside longer words (`GERENTE` in `SUBGERENTE`).
pub fn contains_any(normalized: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| !k.is_empty() && normalized.contains(k))
}

/// Normalized value, or `None` when the field is blank.
pub fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(normalize).filter(|s| !s.is_empty())
}
