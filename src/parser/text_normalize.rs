use unicode_normalization::UnicodeNormalization;

/// Canonical form of a line's text: NFKC folds ligatures and full-width
/// forms that PDF text layers are full of, then surrounding whitespace goes.
pub fn normalize_line_text(text: &str) -> String {
    text.nfkc().collect::<String>().trim().to_string()
}
