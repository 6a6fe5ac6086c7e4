use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Anything that is not an ASCII digit, stripped from phone numbers
    /// - "(02) 2345-6789" -> "0223456789"
    pub static ref NON_DIGIT_REGEX: Regex = Regex::new(r"[^0-9]").unwrap();

    /// Any run of whitespace, including the ideographic space U+3000
    pub static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();

    /// Compact source date format, e.g. "20190315"
    pub static ref COMPACT_DATE_REGEX: Regex = Regex::new(r"^\d{8}$").unwrap();
}

/// Escapes `%`, `_` and `\` so the value matches literally inside a LIKE pattern
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%term%` with LIKE metacharacters escaped
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}
