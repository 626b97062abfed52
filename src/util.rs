use unicode_normalization::UnicodeNormalization;

/// Turns an arbitrary string into a filesystem-safe file name.
///
/// NFKD-normalizes, drops everything outside ASCII, then drops any character
/// that isn't alphanumeric, whitespace, `.`, or `-`, and trims. Total and
/// idempotent.
pub fn slugify(raw: &str) -> String {
    raw.nfkd()
        .filter(|&c| {
            c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || c == '.' || c == '-'
        })
        .collect::<String>()
        .trim()
        .to_string()
}
