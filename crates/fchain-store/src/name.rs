/// Longest sanitized name kept, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Fallback used when nothing usable survives sanitization.
pub const FALLBACK_NAME: &str = "upload";

/// Reduce a client-supplied file name to a safe single path component.
///
/// Only the last component survives (split on both `/` and `\`). Control
/// characters are dropped, anything outside `[A-Za-z0-9._-]` becomes `_`,
/// and leading dots are stripped so the result is never hidden, `.` or `..`.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.len() != cleaned.len() {
        cleaned = trimmed.to_string();
    }

    // ASCII only at this point, so byte truncation is char-safe.
    cleaned.truncate(MAX_NAME_LEN);

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}
