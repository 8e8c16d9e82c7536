const TRUNCATED_MARKER: &str = "\n.[truncated]";
/// Size of the body copy kept for diagnostics and `Indeterminate` outcomes.
pub const MAX_SNIPPET_BYTES: usize = 500;

/// First `MAX_SNIPPET_BYTES` of `body`, cut on a char boundary.
pub fn diagnostic_snippet(body: &str) -> String {
    truncate_at(body.trim(), MAX_SNIPPET_BYTES)
}

pub(crate) fn truncate_at(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATED_MARKER}", &text[..end])
}
