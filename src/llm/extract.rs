//! Pull a YAML document out of free-form model output

/// Return the body of the first fenced block (` ```yaml `, ` ```yml ` or a
/// bare fence) if there is one, otherwise the trimmed text.
///
/// An unterminated fence takes everything after the opening line.
pub fn extract_document(text: &str) -> String {
    let Some(start) = text.find("```") else {
        return text.trim().to_string();
    };

    let after_fence = &text[start + 3..];
    let body_start = match after_fence.find('\n') {
        Some(newline) => {
            let info = after_fence[..newline].trim();
            if info.is_empty() || info.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                newline + 1
            } else {
                0
            }
        }
        // Single-line fence such as ```openapi: 3.0.0```
        None => 0,
    };

    let body = &after_fence[body_start..];
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim().to_string()
}
