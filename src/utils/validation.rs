use std::path::Path;

/// Name used when the client sends a file part without a filename.
pub const DEFAULT_BLOB_NAME: &str = "blob-file";

/// Longest original name we keep, in bytes. Leaves room for the
/// timestamp and collision prefix under the usual 255-byte limit.
pub const MAX_NAME_BYTES: usize = 200;

/// Reduce a client-supplied filename to a single safe path component.
///
/// Directory parts are dropped, reserved characters become `_` and the
/// result is truncated on a UTF-8 boundary. Empty input (or input that is
/// only a path, like `../`) falls back to [`DEFAULT_BLOB_NAME`].
pub fn sanitize_filename(filename: &str) -> String {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from upload filename: {}", filename);
    }

    // Browsers on Windows may send `C:\fakepath\name`, so split on both separators.
    let last = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return DEFAULT_BLOB_NAME.to_string();
    }

    if sanitized.len() > MAX_NAME_BYTES {
        let mut end = MAX_NAME_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized.to_string()
    }
}

/// `<epoch-millis>-<name>`, optionally with a collision suffix between the two.
pub fn stored_filename(epoch_millis: i64, name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}-{}-{}", epoch_millis, suffix, name),
        None => format!("{}-{}", epoch_millis, name),
    }
}
