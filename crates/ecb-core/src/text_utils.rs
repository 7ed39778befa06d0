/// Decode OCR bytes as UTF-8, dropping invalid sequences instead of replacing them.
///
/// `\r\n` and lone `\r` line endings become `\n`.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    if out.contains('\r') {
        out = out.replace("\r\n", "\n").replace('\r', "\n");
    }
    out
}

/// Trim an entry slice and fold its line breaks into single spaces.
pub fn collapse_newlines(raw: &str) -> String {
    raw.trim().replace('\n', " ")
}

/// Byte offset of the `n`th char of `text`, clamped to `text.len()`.
pub fn char_to_byte(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
