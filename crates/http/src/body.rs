/// Renders a captured body as a tag value, truncating past `max_chars`
/// characters with a trailing marker. Non-UTF-8 bytes are replaced rather
/// than dropped so binary payloads still leave a trace.
pub fn truncate_body(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}... (truncated)")
    } else {
        head
    }
}
