use anyhow::Context;
use spyglass_core::model::SpanRecord;

/// Connects to the host's event stream and invokes `on_record` for every
/// decoded span record. Returns `Ok(())` when the server closes the stream;
/// the caller decides whether to reconnect.
pub async fn stream_records<F>(
    client: &reqwest::Client,
    url: &str,
    mut on_record: F,
) -> anyhow::Result<()>
where
    F: FnMut(SpanRecord),
{
    let mut response = client.get(url).send().await.context("open event stream")?;
    if !response.status().is_success() {
        anyhow::bail!(
            "event stream request failed with status {}",
            response.status()
        );
    }

    let mut buffer = String::new();
    while let Some(chunk) = response.chunk().await.context("read event stream chunk")? {
        let text = std::str::from_utf8(&chunk).context("event stream contained invalid utf8")?;
        buffer.push_str(text);

        // SSE frames are separated by a blank line
        while let Some(frame_end) = buffer.find("\n\n") {
            let frame = buffer[..frame_end].to_string();
            buffer.drain(..frame_end + 2);
            for record in records_in_frame(&frame) {
                on_record(record);
            }
        }
    }

    Ok(())
}

/// Decodes the `data:` lines of one SSE frame. Comment lines (keep-alives)
/// and undecodable payloads are skipped.
fn records_in_frame(frame: &str) -> Vec<SpanRecord> {
    frame
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str::<SpanRecord>(data).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use testkit::record;

    use super::*;

    #[test]
    fn decodes_data_lines_and_skips_keepalives() {
        let payload = serde_json::to_string(&record("T", "a", "", 0, 10)).unwrap();
        let frame = format!(": keep-alive\ndata: {payload}");

        let records = records_in_frame(&frame);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].span_id, "a");
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let records = records_in_frame("data: {not json");
        assert!(records.is_empty());
    }
}
