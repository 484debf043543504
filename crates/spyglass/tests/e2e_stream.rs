use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serial_test::serial;
use spyglass_core::model::SpanRecord;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_spyglass")
}

struct DemoServer {
    child: Child,
    base: String,
}

impl Drop for DemoServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn spawn_demo() -> DemoServer {
    let port = free_port();
    let child = Command::new(bin())
        .arg("demo")
        .arg("--addr")
        .arg(format!("127.0.0.1:{port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let server = DemoServer {
        child,
        base: format!("http://127.0.0.1:{port}"),
    };

    let client = reqwest::Client::new();
    for _ in 0..100 {
        if client
            .get(format!("{}/ping", server.base))
            .send()
            .await
            .is_ok()
        {
            return server;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("demo server never became ready");
}

async fn fetch_snapshot(client: &reqwest::Client, base: &str) -> Vec<SpanRecord> {
    client
        .get(format!("{base}/spyglass/traces"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn wait_for_records<F>(client: &reqwest::Client, base: &str, ready: F) -> Vec<SpanRecord>
where
    F: Fn(&[SpanRecord]) -> bool,
{
    for _ in 0..100 {
        let records = fetch_snapshot(client, base).await;
        if ready(&records) {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("snapshot never reached the expected state");
}

fn tag<'a>(record: &'a SpanRecord, key: &str) -> &'a str {
    record.tags.get(key).map(String::as_str).unwrap_or("")
}

fn find_by_url<'a>(records: &'a [SpanRecord], url: &str) -> Option<&'a SpanRecord> {
    records.iter().find(|r| tag(r, "spyglass.url") == url)
}

#[tokio::test]
#[serial]
async fn snapshot_carries_inbound_and_outbound_spans() {
    let server = spawn_demo().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/echo", server.base))
        .body("hello spyglass")
        .send()
        .await
        .unwrap();
    client
        .get(format!("{}/relay", server.base))
        .send()
        .await
        .unwrap();
    client
        .get(format!("{}/fail", server.base))
        .send()
        .await
        .unwrap();

    let records = wait_for_records(&client, &server.base, |records| {
        find_by_url(records, "/echo").is_some()
            && find_by_url(records, "/fail").is_some()
            && records.iter().any(|r| r.name == "HttpOut")
    })
    .await;

    let echo = find_by_url(&records, "/echo").unwrap();
    assert_eq!(echo.name, "HttpIn");
    assert_eq!(echo.kind, "Server");
    assert_eq!(tag(echo, "spyglass.method"), "POST");
    assert_eq!(tag(echo, "spyglass.status"), "200");
    assert_eq!(tag(echo, "spyglass.request_body"), "hello spyglass");
    assert_eq!(tag(echo, "spyglass.response_body"), "hello spyglass");
    assert!(echo.is_root());

    // the outbound call made by /relay is parented under its inbound span
    let relay = find_by_url(&records, "/relay").unwrap();
    let outbound = records.iter().find(|r| r.name == "HttpOut").unwrap();
    assert_eq!(outbound.kind, "Client");
    assert_eq!(tag(outbound, "spyglass.status"), "200");
    assert!(tag(outbound, "spyglass.url").ends_with("/ping"));
    assert_eq!(outbound.trace_id, relay.trace_id);
    assert_eq!(outbound.parent_span_id, relay.span_id);

    let fail = find_by_url(&records, "/fail").unwrap();
    assert_eq!(tag(fail, "spyglass.status"), "500");

    // span ids are unique across everything captured
    let mut ids: Vec<&str> = records.iter().map(|r| r.span_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), records.len());
}

#[tokio::test]
#[serial]
async fn event_stream_replays_history_then_tails() {
    let server = spawn_demo().await;
    let client = reqwest::Client::new();

    // the readiness pings are already retained history
    let history = wait_for_records(&client, &server.base, |records| !records.is_empty()).await;

    let mut response = client
        .get(format!("{}/spyglass/events", server.base))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let mut received: Vec<SpanRecord> = Vec::new();
    let mut buffer = String::new();
    let mut fired_new_request = false;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for stream records (got {})",
            received.len()
        );

        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("stream stalled")
            .unwrap()
            .expect("stream closed early");
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());

        while let Some(frame_end) = buffer.find("\n\n") {
            let frame = buffer[..frame_end].to_string();
            buffer.drain(..frame_end + 2);
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ")
                    && let Ok(record) = serde_json::from_str::<SpanRecord>(data)
                {
                    received.push(record);
                }
            }
        }

        // once the history is replayed, drive one more request and wait for
        // it to arrive over the live tail
        if !fired_new_request && received.len() >= history.len() {
            fired_new_request = true;
            client
                .get(format!("{}/fail", server.base))
                .send()
                .await
                .unwrap();
        }
        if fired_new_request
            && received.iter().any(|r| tag(r, "spyglass.url") == "/fail")
        {
            break;
        }
    }

    // replay preserved store order
    let replayed: Vec<&str> = received
        .iter()
        .take(history.len())
        .map(|r| r.span_id.as_str())
        .collect();
    let expected: Vec<&str> = history.iter().map(|r| r.span_id.as_str()).collect();
    assert_eq!(replayed, expected);
}

#[tokio::test]
#[serial]
async fn snapshot_subcommand_prints_decodable_json() {
    let server = spawn_demo().await;
    let client = reqwest::Client::new();
    wait_for_records(&client, &server.base, |records| !records.is_empty()).await;

    let output = Command::new(bin())
        .arg("snapshot")
        .arg("--url")
        .arg(format!("{}/spyglass", server.base))
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: Vec<SpanRecord> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!records.is_empty());
    let ping = find_by_url(&records, "/ping").unwrap();
    assert_eq!(ping.name, "HttpIn");
    assert_eq!(ping.kind, "Server");
    assert!(ping.duration_ms() >= 0);
}
