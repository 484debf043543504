//! Small instrumented host application.
//!
//! Runs the full capture pipeline against a handful of toy routes so the
//! viewer commands (and the e2e tests) have something live to point at. The
//! publisher endpoints are nested under the configured mount path on the same
//! listener.

use std::io::IsTerminal;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use spyglass_core::config::Config;
use spyglass_http::{InboundCapture, OutboundClient, capture};
use spyglass_pipeline::Pipeline;
use spyglass_store::TraceStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Clone)]
struct DemoState {
    client: OutboundClient,
    self_base: String,
}

pub async fn run_demo(addr: String) -> anyhow::Result<()> {
    let cfg = Config::load().context("load config")?;
    let store = TraceStore::new(cfg.store_capacity);
    let (pipeline, capture_layer) = Pipeline::start(&cfg, store.clone());

    // the capture layer sits below the filtered fmt layer so RUST_LOG cannot
    // starve span capture
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .with_filter(EnvFilter::from_default_env());
    let _ = tracing_subscriber::registry()
        .with(capture_layer)
        .with(fmt_layer)
        .try_init();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind demo address {addr}"))?;
    let local = listener.local_addr().context("resolve local address")?;

    let state = DemoState {
        client: OutboundClient::new(reqwest::Client::new(), &cfg),
        self_base: format!("http://{local}"),
    };

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/echo", post(echo))
        .route("/relay", get(relay))
        .route("/fail", get(fail))
        .with_state(state)
        .nest(
            &cfg.mount_path,
            spyglass_pipeline::router(store, cfg.poll_interval),
        )
        .layer(axum::middleware::from_fn_with_state(
            InboundCapture::new(&cfg),
            capture,
        ));

    eprintln!("spyglass demo");
    eprintln!("  app: http://{local}");
    eprintln!("  events: http://{local}{}/events", cfg.mount_path);
    eprintln!("  traces: http://{local}{}/traces", cfg.mount_path);
    eprintln!("  tip: run `spyglass watch --url http://{local}{}`", cfg.mount_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received ctrl-c, shutting down");
        })
        .await
        .context("serve demo app")?;

    pipeline.shutdown().await;
    Ok(())
}

async fn ping() -> &'static str {
    "pong"
}

async fn echo(body: String) -> String {
    body
}

/// Calls back into this process's own `/ping` through the instrumented
/// client, producing an `HttpOut` span parented under the inbound one.
async fn relay(State(state): State<DemoState>) -> Result<String, StatusCode> {
    let url = format!("{}/ping", state.self_base);
    let response = state.client.get(&url).await.map_err(|err| {
        tracing::warn!(error = %err, "relay request failed");
        StatusCode::BAD_GATEWAY
    })?;
    let body = response.text().await.map_err(|err| {
        tracing::warn!(error = %err, "relay response unreadable");
        StatusCode::BAD_GATEWAY
    })?;
    Ok(format!("relayed: {body}"))
}

async fn fail() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}
