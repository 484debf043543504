mod demo;
mod output;
mod stream;
mod telemetry;
mod viewer;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spyglass_core::model::SpanRecord;

use crate::telemetry::init_cli_tracing;
use crate::viewer::ViewerTraceModel;

const DEFAULT_URL: &str = "http://127.0.0.1:7700/spyglass";

#[derive(Parser, Debug)]
#[command(name = "spyglass")]
#[command(about = "Live trace inspector for instrumented services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Stream span records and render traces live")]
    Watch {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
        #[arg(long = "kind", help = "Only show spans of this kind (repeatable)")]
        kinds: Vec<String>,
        #[arg(long, help = "Re-render the affected trace tree on every record")]
        tree: bool,
    },
    #[command(about = "Fetch the retained records once and print the traces")]
    Snapshot {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    #[command(about = "Run a small instrumented demo app with the pipeline mounted")]
    Demo {
        #[arg(long, default_value = "127.0.0.1:7700")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { url, kinds, tree } => {
            init_cli_tracing();
            run_watch(url, kinds, tree, cli.json).await
        }
        Commands::Snapshot { url } => {
            init_cli_tracing();
            run_snapshot(url, cli.json).await
        }
        Commands::Demo { addr } => demo::run_demo(addr).await,
    }
}

async fn run_watch(url: String, kinds: Vec<String>, tree: bool, json: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let events_url = endpoint(&url, "events");
    let kinds: HashSet<String> = kinds.into_iter().collect();
    let mut model = ViewerTraceModel::new();

    loop {
        let result = stream::stream_records(&client, &events_url, |record| {
            if !kinds.is_empty() && !kinds.contains(&record.kind) {
                return;
            }
            if json {
                if let Ok(line) = serde_json::to_string(&record) {
                    println!("{line}");
                }
                return;
            }
            let trace_id = record.trace_id.clone();
            // the model drops replayed duplicates after a reconnect
            if model.insert(record.clone()) {
                if tree {
                    println!();
                    output::print_trace(&model, &trace_id);
                } else {
                    output::print_record_line(&record);
                }
            }
        })
        .await;

        match result {
            Ok(()) => tracing::info!("event stream ended, reconnecting"),
            Err(err) => tracing::warn!(error = %err, "event stream failed, reconnecting"),
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
}

async fn run_snapshot(url: String, json: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(endpoint(&url, "traces"))
        .send()
        .await
        .context("fetch snapshot")?;
    if !response.status().is_success() {
        anyhow::bail!("snapshot request failed with status {}", response.status());
    }
    let records: Vec<SpanRecord> = response.json().await.context("decode snapshot")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut model = ViewerTraceModel::new();
    for record in records {
        model.insert(record);
    }
    output::print_traces(&model);
    Ok(())
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}
