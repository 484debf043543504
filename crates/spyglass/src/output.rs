use chrono::SecondsFormat;
use owo_colors::OwoColorize;
use spyglass_core::model::SpanRecord;
use spyglass_core::tags;

use crate::viewer::{TraceHierarchy, ViewerTraceModel};

/// One line per record, printed as records arrive in watch mode.
pub fn print_record_line(record: &SpanRecord) {
    let ts = record
        .start_time_utc
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let kind = match record.kind.as_str() {
        "Server" => record.kind.green().to_string(),
        "Client" => record.kind.blue().to_string(),
        _ => record.kind.bright_black().to_string(),
    };
    println!(
        "{ts} {} {} trace={} span={} ({}ms){}",
        kind,
        record.name.cyan(),
        short_id(&record.trace_id),
        short_id(&record.span_id),
        record.duration_ms(),
        render_endpoint(record),
    );
}

pub fn print_traces(model: &ViewerTraceModel) {
    let mut total = 0;
    for group in model.traces() {
        print_trace(model, &group.trace_id);
        total += 1;
    }
    println!("-- {total} traces --");
}

/// Header plus indented span tree for one trace.
pub fn print_trace(model: &ViewerTraceModel, trace_id: &str) {
    let Some(group) = model.trace(trace_id) else {
        return;
    };
    let duration_ms = (group.end_time - group.start_time).num_milliseconds();
    println!(
        "{} {} spans={} window={}ms",
        "TRACE".bold(),
        short_id(&group.trace_id),
        group.member_ids.len(),
        duration_ms
    );
    if let Some(hierarchy) = model.hierarchy(trace_id) {
        for root in &hierarchy.roots {
            print_node(model, &hierarchy, root, 1);
        }
    }
}

fn print_node(model: &ViewerTraceModel, hierarchy: &TraceHierarchy, span_id: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    if let Some(record) = model.span(span_id) {
        println!(
            "{}{} {} ({}ms){}",
            indent,
            record.name.cyan(),
            record.kind.bright_black(),
            record.duration_ms(),
            render_endpoint(record),
        );
    }
    if let Some(kids) = hierarchy.children.get(span_id) {
        for child in kids {
            print_node(model, hierarchy, child, depth + 1);
        }
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}

fn render_endpoint(record: &SpanRecord) -> String {
    let method = record.tags.get(tags::METHOD);
    let url = record.tags.get(tags::URL);
    let status = record.tags.get(tags::STATUS);
    match (method, url) {
        (Some(method), Some(url)) => match status {
            Some(status) if status == "error" || status.starts_with('5') => {
                format!(" {method} {url} -> {}", status.red())
            }
            Some(status) => format!(" {method} {url} -> {status}"),
            None => format!(" {method} {url}"),
        },
        _ => String::new(),
    }
}
