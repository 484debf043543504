//! Streaming publisher.
//!
//! Serves viewers over two endpoints the host nests under its chosen mount
//! path: `/events`, a text event stream that first replays the currently
//! retained history and then pushes new records as they land in the store,
//! and `/traces`, a one-shot ordered snapshot. Each connection owns an
//! independent cursor; dropping the connection cancels its poll loop at the
//! next await.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::Stream;
use spyglass_core::model::SpanRecord;
use spyglass_store::TraceStore;

#[derive(Clone)]
struct PublisherState {
    store: TraceStore,
    poll_interval: Duration,
}

pub fn router(store: TraceStore, poll_interval: Duration) -> Router {
    Router::new()
        .route("/events", get(stream_events))
        .route("/traces", get(snapshot))
        .with_state(PublisherState {
            store,
            poll_interval,
        })
}

/// Records at store positions past the connection's cursor, in store order,
/// polling while idle. Delivery is at-least-once: a reconnect starts over
/// from whatever the store still retains.
fn record_stream(store: TraceStore, poll_interval: Duration) -> impl Stream<Item = SpanRecord> {
    async_stream::stream! {
        let mut cursor = 0u64;
        loop {
            let (batch, next) = store.read_since(cursor);
            cursor = next;
            for record in batch {
                yield record;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

async fn stream_events(
    State(state): State<PublisherState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let records = record_stream(state.store, state.poll_interval);
    let events = async_stream::stream! {
        for await record in records {
            match Event::default().json_data(&record) {
                Ok(event) => yield Ok(event),
                Err(err) => tracing::warn!(error = %err, "failed to encode span record"),
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn snapshot(State(state): State<PublisherState>) -> Json<Vec<SpanRecord>> {
    Json(state.store.snapshot())
}
