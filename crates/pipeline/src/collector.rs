use std::sync::Arc;

use spyglass_core::config::Config;
use spyglass_store::TraceStore;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::mapper::SpanMapper;
use crate::queue::SpanQueue;
use crate::source::CaptureLayer;

/// Owns the capture pipeline: the ingestion queue, the span source
/// subscription handle, and the single background task that drains, maps,
/// and stores completed spans.
pub struct Pipeline {
    queue: Arc<SpanQueue>,
    task: JoinHandle<()>,
}

impl Pipeline {
    /// Starts the drain task and returns the pipeline handle plus the
    /// capture layer to register with the host's subscriber.
    pub fn start(cfg: &Config, store: TraceStore) -> (Self, CaptureLayer) {
        let queue = Arc::new(SpanQueue::new(cfg.queue_capacity));
        let layer = CaptureLayer::new(queue.clone(), cfg.source_name.clone());
        let mapper = SpanMapper::new(cfg);

        let task = tokio::spawn(run_collector(queue.clone(), mapper, store));

        (Self { queue, task }, layer)
    }

    /// Unsubscribes the span source (further offers are discarded), lets the
    /// drain task finish what is already queued, and waits for it to stop.
    pub async fn shutdown(self) {
        self.queue.close();
        let _ = self.task.await;
    }
}

async fn run_collector(queue: Arc<SpanQueue>, mapper: SpanMapper, store: TraceStore) {
    while let Some(raw) = queue.recv().await {
        match mapper.map(raw) {
            Ok(Some(record)) => store.add(record),
            Ok(None) => {}
            // contained: the span is dropped, the loop continues
            Err(err) => warn!(error = %err, "failed to map span"),
        }
    }
}
