//! Inbound request producer.
//!
//! An axum middleware that wraps each handled request in an `HttpIn` span.
//! Method and URL are recorded up front; status and bodies are recorded as
//! they become known. Bodies are buffered into memory and handed back to the
//! router (and to the client) unchanged, so handlers never observe the
//! capture.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use spyglass_core::config::Config;
use spyglass_core::tags;
use tracing::Instrument;

use crate::body::truncate_body;

/// State for [`capture`], derived from the host's [`Config`].
#[derive(Clone)]
pub struct InboundCapture {
    skip_prefix: String,
    record_request_bodies: bool,
    record_response_bodies: bool,
    max_body_chars: usize,
}

impl InboundCapture {
    pub fn new(cfg: &Config) -> Self {
        Self {
            skip_prefix: cfg.mount_path.clone(),
            record_request_bodies: cfg.record_request_bodies,
            record_response_bodies: cfg.record_response_bodies,
            max_body_chars: cfg.max_body_chars,
        }
    }
}

/// Middleware entry point, registered with
/// `axum::middleware::from_fn_with_state`. Requests under the inspector's
/// own mount path pass through untouched so the viewer never traces itself.
pub async fn capture(
    State(state): State<InboundCapture>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path().starts_with(&state.skip_prefix) {
        return next.run(req).await;
    }

    let span = tracing::info_span!(
        target: "spyglass",
        "HttpIn",
        spyglass.kind = "Server",
        spyglass.category = "http",
        spyglass.method = %req.method(),
        spyglass.url = %req.uri().path(),
        spyglass.status = tracing::field::Empty,
        spyglass.request_body = tracing::field::Empty,
        spyglass.response_body = tracing::field::Empty,
    );

    async move {
        let span = tracing::Span::current();

        let req = if state.record_request_bodies {
            let (parts, body) = req.into_parts();
            match to_bytes(body, usize::MAX).await {
                Ok(bytes) => {
                    if !bytes.is_empty() {
                        let rendered = truncate_body(&bytes, state.max_body_chars);
                        span.record(tags::REQUEST_BODY, rendered.as_str());
                    }
                    Request::from_parts(parts, Body::from(bytes))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to buffer request body");
                    Request::from_parts(parts, Body::empty())
                }
            }
        } else {
            req
        };

        let response = next.run(req).await;
        span.record(tags::STATUS, response.status().as_str());

        if !state.record_response_bodies {
            return response;
        }

        let (parts, body) = response.into_parts();
        match to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                if !bytes.is_empty() {
                    let rendered = truncate_body(&bytes, state.max_body_chars);
                    span.record(tags::RESPONSE_BODY, rendered.as_str());
                }
                Response::from_parts(parts, Body::from(bytes))
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to buffer response body");
                Response::from_parts(parts, Body::empty())
            }
        }
    }
    .instrument(span)
    .await
}
