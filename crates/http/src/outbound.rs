//! Outbound request producer.
//!
//! A thin wrapper around `reqwest::Client` that wraps each request in an
//! `HttpOut` span. When a request is issued inside an `HttpIn` span (the
//! usual case for a handler calling a downstream service), the subscriber
//! parents the outbound span under it and the whole exchange lands in one
//! trace.

use axum::http;
use spyglass_core::config::Config;
use spyglass_core::tags;
use tracing::Instrument;

use crate::body::truncate_body;

#[derive(Clone)]
pub struct OutboundClient {
    client: reqwest::Client,
    record_request_bodies: bool,
    record_response_bodies: bool,
    max_body_chars: usize,
}

impl OutboundClient {
    pub fn new(client: reqwest::Client, cfg: &Config) -> Self {
        Self {
            client,
            record_request_bodies: cfg.record_request_bodies,
            record_response_bodies: cfg.record_response_bodies,
            max_body_chars: cfg.max_body_chars,
        }
    }

    pub async fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::Result<reqwest::Response> {
        let request = self.client.get(url).build()?;
        self.execute(request).await
    }

    pub async fn post(
        &self,
        url: impl reqwest::IntoUrl,
        body: impl Into<reqwest::Body>,
    ) -> reqwest::Result<reqwest::Response> {
        let request = self.client.post(url).body(body).build()?;
        self.execute(request).await
    }

    /// Sends the request inside an `HttpOut` span. The response body is read
    /// to completion for capture and the response is rebuilt around the
    /// buffered bytes, so callers can still consume it normally. Transport
    /// errors are recorded on the span and propagated unchanged.
    pub async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::info_span!(
            target: "spyglass",
            "HttpOut",
            spyglass.kind = "Client",
            spyglass.category = "http",
            spyglass.method = %request.method(),
            spyglass.url = %request.url(),
            spyglass.status = tracing::field::Empty,
            spyglass.request_body = tracing::field::Empty,
            spyglass.response_body = tracing::field::Empty,
            spyglass.error = tracing::field::Empty,
        );

        async move {
            let span = tracing::Span::current();

            if self.record_request_bodies
                && let Some(bytes) = request.body().and_then(|b| b.as_bytes())
                && !bytes.is_empty()
            {
                let rendered = truncate_body(bytes, self.max_body_chars);
                span.record(tags::REQUEST_BODY, rendered.as_str());
            }

            match self.client.execute(request).await {
                Ok(response) => {
                    span.record(tags::STATUS, response.status().as_str());
                    if !self.record_response_bodies {
                        return Ok(response);
                    }

                    let status = response.status();
                    let version = response.version();
                    let headers = response.headers().clone();
                    let bytes = response.bytes().await?;
                    if !bytes.is_empty() {
                        let rendered = truncate_body(&bytes, self.max_body_chars);
                        span.record(tags::RESPONSE_BODY, rendered.as_str());
                    }

                    // rebuild so the caller can read the captured body again
                    let mut rebuilt = http::Response::new(bytes);
                    *rebuilt.status_mut() = status;
                    *rebuilt.version_mut() = version;
                    *rebuilt.headers_mut() = headers;
                    Ok(reqwest::Response::from(rebuilt))
                }
                Err(err) => {
                    span.record(tags::STATUS, "error");
                    span.record(tags::ERROR, tracing::field::display(&err));
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
