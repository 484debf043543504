//! HTTP span producers.
//!
//! Two producers feed the capture pipeline: an axum middleware that wraps
//! inbound requests in an `HttpIn` span, and a reqwest wrapper that wraps
//! outbound requests in an `HttpOut` span. Both buffer bodies so the host
//! handler (or caller) still sees them intact after capture.

pub mod body;
pub mod inbound;
pub mod outbound;

pub use inbound::{InboundCapture, capture};
pub use outbound::OutboundClient;
