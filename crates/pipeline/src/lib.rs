pub mod collector;
pub mod mapper;
pub mod publisher;
pub mod queue;
pub mod raw;
pub mod source;

pub use collector::Pipeline;
pub use publisher::router;
pub use queue::SpanQueue;
pub use raw::{RawEvent, RawSpan};
pub use source::CaptureLayer;
