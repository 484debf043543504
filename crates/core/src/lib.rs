pub mod config;
pub mod error;
pub mod model;
pub mod tags;
pub mod time;

pub use error::{Result, SpyglassError};
