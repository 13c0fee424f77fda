//! framemix Common Utilities
//!
//! Shared infrastructure for all framemix crates:
//! - Error types and result aliases
//! - Output clock and frame period helpers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
