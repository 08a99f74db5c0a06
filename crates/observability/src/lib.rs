//! # voxmls-observability
//!
//! Structured Logging fuer voxmls via tracing-subscriber (Text oder JSON).

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingOptionen};
