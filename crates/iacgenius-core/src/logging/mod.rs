//! Injected logging for provider clients and the orchestrator
//!
//! Lower layers (secret stores, config loading) call `tracing` directly.
//! Components that talk to providers take a [`SharedLogger`] instead, so
//! tests can swap in [`RecordingLogger`] and inspect what would have been
//! written. No implementation may be handed a credential value.

mod recording;
mod tracing_logger;

use std::sync::Arc;

pub use recording::{LogLevel, RecordingLogger};
pub use tracing_logger::TracingLogger;

pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

pub type SharedLogger = Arc<dyn Logger>;

/// Discards everything; the default when no logger is injected
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}
