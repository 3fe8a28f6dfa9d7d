//! Chirpline Core - Common infrastructure for the post harvester
//!
//! This crate provides the pieces every chirpline binary needs: logging
//! setup, graceful-shutdown signalling, fixed-delay retry, and the CSV
//! output sink.

pub mod logging;
pub mod retry;
pub mod shutdown;
pub mod sink;

// Re-exports for convenience
pub use logging::init_logging;
pub use retry::retry_indefinitely;
pub use shutdown::{
    install_signal_handlers, is_shutdown_requested, request_shutdown, sleep_interruptible,
};
pub use sink::{next_unit_number, strip_newlines, unit_path, CsvSink, OUTPUT_COLUMNS};
