//! Tracing/logging setup shared by every capledger binary.

/// Initialize process-wide logging from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;
