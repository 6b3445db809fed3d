//! Structured logging for Clawkeeper.
//!
//! Console + rolling NDJSON file output, secret redaction for logged command
//! lines, and gateway lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{GatewayEvent, GatewayEventEntry, GatewayEventLogger};
pub use logger::{LoggerGuard, init_logger};
pub use redact::redact_sensitive_data;
