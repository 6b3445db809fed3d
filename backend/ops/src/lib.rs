//! Clawkeeper ops HTTP API
//!
//! Status, logs, restart and allowlisted config access for the supervised
//! gateway, behind a bearer-token access guard.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{OpsState, build_router, start_server};
