pub mod error;
pub mod traits;
pub mod types;

pub use error::OpsError;
pub use traits::Sandbox;
pub use types::{
    CommandResult, GatewayEnv, GatewayState, GatewayStatus, LogsReport, Process, ProcessLogs,
    ProcessStatus, RestartAck, SpawnOptions, TimeoutPolicy,
};
