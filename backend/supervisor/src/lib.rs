pub mod command;
pub mod discovery;
pub mod reader;
pub mod supervisor;
pub mod wait;

pub use command::{CliTemplate, CommandProxy, ConfigCommand, ConfigCommandKind, ProxySettings};
pub use discovery::{find_gateway_process, GatewaySignature};
pub use supervisor::{GatewayLaunch, GatewaySupervisor};
pub use wait::{wait_for_process, WaitOutcome};
