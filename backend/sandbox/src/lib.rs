pub mod allowlist;
pub mod local;
pub mod mock;

pub use allowlist::{ALLOWED_CONFIG_PATHS, is_allowed_config_path};
pub use local::LocalSandbox;
pub use mock::{MockSandbox, SandboxCall, ScriptedRun};
