//! `clawkeeper-config`: runtime configuration for the gateway supervisor.
//!
//! Provides:
//! - Typed config schema (server, gateway launch/proxy, sandbox, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Environment overrides for the most common deployment knobs
//! - Validation with path-qualified errors

pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{
    apply_env_overrides, config_file_path, load_config, load_config_with_env, read_config,
    read_config_with_env,
};
pub use schema::{ClawkeeperConfig, GatewayConfig, LoggingConfig, SandboxConfig, ServerConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};
