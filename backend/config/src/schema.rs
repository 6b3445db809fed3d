//! Clawkeeper configuration schema.
//!
//! Every section has full defaults, so an empty file (or no file) yields a
//! working local setup.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clawkeeper_core::{GatewayEnv, TimeoutPolicy};
use serde::{Deserialize, Serialize};

/// Env var the gateway reads its auth token from.
pub const GATEWAY_TOKEN_ENV: &str = "OPENCLAW_GATEWAY_TOKEN";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClawkeeperConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub sandbox: SandboxConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP ops API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Bearer token required on every ops route. Unset means open access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8787,
            access_token: None,
        }
    }
}

/// How the gateway is launched, recognised, and talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Launch command line for the gateway process.
    pub command: String,
    /// A process whose command contains any of these fragments is the gateway.
    pub signatures: Vec<String>,
    /// CLI used for `config get` / `config set`.
    pub cli_binary: String,
    /// Local control channel the CLI connects to.
    pub control_url: String,
    /// Pause between killing the old gateway and relaunching.
    pub grace_period_ms: u64,
    /// Bounded wait for a proxied CLI invocation.
    pub command_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub timeout_policy: TimeoutPolicy,
    /// Exported to the gateway as `OPENCLAW_GATEWAY_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Extra environment for the gateway process.
    pub env: BTreeMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command: "/usr/local/bin/start-openclaw.sh".to_string(),
            signatures: vec!["start-openclaw.sh".to_string(), "openclaw gateway".to_string()],
            cli_binary: "openclaw".to_string(),
            control_url: "ws://localhost:18789".to_string(),
            grace_period_ms: 2_000,
            command_timeout_ms: 20_000,
            poll_interval_ms: 500,
            timeout_policy: TimeoutPolicy::default(),
            auth_token: None,
            env: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Environment for the gateway launch: `env` plus the auth token, if any.
    pub fn gateway_env(&self) -> GatewayEnv {
        let mut env: GatewayEnv = self.env.clone().into_iter().collect();
        if let Some(token) = &self.auth_token {
            env.insert(GATEWAY_TOKEN_ENV, token.clone());
        }
        env
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Shell used by the local sandbox (`<shell> -c <command>`).
    pub shell: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}
