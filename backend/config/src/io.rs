//! Config file loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::env::resolve_env_vars_with;
use crate::schema::ClawkeeperConfig;
use crate::validation::{validate, ValidationReport};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config file path: `CLAWKEEPER_CONFIG` if set, else
/// `~/.clawkeeper/config.yaml`. Without a home directory the `~` becomes `.`.
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLAWKEEPER_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clawkeeper")
        .join(CONFIG_FILE_NAME)
}

/// Load, substitute, override, and validate the config using the process environment.
pub async fn load_config(path: &Path) -> Result<ClawkeeperConfig> {
    load_config_with_env(path, &std::env::vars().collect()).await
}

/// Same as [`load_config`] with an explicit environment (useful for testing).
///
/// Returns defaults (plus overrides) if the file doesn't exist.
pub async fn load_config_with_env(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<ClawkeeperConfig> {
    let (config, report) = read_config_with_env(path, env).await?;
    report.log_warnings();
    Ok(config)
}

/// Like [`load_config`], but hands the warnings back instead of logging
/// them, for callers that install their subscriber after reading config.
pub async fn read_config(path: &Path) -> Result<(ClawkeeperConfig, ValidationReport)> {
    read_config_with_env(path, &std::env::vars().collect()).await
}

pub async fn read_config_with_env(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<(ClawkeeperConfig, ValidationReport)> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
        // An empty file parses to null.
        let config: ClawkeeperConfig = if value.is_null() {
            ClawkeeperConfig::default()
        } else {
            serde_yaml::from_value(resolve_env_vars_with(&value, env)?)
                .with_context(|| format!("Invalid config at: {}", path.display()))?
        };
        info!(path = %path.display(), "Loaded config");
        config
    } else {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        ClawkeeperConfig::default()
    };

    apply_env_overrides(&mut config, env)?;

    let report = validate(&config);
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok((config, report))
}

/// Apply `CLAWKEEPER_*` overrides on top of file values.
pub fn apply_env_overrides(
    config: &mut ClawkeeperConfig,
    env: &HashMap<String, String>,
) -> Result<()> {
    if let Some(bind) = env.get("CLAWKEEPER_BIND") {
        config.server.bind = bind.clone();
    }
    if let Some(port) = env.get("CLAWKEEPER_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("CLAWKEEPER_PORT is not a valid port: {port}"))?;
    }
    if let Some(token) = env.get("CLAWKEEPER_ACCESS_TOKEN").filter(|t| !t.is_empty()) {
        config.server.access_token = Some(token.clone());
    }
    if let Some(level) = env.get("CLAWKEEPER_LOG_LEVEL") {
        config.logging.level = level.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_with_env(&dir.path().join("nope.yaml"), &env(&[]))
            .await
            .unwrap();
        assert_eq!(config.server.port, 8787);
        assert!(config.server.access_token.is_none());
    }

    #[tokio::test]
    async fn loads_file_with_substitution_and_overrides() {
        let file = write_yaml(
            "server:\n  port: 9000\n  accessToken: ${OPS_TOKEN}\ngateway:\n  authToken: gw-secret\n",
        );
        let config = load_config_with_env(
            file.path(),
            &env(&[("OPS_TOKEN", "ops-secret"), ("CLAWKEEPER_PORT", "9100")]),
        )
        .await
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.access_token.as_deref(), Some("ops-secret"));
        assert_eq!(config.gateway.auth_token.as_deref(), Some("gw-secret"));
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let file = write_yaml("");
        let config = load_config_with_env(file.path(), &env(&[])).await.unwrap();
        assert_eq!(config.gateway.cli_binary, "openclaw");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let file = write_yaml("gateway:\n  commandTimeoutMs: 0\n");
        let err = load_config_with_env(file.path(), &env(&[])).await.unwrap_err();
        assert!(err.to_string().contains("gateway.commandTimeoutMs"));
    }

    #[tokio::test]
    async fn read_config_returns_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let (config, report) = read_config_with_env(&dir.path().join("config.yaml"), &env(&[]))
            .await
            .unwrap();
        assert!(config.server.access_token.is_none());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.path == "server.accessToken"));

        let (_, report) = read_config_with_env(
            &dir.path().join("config.yaml"),
            &env(&[("CLAWKEEPER_ACCESS_TOKEN", "ops-secret")]),
        )
        .await
        .unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn config_path_falls_back_to_home() {
        // Only the fallback is checked; the env var is process-global.
        if std::env::var_os("CLAWKEEPER_CONFIG").is_none() {
            if let Some(home) = dirs::home_dir() {
                assert_eq!(
                    config_file_path(),
                    home.join(".clawkeeper").join("config.yaml")
                );
            }
        }
    }

    #[tokio::test]
    async fn bad_port_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_with_env(
            &dir.path().join("config.yaml"),
            &env(&[("CLAWKEEPER_PORT", "not-a-port")]),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("CLAWKEEPER_PORT"));
    }
}
