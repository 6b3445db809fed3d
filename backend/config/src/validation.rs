//! Config validation with path-qualified messages.

use crate::schema::ClawkeeperConfig;
use thiserror::Error;
use tracing::warn;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit each warning at `warn` level.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ClawkeeperConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_gateway(config, &mut report);
    validate_sandbox(config, &mut report);
    report
}

fn validate_server(config: &ClawkeeperConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.bind.trim().is_empty() {
        report.error("server.bind", "Bind address cannot be empty");
    }
    if server.port == 0 {
        report.error("server.port", "Port must be non-zero");
    }
    match server.access_token.as_deref() {
        None => report.warn(
            "server.accessToken",
            "No access token configured; ops routes are open to any caller",
        ),
        Some(t) if t.trim().is_empty() => {
            report.error("server.accessToken", "Access token cannot be blank")
        }
        Some(_) => {}
    }
}

fn validate_gateway(config: &ClawkeeperConfig, report: &mut ValidationReport) {
    let gw = &config.gateway;
    if gw.command.trim().is_empty() {
        report.error("gateway.command", "Launch command cannot be empty");
    }
    if gw.signatures.is_empty() || gw.signatures.iter().any(|s| s.trim().is_empty()) {
        report.error("gateway.signatures", "At least one non-empty signature is required");
    } else if !gw.signatures.iter().any(|s| gw.command.contains(s.as_str())) {
        // Otherwise discovery never sees the process ensure launched, and
        // every ensure would spawn another gateway.
        report.error(
            "gateway.signatures",
            "No signature matches the launch command",
        );
    }
    if gw.cli_binary.trim().is_empty() {
        report.error("gateway.cliBinary", "CLI binary cannot be empty");
    }
    if gw.control_url.trim().is_empty() {
        report.error("gateway.controlUrl", "Control URL cannot be empty");
    }
    if gw.command_timeout_ms == 0 {
        report.error("gateway.commandTimeoutMs", "Must be greater than zero");
    }
    if gw.poll_interval_ms == 0 {
        report.error("gateway.pollIntervalMs", "Must be greater than zero");
    } else if gw.poll_interval_ms > gw.command_timeout_ms {
        report.warn(
            "gateway.pollIntervalMs",
            "Poll interval exceeds the command timeout; commands are checked at most once",
        );
    }
    if gw.grace_period_ms == 0 {
        report.warn(
            "gateway.gracePeriodMs",
            "Zero grace period; relaunch may race the old gateway for its port",
        );
    }
}

fn validate_sandbox(config: &ClawkeeperConfig, report: &mut ValidationReport) {
    if config.sandbox.shell.trim().is_empty() {
        report.error("sandbox.shell", "Shell cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let report = validate(&ClawkeeperConfig::default());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.path == "server.accessToken"));
    }

    #[test]
    fn rejects_launch_command_without_signature() {
        let mut config = ClawkeeperConfig::default();
        config.gateway.command = "/opt/other-launcher.sh".into();
        let report = validate(&config);
        assert!(report.errors.iter().any(|e| e.path == "gateway.signatures"));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let mut config = ClawkeeperConfig::default();
        config.gateway.command_timeout_ms = 0;
        config.gateway.poll_interval_ms = 0;
        let report = validate(&config);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"gateway.commandTimeoutMs"));
        assert!(paths.contains(&"gateway.pollIntervalMs"));
    }

    #[test]
    fn blank_access_token_is_an_error() {
        let mut config = ClawkeeperConfig::default();
        config.server.access_token = Some("  ".into());
        assert!(!validate(&config).is_valid());
    }
}
