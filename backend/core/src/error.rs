use thiserror::Error;

/// Error taxonomy for the gateway ops surface.
///
/// Each variant maps to exactly one HTTP status in the ops router.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A required request parameter was missing.
    #[error("{0}")]
    Validation(String),

    /// The caller asked for a config path outside the allowlist.
    #[error("{0}")]
    Authorization(String),

    /// The caller did not present valid access credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// A named process does not exist in the sandbox.
    #[error("{0}")]
    NotFound(String),

    /// A sandbox call failed (spawn, kill, list, logs).
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl OpsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_message_verbatim() {
        let err: OpsError = anyhow::anyhow!("sandbox transport closed").into();
        assert_eq!(err.to_string(), "sandbox transport closed");
        assert!(matches!(err, OpsError::Upstream(_)));
    }
}
