//! Config path allowlist: the only keys the ops proxy may read or write.
//!
//! Matching is literal string equality. No prefixes, wildcards, or case folding:
//! a path that is not byte-for-byte one of these keys never reaches the sandbox.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Config keys reachable through `config get` / `config set`.
pub const ALLOWED_CONFIG_PATHS: [&str; 3] = [
    "agents.defaults.model.primary",
    "gateway.auth.token",
    "gateway.port",
];

static ALLOWED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ALLOWED_CONFIG_PATHS.into_iter().collect());

/// Returns true iff `path` is exactly one of the allowlisted config keys.
pub fn is_allowed_config_path(path: &str) -> bool {
    ALLOWED.contains(path)
}
