//! Host environment checks used by the env and dependency gates

use std::env;

/// Read-only view of the host the commands run on
pub trait HostEnvironment: Send + Sync {
    /// Non-empty value of an environment variable
    fn env_var(&self, name: &str) -> Option<String>;

    /// Whether an executable can be found
    fn has_executable(&self, name: &str) -> bool;
}

/// The real process environment and `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostEnvironment for SystemHost {
    fn env_var(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn has_executable(&self, name: &str) -> bool {
        !name.is_empty() && which::which(name).is_ok()
    }
}
