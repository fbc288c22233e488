//! Test doubles for the executor and host checks

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::host::HostEnvironment;
use super::runner::CommandRunner;

/// Runner that answers from canned responses and records every argv.
///
/// A response is picked by the first registered needle found in the last argv
/// element; with no match the default output is returned.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Vec<(String, String)>,
    default_output: String,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `output` when the script contains `needle`
    pub fn respond(mut self, needle: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.push((needle.into(), output.into()));
        self
    }

    pub fn with_default(mut self, output: impl Into<String>) -> Self {
        self.default_output = output.into();
        self
    }

    /// Every argv seen so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, argv: &[String]) -> String {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(argv.to_vec());
        }
        let script = argv.last().map(String::as_str).unwrap_or_default();
        self.responses
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| self.default_output.clone())
    }
}

/// Host with a fixed set of variables and executables
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    vars: HashMap<String, String>,
    executables: HashSet<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_executable(mut self, name: impl Into<String>) -> Self {
        self.executables.insert(name.into());
        self
    }
}

impl HostEnvironment for FakeHost {
    fn env_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn has_executable(&self, name: &str) -> bool {
        self.executables.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_runner_matches_needle() {
        let runner = ScriptedRunner::new()
            .respond("list-envs", "prod\nstaging\n")
            .with_default("done");
        let argv = vec!["bash".to_string(), "-c".to_string(), "cd . && list-envs".to_string()];
        assert_eq!(runner.run(&argv).await, "prod\nstaging\n");
        let other = vec!["bash".to_string(), "-c".to_string(), "uptime".to_string()];
        assert_eq!(runner.run(&other).await, "done");
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_fake_host() {
        let host = FakeHost::new().with_var("TOKEN", "x").with_var("EMPTY", "").with_executable("kubectl");
        assert_eq!(host.env_var("TOKEN").as_deref(), Some("x"));
        assert!(host.env_var("EMPTY").is_none());
        assert!(host.has_executable("kubectl"));
        assert!(!host.has_executable("helm"));
    }
}
