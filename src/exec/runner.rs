//! Shell command execution
//!
//! Runs an argv to completion and returns stdout followed by stderr. Failures
//! never surface as errors: they are folded into the returned text.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Prefix of every failure folded into command output
pub const ERROR_PREFIX: &str = "error running command:";

/// Trait for running host commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` and return its combined output
    async fn run(&self, argv: &[String]) -> String;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    timeout: Option<Duration>,
}

impl ShellRunner {
    /// Runner without an execution limit
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Bound each command's wall-clock time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(&self, argv: &[String]) -> std::io::Result<std::process::Output> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
        })?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("command timed out after {}s", limit.as_secs()),
                )),
            },
            None => child.wait_with_output().await,
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, argv: &[String]) -> String {
        match self.execute(argv).await {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    log::debug!("Output from command: {}", combined.replace('\n', "\\n"));
                    combined
                } else {
                    failure_text(argv, &output.status.to_string(), &combined)
                }
            }
            Err(e) => failure_text(argv, &e.to_string(), ""),
        }
    }
}

/// Diagnostic text for a failed command, followed by whatever it printed
pub fn failure_text(argv: &[String], reason: &str, output: &str) -> String {
    let mut text = format!("{}\n{}\nerror: {}", ERROR_PREFIX, argv.join(" "), reason);
    if !output.is_empty() {
        text.push('\n');
        text.push_str(output);
    }
    text
}

/// Whether `output` is a folded failure
pub fn is_failure(output: &str) -> bool {
    output.starts_with(ERROR_PREFIX)
}

/// Build a `bash -c` argv
pub fn bash(script: impl Into<String>) -> Vec<String> {
    vec!["bash".to_string(), "-c".to_string(), script.into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_echo() {
        let runner = ShellRunner::new();
        let output = runner.run(&bash("echo hello")).await;
        assert_eq!(output, "hello\n");
        assert!(!is_failure(&output));
    }

    #[tokio::test]
    async fn test_run_combines_stderr() {
        let runner = ShellRunner::new();
        let output = runner.run(&bash("echo out && echo err >&2")).await;
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_folded() {
        let runner = ShellRunner::new();
        let output = runner.run(&bash("echo partial && exit 3")).await;
        assert!(is_failure(&output));
        assert!(output.contains("bash -c echo partial && exit 3"));
        assert!(output.contains("partial"));
    }

    #[tokio::test]
    async fn test_missing_program_is_folded() {
        let runner = ShellRunner::new();
        let output = runner
            .run(&["nonexistent_command_xyz123".to_string()])
            .await;
        assert!(output.starts_with("error running command:"));
    }

    #[tokio::test]
    async fn test_empty_argv_is_folded() {
        let runner = ShellRunner::new();
        let output = runner.run(&[]).await;
        assert!(is_failure(&output));
        assert!(output.contains("empty command"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = ShellRunner::new().with_timeout(Duration::from_millis(100));
        let output = runner.run(&bash("sleep 10")).await;
        assert!(is_failure(&output));
        assert!(output.contains("timed out"));
    }

    #[test]
    fn test_default_has_no_timeout() {
        assert!(ShellRunner::default().timeout().is_none());
    }

    #[test]
    fn test_failure_text_shape() {
        let text = failure_text(&bash("false"), "exit status: 1", "");
        assert_eq!(text, "error running command:\nbash -c false\nerror: exit status: 1");
    }
}
