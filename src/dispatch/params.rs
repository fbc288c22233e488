//! Parameter validation
//!
//! Each parameter consumes one positional argument and must equal one of its
//! allowed values, except a `match` parameter, which takes the whole remaining
//! argument text and must contain its pattern somewhere.

use regex::Regex;

use crate::error::DispatchError;
use crate::exec::{CommandRunner, bash, is_failure};
use crate::tools::{ParameterSpec, ToolDefinition};

/// A parameter with its allowed values for this invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    pub name: String,
    pub allowed: Vec<String>,
    pub pattern: Option<String>,
}

/// A validated parameter value ready for substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Static allowed values plus the output lines of any `source` command
pub async fn resolve(tool: &ToolDefinition, runner: &dyn CommandRunner) -> Vec<ResolvedParameter> {
    let mut resolved = Vec::with_capacity(tool.parameters.len());
    for (index, param) in tool.parameters.iter().enumerate() {
        log::debug!(" ----> Param Parameters[{}]: {}", index, param.name);
        let mut allowed = param.allowed.clone();
        if param.has_source() {
            allowed.extend(derive_allowed(tool, param, runner).await);
        }
        resolved.push(ResolvedParameter {
            name: param.name.clone(),
            allowed,
            pattern: param.pattern.clone().filter(|p| !p.is_empty()),
        });
    }
    resolved
}

async fn derive_allowed(
    tool: &ToolDefinition,
    param: &ParameterSpec,
    runner: &dyn CommandRunner,
) -> Vec<String> {
    let source = param.source.join(" ");
    log::debug!("Deriving allowed parameters: {}", source);
    let output = runner
        .run(&bash(format!("cd {} && {}", tool.location, source)))
        .await;
    if is_failure(&output) {
        log::warn!(
            "source for parameter '{}' of '{}' failed: {}",
            param.name,
            tool.trigger,
            output
        );
        return Vec::new();
    }
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

impl ResolvedParameter {
    /// Check the argument at `position`
    pub fn accepts(&self, args: &[String], position: usize) -> bool {
        match &self.pattern {
            Some(pattern) => {
                let rest = args.get(position..).unwrap_or_default().join(" ");
                match Regex::new(pattern) {
                    Ok(re) => {
                        let found = re.is_match(&rest);
                        log::debug!("Parameter(s): '{}' matches regex '{}': {}", rest, pattern, found);
                        found
                    }
                    Err(e) => {
                        log::error!("Parameter '{}' has an invalid pattern: {}", self.name, e);
                        false
                    }
                }
            }
            None => args
                .get(position)
                .is_some_and(|arg| self.allowed.iter().any(|allowed| allowed == arg)),
        }
    }

    /// Text substituted for `${name}`
    fn value(&self, args: &[String], position: usize) -> String {
        match self.pattern {
            Some(_) => args.get(position..).unwrap_or_default().join(" "),
            None => args.get(position).cloned().unwrap_or_default(),
        }
    }
}

/// Per-parameter validity, in declaration order
pub fn validity(params: &[ResolvedParameter], args: &[String]) -> Vec<bool> {
    params
        .iter()
        .enumerate()
        .map(|(position, param)| param.accepts(args, position))
        .collect()
}

/// Validate every parameter, then bind them all; the earliest invalid one is reported
pub fn bind(params: &[ResolvedParameter], args: &[String]) -> Result<Vec<Binding>, DispatchError> {
    let valid = validity(params, args);
    if let Some(position) = valid.iter().position(|ok| !ok) {
        return Err(DispatchError::InvalidParameter {
            name: params[position].name.clone(),
        });
    }
    Ok(params
        .iter()
        .enumerate()
        .map(|(position, param)| Binding {
            name: param.name.clone(),
            value: param.value(args, position),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn allowed(name: &str, values: &[&str]) -> ResolvedParameter {
        ResolvedParameter {
            name: name.to_string(),
            allowed: args(values),
            pattern: None,
        }
    }

    fn matching(name: &str, pattern: &str) -> ResolvedParameter {
        ResolvedParameter {
            name: name.to_string(),
            allowed: Vec::new(),
            pattern: Some(pattern.to_string()),
        }
    }

    #[test]
    fn test_exact_match_required() {
        let env = allowed("env", &["prod", "staging"]);
        assert!(env.accepts(&args(&["prod"]), 0));
        assert!(!env.accepts(&args(&["Prod"]), 0));
        assert!(!env.accepts(&args(&["pro"]), 0));
        assert!(!env.accepts(&args(&[]), 0));
    }

    #[test]
    fn test_match_is_substring_search() {
        let target = matching("target", "staging");
        assert!(target.accepts(&args(&["build", "staging-now"]), 0));
        assert!(!target.accepts(&args(&["build", "prod"]), 0));
    }

    #[test]
    fn test_match_consumes_remainder() {
        let params = vec![allowed("env", &["prod"]), matching("msg", "^hello")];
        let bindings = bind(&params, &args(&["prod", "hello", "big", "world"])).unwrap();
        assert_eq!(bindings[1].value, "hello big world");
    }

    #[test]
    fn test_first_invalid_is_reported() {
        let params = vec![allowed("a", &["x"]), allowed("b", &["y"])];
        let err = bind(&params, &args(&["nope", "y"])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidParameter {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_later_invalid_is_reported_when_first_valid() {
        let params = vec![allowed("a", &["x"]), allowed("b", &["y"])];
        let err = bind(&params, &args(&["x"])).unwrap_err();
        assert_eq!(err.passalong(), "b");
    }

    #[test]
    fn test_validity_vector() {
        let params = vec![allowed("a", &["x"]), allowed("b", &["y"])];
        assert_eq!(validity(&params, &args(&["x", "z"])), vec![true, false]);
    }

    #[test]
    fn test_no_parameters_binds_nothing() {
        assert!(bind(&[], &args(&["extra"])).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_appends_source_lines() {
        let tool = ToolDefinition::new("deploy", "deploy ${env}")
            .with_location("/srv")
            .with_parameter(
                ParameterSpec::new("env")
                    .with_allowed(["prod"])
                    .with_source("./list-envs"),
            );
        let runner = ScriptedRunner::new().respond("list-envs", "staging\nqa\n");
        let resolved = resolve(&tool, &runner).await;

        assert_eq!(resolved[0].allowed, vec!["prod", "staging", "qa"]);
        assert_eq!(runner.calls()[0][2], "cd /srv && ./list-envs");
    }

    #[tokio::test]
    async fn test_resolve_ignores_failed_source() {
        let tool = ToolDefinition::new("deploy", "deploy ${env}").with_parameter(
            ParameterSpec::new("env")
                .with_allowed(["prod"])
                .with_source("./list-envs"),
        );
        let runner = ScriptedRunner::new().respond("list-envs", "error running command:\nboom");
        let resolved = resolve(&tool, &runner).await;
        assert_eq!(resolved[0].allowed, vec!["prod"]);
    }

    #[tokio::test]
    async fn test_resolve_runs_source_every_time() {
        let tool = ToolDefinition::new("deploy", "deploy ${env}")
            .with_parameter(ParameterSpec::new("env").with_source("./list-envs"));
        let runner = ScriptedRunner::new().respond("list-envs", "prod\n");
        resolve(&tool, &runner).await;
        resolve(&tool, &runner).await;
        assert_eq!(runner.calls().len(), 2);
    }
}
