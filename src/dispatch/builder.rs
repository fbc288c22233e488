//! Command composition
//!
//! Turns a tool's command template and validated bindings into the shell line
//! that runs: runtime exports, `cd` into the tool location, then the body.

use crate::exec::bash;

use super::params::Binding;

/// Variables exported into every command; never required from the host
pub const RUNTIME_ENV_VARS: [&str; 5] = [
    "TRIGGERED_AT",
    "TRIGGERED_USER_ID",
    "TRIGGERED_USER_NAME",
    "TRIGGERED_CHANNEL_ID",
    "TRIGGERED_CHANNEL_NAME",
];

/// Placeholder replaced with the invoking user's email
const EMAIL_PLACEHOLDER: &str = "${email}";

/// Indentation used when breaking the display form at `&&`
const DISPLAY_BREAK: &str = " \\\n        &&";

/// Who triggered the command and where
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    pub timestamp: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    pub channel_name: String,
}

impl RuntimeContext {
    fn exports(&self) -> Vec<String> {
        let values = [
            &self.timestamp,
            &self.user_id,
            &self.user_name,
            &self.channel_id,
            &self.channel_name,
        ];
        RUNTIME_ENV_VARS
            .iter()
            .zip(values)
            .map(|(name, value)| format!("export {}={}", name, value))
            .collect()
    }
}

/// The shell line for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    /// Template after substitution, without the exports
    pub body: String,
    /// Full line handed to the shell
    pub composed: String,
}

impl BuiltCommand {
    pub fn argv(&self) -> Vec<String> {
        bash(self.composed.clone())
    }

    /// The composed line broken onto one line per `&&` step
    pub fn display(&self) -> String {
        display_form(&self.composed)
    }
}

/// Replace every `${email}`
pub fn substitute_email(template: &str, email: &str) -> String {
    template.replace(EMAIL_PLACEHOLDER, email)
}

/// Replace every `${name}` with its bound value, in declaration order
pub fn substitute(template: &str, bindings: &[Binding]) -> String {
    bindings.iter().fold(template.to_string(), |acc, binding| {
        acc.replace(&format!("${{{}}}", binding.name), &binding.value)
    })
}

/// Prefix `body` with the runtime exports and the working directory change
pub fn compose(body: &str, location: &str, context: &RuntimeContext) -> String {
    let mut steps = context.exports();
    steps.push(format!("cd {}", location));
    steps.push(body.to_string());
    steps.join(" && ")
}

/// Break a command chain before each `&&` that follows whitespace
pub fn display_form(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut rest = command;
    while let Some(index) = rest.find("&&") {
        let (before, after) = rest.split_at(index);
        match before.chars().last() {
            Some(c) if c.is_whitespace() => {
                out.push_str(&before[..before.len() - c.len_utf8()]);
                out.push_str(DISPLAY_BREAK);
            }
            _ => {
                out.push_str(before);
                out.push_str("&&");
            }
        }
        rest = &after[2..];
    }
    out.push_str(rest);
    out
}

/// Build the full command for a tool invocation
pub fn build(
    template: &str,
    email: &str,
    bindings: &[Binding],
    location: &str,
    context: &RuntimeContext,
) -> BuiltCommand {
    let body = substitute(&substitute_email(template, email), bindings);
    let composed = compose(&body, location, context);
    BuiltCommand { body, composed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, value: &str) -> Binding {
        Binding {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn context() -> RuntimeContext {
        RuntimeContext {
            timestamp: "1700000000.000100".to_string(),
            user_id: "U1".to_string(),
            user_name: "alice".to_string(),
            channel_id: "C123".to_string(),
            channel_name: "ops".to_string(),
        }
    }

    #[test]
    fn test_substitute_single_parameter() {
        assert_eq!(substitute("deploy ${env}", &[binding("env", "prod")]), "deploy prod");
    }

    #[test]
    fn test_substitute_every_occurrence() {
        assert_eq!(
            substitute("echo ${env} ${env}", &[binding("env", "qa")]),
            "echo qa qa"
        );
    }

    #[test]
    fn test_substitute_is_literal() {
        assert_eq!(substitute("echo ${x}", &[binding("x", "$1 $HOME")]), "echo $1 $HOME");
    }

    #[test]
    fn test_substitute_email() {
        assert_eq!(
            substitute_email("notify ${email} ${email}", "a@b.c"),
            "notify a@b.c a@b.c"
        );
    }

    #[test]
    fn test_compose_exports_then_location() {
        let composed = compose("deploy prod", "/srv/app", &context());
        assert_eq!(
            composed,
            "export TRIGGERED_AT=1700000000.000100 && export TRIGGERED_USER_ID=U1 && \
             export TRIGGERED_USER_NAME=alice && export TRIGGERED_CHANNEL_ID=C123 && \
             export TRIGGERED_CHANNEL_NAME=ops && cd /srv/app && deploy prod"
        );
    }

    #[test]
    fn test_display_form() {
        assert_eq!(
            display_form("cd /srv && make && echo a&&b"),
            "cd /srv \\\n        && make \\\n        && echo a&&b"
        );
    }

    #[test]
    fn test_build_argv() {
        let built = build("deploy ${env}", "", &[binding("env", "prod")], ".", &context());
        assert_eq!(built.body, "deploy prod");
        let argv = built.argv();
        assert_eq!(argv[0], "bash");
        assert_eq!(argv[1], "-c");
        assert!(argv[2].ends_with("&& cd . && deploy prod"));
    }
}
