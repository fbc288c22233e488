//! Tool catalog loading from YAML configuration
//!
//! Loads admins, message templates, vendor dependencies and tool definitions
//! from one document and provides lookup methods. The catalog is read-only
//! once built.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ChatOpsError, Result};

use super::definition::{AdminConfig, DependencyInstall, MessageTemplate, ToolDefinition};

/// Tool word that stops the bot instead of resolving a tool
pub const EXIT_WORD: &str = "exit";

/// YAML file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogDocument {
    admins: Vec<AdminConfig>,
    messages: Vec<MessageTemplate>,
    dependencies: Vec<DependencyInstall>,
    tools: Vec<ToolDefinition>,
}

/// Catalog of tools and messages loaded from YAML
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    admin: AdminConfig,
    messages: Vec<MessageTemplate>,
    dependencies: Vec<DependencyInstall>,
    tools: Vec<ToolDefinition>,
    by_trigger: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Build a catalog from parts, applying the same checks as a file load
    pub fn new(
        admin: AdminConfig,
        messages: Vec<MessageTemplate>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Self> {
        Self::from_document(CatalogDocument {
            admins: vec![admin],
            messages,
            dependencies: Vec::new(),
            tools,
        })
    }

    /// Load catalog from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ChatOpsError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Load catalog from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(content)?;
        Self::from_document(document)
    }

    fn from_document(document: CatalogDocument) -> Result<Self> {
        let admin = document
            .admins
            .into_iter()
            .next()
            .ok_or_else(|| ChatOpsError::Config("admins must list at least one entry".to_string()))?;
        if admin.trigger.trim().is_empty() {
            return Err(ChatOpsError::Config("admins[0].trigger must not be empty".to_string()));
        }

        let mut by_trigger = HashMap::new();
        for (index, tool) in document.tools.iter().enumerate() {
            Self::check_tool(tool)?;
            if by_trigger.insert(tool.trigger.clone(), index).is_some() {
                return Err(ChatOpsError::Config(format!(
                    "Duplicate trigger '{}' in tools",
                    tool.trigger
                )));
            }
        }

        Ok(Self {
            admin,
            messages: document.messages,
            dependencies: document.dependencies,
            tools: document.tools,
            by_trigger,
        })
    }

    /// Reject tool shapes whose validation semantics would be ambiguous
    fn check_tool(tool: &ToolDefinition) -> Result<()> {
        if tool.trigger.trim().is_empty() {
            return Err(ChatOpsError::Config(format!(
                "Tool '{}' has an empty trigger",
                tool.name
            )));
        }
        if tool.trigger == EXIT_WORD {
            return Err(ChatOpsError::Config(format!(
                "Tool '{}' uses the reserved trigger '{}'",
                tool.name, EXIT_WORD
            )));
        }

        let last = tool.parameters.len().saturating_sub(1);
        for (index, param) in tool.parameters.iter().enumerate() {
            if !param.is_match() {
                continue;
            }
            if !param.allowed.is_empty() || param.has_source() {
                return Err(ChatOpsError::Config(format!(
                    "Parameter '{}' of tool '{}' sets match together with allowed/source",
                    param.name, tool.trigger
                )));
            }
            if index != last {
                return Err(ChatOpsError::Config(format!(
                    "Parameter '{}' of tool '{}' uses match but is not the last parameter",
                    param.name, tool.trigger
                )));
            }
            let pattern = param.pattern.as_deref().unwrap_or_default();
            if let Err(e) = Regex::new(pattern) {
                return Err(ChatOpsError::Config(format!(
                    "Parameter '{}' of tool '{}' has an invalid match pattern: {}",
                    param.name, tool.trigger, e
                )));
            }
        }
        Ok(())
    }

    /// Primary admin settings
    pub fn admin(&self) -> &AdminConfig {
        &self.admin
    }

    /// Get a tool by its trigger word
    pub fn lookup_tool(&self, trigger: &str) -> Option<&ToolDefinition> {
        self.by_trigger.get(trigger).map(|&index| &self.tools[index])
    }

    /// Get a message template; a miss yields the key itself as active text
    pub fn lookup_message(&self, name: &str) -> MessageTemplate {
        self.messages
            .iter()
            .rev()
            .find(|m| m.name == name)
            .cloned()
            .unwrap_or_else(|| MessageTemplate::new(name, name))
    }

    /// Text to post for a template, `None` when suppressed; a miss posts the bare key
    pub fn render_message(&self, name: &str, passalong: &str) -> Option<String> {
        match self.messages.iter().rev().find(|m| m.name == name) {
            Some(template) if !template.active => None,
            Some(template) => Some(template.render(passalong)),
            None => Some(name.to_string()),
        }
    }

    /// All tools in declaration order
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn dependencies(&self) -> &[DependencyInstall] {
        &self.dependencies
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check if a trigger exists
    pub fn contains(&self, trigger: &str) -> bool {
        self.by_trigger.contains_key(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::definition::{ParameterSpec, ResponseMode};

    const SAMPLE_YAML: &str = r#"
admins:
  - trigger: "!bot"
    appName: Bot
    privateChannelId: CADMIN
    logChannelId: CLOG
messages:
  - name: processing_command
    text: "Processing command..."
    active: true
  - name: invalid_parameter
    text: "Invalid parameter value: %s"
    active: true
  - name: ephemeral
    text: "Message only shown to user who triggered it."
    active: false
dependencies:
  - name: jq
    install:
      - "curl -sLo jq https://example.com/jq"
tools:
  - name: Deploy
    description: Deploy a service
    help: "!bot deploy [env]"
    trigger: deploy
    location: /srv/deploy
    command:
      - ./deploy.sh
      - ${env}
    permissions:
      - C123
    log: true
    ephemeral: false
    response: code
    parameters:
      - name: env
        allowed: [prod, staging]
  - name: Echo
    trigger: echo
    command: [echo, "${msg}"]
    permissions: [all]
    parameters:
      - name: msg
        match: '.*'
"#;

    #[test]
    fn test_load_from_yaml() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.admin().trigger, "!bot");
        assert_eq!(catalog.dependencies().len(), 1);
    }

    #[test]
    fn test_lookup_tool() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        let deploy = catalog.lookup_tool("deploy").unwrap();
        assert_eq!(deploy.name, "Deploy");
        assert_eq!(deploy.location, "/srv/deploy");
        assert_eq!(deploy.response, ResponseMode::Code);
        assert!(deploy.log);
        assert_eq!(deploy.parameters[0].allowed, vec!["prod", "staging"]);
        assert!(catalog.lookup_tool("Deploy").is_none());
        assert!(catalog.lookup_tool("missing").is_none());
    }

    #[test]
    fn test_lookup_message_hit() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        let msg = catalog.lookup_message("invalid_parameter");
        assert!(msg.active);
        assert_eq!(msg.render("env"), "Invalid parameter value: env");
        assert!(!catalog.lookup_message("ephemeral").active);
    }

    #[test]
    fn test_lookup_message_miss_falls_back_to_key() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        let msg = catalog.lookup_message("exiting: success");
        assert!(msg.active);
        assert_eq!(msg.text, "exiting: success");
    }

    #[test]
    fn test_render_message() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(
            catalog.render_message("invalid_parameter", "env").as_deref(),
            Some("Invalid parameter value: env")
        );
        assert_eq!(catalog.render_message("ephemeral", ""), None);
    }

    #[test]
    fn test_render_message_miss_drops_passalong() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(
            catalog.render_message("user_lookup_failed", "U404").as_deref(),
            Some("user_lookup_failed")
        );
    }

    #[test]
    fn test_missing_admins_rejected() {
        let err = ToolCatalog::from_yaml("tools: []").unwrap_err();
        assert!(err.to_string().contains("admins"));
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let admin = AdminConfig {
            trigger: "!bot".to_string(),
            ..Default::default()
        };
        let tools = vec![
            ToolDefinition::new("ping", "echo pong"),
            ToolDefinition::new("ping", "echo ping"),
        ];
        let err = ToolCatalog::new(admin, Vec::new(), tools).unwrap_err();
        assert!(err.to_string().contains("Duplicate trigger 'ping'"));
    }

    #[test]
    fn test_reserved_exit_trigger_rejected() {
        let admin = AdminConfig {
            trigger: "!bot".to_string(),
            ..Default::default()
        };
        let err = ToolCatalog::new(admin, Vec::new(), vec![ToolDefinition::new("exit", "true")])
            .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_match_with_allowed_rejected() {
        let admin = AdminConfig {
            trigger: "!bot".to_string(),
            ..Default::default()
        };
        let tool = ToolDefinition::new("say", "echo ${msg}").with_parameter(
            ParameterSpec::new("msg")
                .with_pattern(".*")
                .with_allowed(["hi"]),
        );
        let err = ToolCatalog::new(admin, Vec::new(), vec![tool]).unwrap_err();
        assert!(err.to_string().contains("match together with allowed/source"));
    }

    #[test]
    fn test_match_not_last_rejected() {
        let admin = AdminConfig {
            trigger: "!bot".to_string(),
            ..Default::default()
        };
        let tool = ToolDefinition::new("say", "echo ${msg} ${who}")
            .with_parameter(ParameterSpec::new("msg").with_pattern(".*"))
            .with_parameter(ParameterSpec::new("who").with_allowed(["me"]));
        let err = ToolCatalog::new(admin, Vec::new(), vec![tool]).unwrap_err();
        assert!(err.to_string().contains("not the last parameter"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let admin = AdminConfig {
            trigger: "!bot".to_string(),
            ..Default::default()
        };
        let tool = ToolDefinition::new("say", "echo ${msg}")
            .with_parameter(ParameterSpec::new("msg").with_pattern("(unclosed"));
        let err = ToolCatalog::new(admin, Vec::new(), vec![tool]).unwrap_err();
        assert!(err.to_string().contains("invalid match pattern"));
    }

    #[test]
    fn test_contains_and_iteration_order() {
        let catalog = ToolCatalog::from_yaml(SAMPLE_YAML).unwrap();
        assert!(catalog.contains("echo"));
        let triggers: Vec<&str> = catalog.tools().map(|t| t.trigger.as_str()).collect();
        assert_eq!(triggers, vec!["deploy", "echo"]);
        assert!(!catalog.is_empty());
    }
}
