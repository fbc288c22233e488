use chatops::tools::ToolCatalog;
use eyre::{Context, Result, eyre};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the binary needs besides the CLI flags
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub catalog: ToolCatalog,
    pub command_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>, command_timeout_secs: Option<u64>) -> Result<Self> {
        let path = resolve_path(config_path, &default_candidates())?;
        let catalog = ToolCatalog::from_file(&path).context(format!("Failed to load config from {}", path.display()))?;
        log::info!("Loaded config from: {}", path.display());

        Ok(Self {
            path,
            catalog,
            command_timeout: command_timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
        })
    }
}

/// `~/.config/<project>/<project>.yml`, then `./<project>.yml`
fn default_candidates() -> Vec<PathBuf> {
    let project_name = env!("CARGO_PKG_NAME");
    let mut candidates = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
    }
    candidates.push(PathBuf::from(format!("{}.yml", project_name)));
    candidates
}

/// An explicit path wins; otherwise the first candidate that exists
fn resolve_path(explicit: Option<&PathBuf>, candidates: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    candidates
        .iter()
        .find(|candidate| candidate.exists())
        .cloned()
        .ok_or_else(|| {
            let searched: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
            eyre!("No config file found (searched: {})", searched.join(", "))
        })
}

/// Slack credentials for serving
#[derive(Debug, Clone)]
pub struct Credentials {
    pub bot_token: String,
    pub app_token: String,
}

impl Credentials {
    pub fn new(bot_token: Option<&str>, app_token: Option<&str>) -> Result<Self> {
        Ok(Self {
            bot_token: require("SLACK_BOT_TOKEN", bot_token)?,
            app_token: require("SLACK_APP_TOKEN", app_token)?,
        })
    }
}

/// Bot token alone, for one-off posts
pub fn bot_token(bot_token: Option<&str>) -> Result<String> {
    require("SLACK_BOT_TOKEN", bot_token)
}

fn require(name: &str, value: Option<&str>) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| eyre!("{} is not set", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
admins:
  - trigger: "!bot"
    appName: Bot
    privateChannelId: CADMIN
    logChannelId: CLOG
tools:
  - name: Ping
    trigger: ping
    command: ["echo pong"]
    permissions: [all]
"#;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/etc/chatops.yml");
        let resolved = resolve_path(Some(&explicit), &[PathBuf::from("/nope")]).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let second = dir.path().join("chatops.yml");
        fs::write(&second, CONFIG).unwrap();
        let candidates = vec![dir.path().join("missing.yml"), second.clone()];
        assert_eq!(resolve_path(None, &candidates).unwrap(), second);
    }

    #[test]
    fn test_no_candidate_is_error() {
        let err = resolve_path(None, &[PathBuf::from("/definitely/missing.yml")]).unwrap_err();
        assert!(err.to_string().contains("No config file found"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chatops.yml");
        fs::write(&path, CONFIG).unwrap();

        let config = Config::load(Some(&path), Some(30)).unwrap();
        assert!(config.catalog.contains("ping"));
        assert_eq!(config.command_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chatops.yml");
        fs::write(&path, CONFIG).unwrap();
        assert!(Config::load(Some(&path), Some(0)).unwrap().command_timeout.is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chatops.yml");
        fs::write(&path, "admins: []\n").unwrap();
        assert!(Config::load(Some(&path), None).is_err());
    }

    #[test]
    fn test_credentials_required() {
        assert!(Credentials::new(Some("xoxb-1"), Some("xapp-1")).is_ok());
        let err = Credentials::new(Some("xoxb-1"), Some("  ")).unwrap_err();
        assert!(err.to_string().contains("SLACK_APP_TOKEN"));
        assert!(bot_token(None).is_err());
    }
}
