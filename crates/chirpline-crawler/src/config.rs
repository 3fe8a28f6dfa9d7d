//! Configuration loading - credentials, search keys, run parameters
//!
//! Anything wrong here is a startup error: the crawl loop never begins with
//! missing credentials or an unreadable key list, and nothing in this module
//! is retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::mode::SearchMode;

/// One independently rate-limited API credential.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub name: String,
    /// May reference an environment variable as `${VAR}`
    pub bearer_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com/1.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Language filter for keyword searches; omit to disable
    pub lang: Option<String>,
    pub keyword_count: u32,
    pub timeline_count: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            lang: Some("ja".to_string()),
            keyword_count: 100,
            timeline_count: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub checkpoint: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./results"),
            checkpoint: PathBuf::from("./crawl_state.json"),
        }
    }
}

/// chirpline.toml as written on disk.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub accounts: Vec<Account>,
}

impl FileConfig {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./chirpline.toml (current directory)
    /// 2. ~/.config/chirpline/config.toml
    ///
    /// If no config file found, returns default config (which has no
    /// accounts and will fail crawl validation).
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("chirpline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "chirpline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Expand every account token and validate there is at least one.
    pub fn resolve_accounts(&self) -> Result<Vec<Account>> {
        anyhow::ensure!(
            !self.accounts.is_empty(),
            "no [[accounts]] configured - at least one credential is required"
        );
        self.accounts
            .iter()
            .map(|account| {
                let token = expand_env_var(&account.bearer_token).with_context(|| {
                    format!("cannot resolve bearer_token for account '{}'", account.name)
                })?;
                anyhow::ensure!(
                    !token.is_empty(),
                    "empty bearer_token for account '{}'",
                    account.name
                );
                Ok(Account {
                    name: account.name.clone(),
                    bearer_token: token,
                })
            })
            .collect()
    }
}

/// Expand `${VAR}` to the environment variable's value; literals pass through.
fn expand_env_var(s: &str) -> Result<String> {
    match s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name)
            .with_context(|| format!("environment variable {var_name} is not set")),
        None => Ok(s.to_string()),
    }
}

/// Read the search-key list: one key per line, commas also accepted,
/// `#` comments and blank entries ignored.
pub fn load_keys(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key list: {}", path.display()))?;

    let mut keys = Vec::new();
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default();
        for key in line.split(',') {
            let key = key.trim();
            if !key.is_empty() {
                keys.push(key.to_string());
            }
        }
    }
    anyhow::ensure!(!keys.is_empty(), "No keys found in {}", path.display());
    Ok(keys)
}

/// Fully resolved parameters for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub mode: SearchMode,
    /// Search keys in configuration order (selection ties break toward the
    /// front)
    pub keys: Vec<String>,
    /// Credentials in configuration order, tokens already expanded
    pub accounts: Vec<Account>,
    pub api_base: String,
    pub search: SearchConfig,
    pub output_dir: PathBuf,
    pub checkpoint: PathBuf,
    /// Total wall-clock run budget
    pub budget: Duration,
    /// Output/checkpoint flush cadence
    pub flush_interval: Duration,
    /// Fixed sleep before retrying a failed fetch or status query
    pub retry_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[api]
base_url = "http://localhost:8080/1.1"

[search]
lang = "en"
keyword_count = 50

[output]
dir = "/tmp/out"

[[accounts]]
name = "alpha"
bearer_token = "literal-token"

[[accounts]]
name = "beta"
bearer_token = "other-token"
"#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/1.1");
        assert_eq!(config.search.lang.as_deref(), Some("en"));
        assert_eq!(config.search.keyword_count, 50);
        // unset fields fall back to defaults
        assert_eq!(config.search.timeline_count, 200);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[1].name, "beta");
    }

    #[test]
    fn defaults_without_file() {
        let config = FileConfig::default();
        assert_eq!(config.api.base_url, "https://api.twitter.com/1.1");
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn resolve_accounts_requires_one() {
        let config = FileConfig::default();
        assert!(config.resolve_accounts().is_err());
    }

    #[test]
    fn resolve_accounts_expands_env() {
        std::env::set_var("CHIRPLINE_TEST_TOKEN", "secret");
        let config = FileConfig {
            accounts: vec![Account {
                name: "alpha".to_string(),
                bearer_token: "${CHIRPLINE_TEST_TOKEN}".to_string(),
            }],
            ..Default::default()
        };
        let accounts = config.resolve_accounts().unwrap();
        assert_eq!(accounts[0].bearer_token, "secret");
        std::env::remove_var("CHIRPLINE_TEST_TOKEN");
    }

    #[test]
    fn resolve_accounts_missing_env_fails() {
        let config = FileConfig {
            accounts: vec![Account {
                name: "alpha".to_string(),
                bearer_token: "${CHIRPLINE_NO_SUCH_VAR_12345}".to_string(),
            }],
            ..Default::default()
        };
        assert!(config.resolve_accounts().is_err());
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal").unwrap(), "literal");
    }

    #[test]
    fn load_keys_lines_commas_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(&path, "rust, tokio\n# a comment\nserde\n\nasync # trailing\n").unwrap();

        let keys = load_keys(&path).unwrap();
        assert_eq!(keys, vec!["rust", "tokio", "serde", "async"]);
    }

    #[test]
    fn load_keys_empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(load_keys(&path).is_err());
    }

    #[test]
    fn load_keys_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_keys(&dir.path().join("absent.csv")).is_err());
    }
}
