//! Configuration management
//!
//! Settings live in settings.json inside the data directory:
//! ```json
//! {
//!   "app": { ... },
//!   "classifier": { "environment": "production" }
//! }
//! ```
//! Fields this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the classifier base URL (testing)
pub const CLASSIFIER_URL_ENV: &str = "MONETA_CLASSIFIER_URL";

/// Environment variable selecting the classifier environment
pub const ENVIRONMENT_ENV: &str = "MONETA_ENV";

const SETTINGS_FILE: &str = "settings.json";

/// Which classification server to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Fixed base URL for this environment
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.moneta.app",
            Environment::Development => "http://127.0.0.1:8000",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!(
                "unknown environment '{}' (expected production or development)",
                other
            )),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: HashMap<String, serde_json::Value>,
    #[serde(default)]
    classifier: ClassifierSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifierSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Where the effective classifier URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlSource {
    UrlOverride,
    EnvironmentVariable,
    Settings,
    Default,
}

/// Moneta configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Environment stored in settings.json
    pub environment: Environment,
    settings_has_environment: bool,
    env_environment: Option<Environment>,
    url_override: Option<String>,
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(moneta_dir: &Path) -> Result<Self> {
        let mut config = Self::load_settings(moneta_dir)?;
        config.url_override = std::env::var(CLASSIFIER_URL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        config.env_environment = std::env::var(ENVIRONMENT_ENV)
            .ok()
            .and_then(|v| v.parse().ok());
        Ok(config)
    }

    /// Load only what settings.json says, ignoring environment variables
    pub fn load_settings(moneta_dir: &Path) -> Result<Self> {
        let raw = read_settings(moneta_dir)?;
        let stored = raw
            .classifier
            .environment
            .as_deref()
            .and_then(|v| v.parse::<Environment>().ok());

        Ok(Self {
            environment: stored.unwrap_or_default(),
            settings_has_environment: stored.is_some(),
            env_environment: None,
            url_override: None,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, moneta_dir: &Path) -> Result<()> {
        let mut settings = read_settings(moneta_dir)?;
        settings.classifier.environment = Some(self.environment.to_string());

        std::fs::create_dir_all(moneta_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(moneta_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
        self.settings_has_environment = true;
    }

    /// Environment after applying the `MONETA_ENV` override
    pub fn effective_environment(&self) -> Environment {
        self.env_environment.unwrap_or(self.environment)
    }

    /// Base URL of the classification server
    pub fn classifier_url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => self.effective_environment().base_url().to_string(),
        }
    }

    pub fn url_source(&self) -> UrlSource {
        if self.url_override.is_some() {
            UrlSource::UrlOverride
        } else if self.env_environment.is_some() {
            UrlSource::EnvironmentVariable
        } else if self.settings_has_environment {
            UrlSource::Settings
        } else {
            UrlSource::Default
        }
    }

    /// Apply overrides explicitly instead of reading the process environment
    pub fn with_overrides(mut self, url: Option<&str>, environment: Option<Environment>) -> Self {
        self.url_override = url.map(str::to_string);
        self.env_environment = environment;
        self
    }
}

fn read_settings(moneta_dir: &Path) -> Result<SettingsFile> {
    let settings_path = moneta_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    // A hand-edited file that no longer parses falls back to defaults
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_to_production() {
        let dir = tempdir().unwrap();
        let config = Config::load_settings(dir.path()).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.classifier_url(), "https://api.moneta.app");
        assert_eq!(config.url_source(), UrlSource::Default);
    }

    #[test]
    fn test_reads_environment_from_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"classifier": {"environment": "development"}}"#,
        )
        .unwrap();

        let config = Config::load_settings(dir.path()).unwrap();
        assert_eq!(config.classifier_url(), "http://127.0.0.1:8000");
        assert_eq!(config.url_source(), UrlSource::Settings);
    }

    #[test]
    fn test_override_precedence() {
        let config = Config::default().with_overrides(None, Some(Environment::Development));
        assert_eq!(config.classifier_url(), "http://127.0.0.1:8000");
        assert_eq!(config.url_source(), UrlSource::EnvironmentVariable);

        let config = config.with_overrides(Some("http://localhost:9999"), None);
        assert_eq!(config.classifier_url(), "http://localhost:9999");
        assert_eq!(config.url_source(), UrlSource::UrlOverride);
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"theme": "dark"}, "classifier": {"timeoutHint": 5}, "sync": {"x": 1}}"#,
        )
        .unwrap();

        let mut config = Config::load_settings(dir.path()).unwrap();
        config.set_environment(Environment::Development);
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["classifier"]["timeoutHint"], 5);
        assert_eq!(saved["classifier"]["environment"], "development");
        assert_eq!(saved["sync"]["x"], 1);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }
}
