//! File-based configuration (YAML)
//!
//! Supports user-level (~/.config/toolbridge/config.yaml) and workspace-level
//! (.config/toolbridge/config.yaml) files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::ClientConfig;
use super::error::{ConfigError, ConfigResult};
use super::server::ServerDescriptor;
use crate::logging::LogLevel;

/// Configuration file structure
///
/// ```yaml
/// model: deepseek-chat
/// system_prompt: You are a terse assistant.
/// enable_logging: true
/// log_level: debug
/// servers:
///   - https://tools.example.com/mcp
///   - servers/weather.py
///   - command: node
///     args: [index.js]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    /// Server descriptors, resolved lazily on connect
    #[serde(default)]
    pub servers: Vec<Value>,
    pub enable_logging: Option<bool>,
    pub enable_progress: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    User,
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }

    /// Default file location for this level
    pub fn path(&self, workspace_root: impl AsRef<Path>) -> PathBuf {
        match self {
            ConfigLevel::User => {
                let config_dir = dirs::config_dir().unwrap_or_else(|| {
                    dirs::home_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join(".config")
                });
                config_dir.join("toolbridge").join("config.yaml")
            }
            ConfigLevel::Workspace => workspace_root
                .as_ref()
                .join(".config")
                .join("toolbridge")
                .join("config.yaml"),
        }
    }
}

impl ConfigFile {
    /// Load a config file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the user-level file, then let the workspace-level file override it
    pub fn load_layered(workspace_root: impl AsRef<Path>) -> ConfigResult<Self> {
        let root = workspace_root.as_ref();
        let user = Self::load(ConfigLevel::User.path(root))?;
        let workspace = Self::load(ConfigLevel::Workspace.path(root))?;
        Ok(user.merge(workspace))
    }

    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Save config to file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Overlay `other` on top of `self`. Non-empty server lists replace.
    pub fn merge(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            model: other.model.or(self.model),
            system_prompt: other.system_prompt.or(self.system_prompt),
            servers: if other.servers.is_empty() {
                self.servers
            } else {
                other.servers
            },
            enable_logging: other.enable_logging.or(self.enable_logging),
            enable_progress: other.enable_progress.or(self.enable_progress),
            log_level: other.log_level.or(self.log_level),
            max_tokens: other.max_tokens.or(self.max_tokens),
            temperature: other.temperature.or(self.temperature),
        }
    }

    /// Build a client config; `default_model` applies when the file names none
    pub fn into_client_config(self, default_model: &str) -> ClientConfig {
        let model = self.model.unwrap_or_else(|| default_model.to_string());
        let mut config = ClientConfig::new(model)
            .with_servers(self.servers.into_iter().map(ServerDescriptor::Raw))
            .with_logging(self.enable_logging.unwrap_or(false))
            .with_progress(self.enable_progress.unwrap_or(false));
        if let Some(prompt) = self.system_prompt {
            config = config.with_system_prompt(prompt);
        }
        if let Some(level) = self.log_level {
            config = config.with_log_level(level);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_server, TransportKind};
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
model: deepseek-chat
system_prompt: Be brief.
enable_logging: true
log_level: debug
max_tokens: 1000
servers:
  - https://tools.example.com/mcp
  - servers/weather.py
  - command: node
    args: [index.js]
"#;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load(temp.path().join("nope.yaml")).unwrap();
        assert!(config.model.is_none());
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_parse_and_convert() {
        let file = ConfigFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(file.servers.len(), 3);
        assert_eq!(file.log_level, Some(LogLevel::Debug));

        let config = file.into_client_config("fallback");
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.system_prompt, "Be brief.");
        assert_eq!(config.max_tokens, 1000);
        assert!(config.enable_logging);

        let kinds: Vec<_> = config
            .servers
            .iter()
            .map(|d| resolve_server(d).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![TransportKind::Http, TransportKind::Stdio, TransportKind::Stdio]
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ConfigFile::from_yaml("model: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");
        let file = ConfigFile::from_yaml(SAMPLE).unwrap();
        file.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("deepseek-chat"));
        assert_eq!(loaded.servers.len(), 3);
    }

    #[test]
    fn test_workspace_overrides_user() {
        let user = ConfigFile::from_yaml("model: a\nservers: [http://a]\nmax_tokens: 10").unwrap();
        let workspace = ConfigFile::from_yaml("model: b").unwrap();
        let merged = user.merge(workspace);
        assert_eq!(merged.model.as_deref(), Some("b"));
        assert_eq!(merged.servers.len(), 1);
        assert_eq!(merged.max_tokens, Some(10));
    }

    #[test]
    fn test_workspace_can_disable_user_flags() {
        let user = ConfigFile::from_yaml("enable_logging: true\nenable_progress: true").unwrap();
        let workspace = ConfigFile::from_yaml("enable_logging: false").unwrap();
        let merged = user.merge(workspace);
        assert_eq!(merged.enable_logging, Some(false));
        assert_eq!(merged.enable_progress, Some(true));

        let config = merged.into_client_config("fallback");
        assert!(!config.enable_logging);
        assert!(config.enable_progress);
    }

    #[test]
    fn test_workspace_path() {
        let temp = TempDir::new().unwrap();
        let path = ConfigLevel::Workspace.path(temp.path());
        assert!(path.ends_with(".config/toolbridge/config.yaml"));
    }
}
