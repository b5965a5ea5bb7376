// Configuration
// Loads API settings from ~/.archflow/config.toml or environment

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::error::WorkflowError;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct ArchflowConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl ArchflowConfig {
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.api_key.trim().is_empty() {
            return Err(WorkflowError::Config("api_key is empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(WorkflowError::Config(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from `~/.archflow/config.toml`, falling back to the
/// `ANTHROPIC_API_KEY` environment variable.
pub fn load_config() -> Result<ArchflowConfig, WorkflowError> {
    let loaded = default_config_path()
        .and_then(try_load_from_file)
        .map_err(|e| WorkflowError::Config(format!("{e:#}")))?;
    if let Some(config) = loaded {
        return Ok(config);
    }

    if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
        if !api_key.is_empty() {
            return Ok(ArchflowConfig::with_api_key(api_key));
        }
    }

    Err(WorkflowError::Config(format!(
        "No configuration found. Create ~/.archflow/config.toml:\n\n\
        api_key = \"sk-ant-...\"\n\
        model = \"{DEFAULT_MODEL}\"   # optional\n\n\
        Alternatively, set the environment variable:\n\
        export ANTHROPIC_API_KEY=\"sk-ant-...\""
    )))
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".archflow/config.toml"))
}

fn try_load_from_file(config_path: PathBuf) -> anyhow::Result<Option<ArchflowConfig>> {
    #[derive(Deserialize)]
    struct TomlConfig {
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        max_tokens: Option<u32>,
    }

    if !config_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let toml_config: TomlConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    let config = ArchflowConfig {
        api_key: toml_config.api_key,
        model: toml_config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        base_url: toml_config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        max_tokens: toml_config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    };

    config.validate()?;

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_api_key() {
        let config = ArchflowConfig::with_api_key("sk-test".to_string());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let config = ArchflowConfig::with_api_key("  ".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let mut config = ArchflowConfig::with_api_key("sk-test".to_string());
        config.max_tokens = 0;
        assert!(matches!(
            config.validate(),
            Err(WorkflowError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "api_key = \"sk-file\"\nmodel = \"claude-3-5-haiku-latest\"\nmax_tokens = 2048"
        )
        .unwrap();

        let config = try_load_from_file(path).unwrap().unwrap();
        assert_eq!(config.api_key, "sk-file");
        assert_eq!(config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_empty_key_in_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"\"\n").unwrap();
        assert!(try_load_from_file(path).is_err());
    }

    #[test]
    fn test_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = try_load_from_file(dir.path().join("absent.toml")).unwrap();
        assert!(result.is_none());
    }
}
