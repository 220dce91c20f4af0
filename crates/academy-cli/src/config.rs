//! Configuration file support

use academy_ai::{GenerationConfig, Model};
use academy_chat::{SYSTEM_INSTRUCTION, SessionSettings, prompt::DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for academy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model to use
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// API base URL
    pub base_url: Option<String>,
    /// Custom system instruction file path
    pub system_prompt_file: Option<String>,
    /// API key (alternative to environment variables)
    pub api_key: Option<String>,
    /// Extra HTTP headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("academy")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ACADEMY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Write the example config if no config file exists yet
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Build session settings, applying overrides on top of this config
    pub fn session_settings(
        &self,
        model_override: Option<&str>,
        temperature_override: Option<f32>,
    ) -> anyhow::Result<SessionSettings> {
        let model_id = model_override
            .or(self.model.as_deref())
            .unwrap_or(academy_ai::DEFAULT_MODEL_ID);
        let mut model = Model::new(model_id);
        if let Some(ref base_url) = self.base_url {
            model = model.with_base_url(base_url.as_str());
        }
        model.headers = self.headers.clone();

        let temperature = temperature_override
            .or(self.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            anyhow::bail!("temperature must be between 0.0 and 2.0, got {}", temperature);
        }

        Ok(SessionSettings {
            model,
            system_instruction: self.system_instruction()?,
            generation: GenerationConfig {
                temperature: Some(temperature),
                max_output_tokens: None,
            },
        })
    }

    /// The system instruction: the configured file if any, else the built-in one
    fn system_instruction(&self) -> anyhow::Result<String> {
        match self.system_prompt_file {
            Some(ref file) => {
                let path = expand_home(file);
                fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("failed to read system prompt {}: {}", path.display(), e)
                })
            }
            None => Ok(SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# academy configuration file
# Place at ~/.config/academy/config.toml (Linux), or point ACADEMY_CONFIG_PATH at it

# Model to use
model = "gemini-2.5-flash"

# Sampling temperature (0.0 - 2.0)
temperature = 0.7

# API base URL (optional)
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# Replace the built-in admissions instruction (optional)
# system_prompt_file = "~/.config/academy/system_prompt.txt"

# API key (optional - API_KEY, GEMINI_API_KEY or GOOGLE_API_KEY also work)
# api_key = "..."

# Extra HTTP headers for every request, e.g. for a proxy (optional)
# [headers]
# x-goog-user-project = "my-project"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.temperature, Some(0.7));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_defaults() {
        let settings = Config::default().session_settings(None, None).unwrap();
        assert_eq!(settings.model.id, academy_ai::DEFAULT_MODEL_ID);
        assert_eq!(settings.generation.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(settings.system_instruction, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config {
            model: Some("gemini-2.5-pro".into()),
            temperature: Some(0.2),
            base_url: Some("http://localhost:9000/v1beta/".into()),
            ..Default::default()
        };
        let settings = config
            .session_settings(Some("gemini-2.0-flash"), Some(1.0))
            .unwrap();
        assert_eq!(settings.model.id, "gemini-2.0-flash");
        assert_eq!(settings.model.base_url, "http://localhost:9000/v1beta");
        assert_eq!(settings.generation.temperature, Some(1.0));
    }

    #[test]
    fn test_headers_reach_model() {
        let config: Config = toml::from_str(
            r#"
model = "gemini-2.5-flash"

[headers]
x-goog-user-project = "admissions"
"#,
        )
        .unwrap();
        let settings = config.session_settings(None, None).unwrap();
        assert_eq!(
            settings.model.headers.get("x-goog-user-project").map(String::as_str),
            Some("admissions")
        );
    }

    #[test]
    fn test_out_of_range_temperature_rejected() {
        assert!(Config::default().session_settings(None, Some(3.5)).is_err());
    }

    #[test]
    fn test_missing_prompt_file_is_error() {
        let config = Config {
            system_prompt_file: Some("/nonexistent/academy/prompt.txt".into()),
            ..Default::default()
        };
        assert!(config.session_settings(None, None).is_err());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/academy/config.toml"));
        assert!(config.model.is_none());
    }
}
