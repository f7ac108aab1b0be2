use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LLMSettings,
    pub git: GitSettings,
    pub behavior: BehaviorSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMSettings {
    /// "auto" scans providers by priority; or an explicit provider name
    pub provider: String,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
}

impl Default for LLMSettings {
    fn default() -> Self {
        LLMSettings {
            provider: "auto".to_string(),
            gemini: ProviderSettings::default_gemini(),
            openai: ProviderSettings::default_openai(),
            anthropic: ProviderSettings::default_anthropic(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            model: String::new(),
            max_tokens: 1000,
            temperature: 0.1,
            request_timeout_seconds: 30,
        }
    }
}

impl ProviderSettings {
    pub fn default_gemini() -> Self {
        ProviderSettings {
            model: "gemini-1.5-flash".to_string(),
            ..Default::default()
        }
    }

    pub fn default_openai() -> Self {
        ProviderSettings {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        }
    }

    pub fn default_anthropic() -> Self {
        ProviderSettings {
            model: "claude-sonnet-4-20250514".to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GitSettings {
    pub timeout_seconds: u64,
    pub max_commits: usize,
}

impl Default for GitSettings {
    fn default() -> Self {
        GitSettings {
            timeout_seconds: 30,
            max_commits: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BehaviorSettings {
    pub require_confirmation: bool,
    pub log_commands: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        BehaviorSettings {
            require_confirmation: true,
            log_commands: true,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitpilot"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;

        fs::write(&path, contents)?;

        // Set permissions to 600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let known = ["auto", "gemini", "openai", "anthropic"];
        if !known.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "Unsupported LLM provider: {}. Expected one of {known:?}",
                self.llm.provider
            )));
        }

        for (name, settings) in [
            ("gemini", &self.llm.gemini),
            ("openai", &self.llm.openai),
            ("anthropic", &self.llm.anthropic),
        ] {
            if settings.model.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} model name must not be empty"
                )));
            }
            if settings.max_tokens == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} max_tokens must be greater than 0"
                )));
            }
            if !(0.0..=2.0).contains(&settings.temperature) {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} temperature must be between 0.0 and 2.0"
                )));
            }
            if settings.request_timeout_seconds == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} request_timeout_seconds must be greater than 0"
                )));
            }
        }

        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.git.max_commits == 0 {
            return Err(ConfigError::InvalidValue(
                "max_commits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
