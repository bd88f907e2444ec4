//! Configuration management for bulkfeed.
//!
//! Configuration is read from `~/.config/bulkfeed/config.toml` at startup, or
//! from the path given with `--config`. If the default file doesn't exist, one
//! with commented defaults is created.

use crate::checker::ImageCheckPolicy;
use crate::export::DEFAULT_COLUMNS;
use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::rewriter::RewriteEligibility;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 100;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub images: ImagesConfig,
    pub rewrite: RewriteConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Site to pull posts from when none is given on the command line.
    pub domain: Option<String>,
    /// Posts requested per page (1-100).
    pub batch_size: usize,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            domain: None,
            batch_size: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub policy: ImageCheckPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub eligibility: RewriteEligibility,
    pub model: String,
    pub max_tokens: u32,
    pub api_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            eligibility: RewriteEligibility::default(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub columns: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&self.source.batch_size) {
            return Err(ConfigError::Invalid(format!(
                "source.batch_size must be between {} and {}, got {}",
                MIN_BATCH_SIZE, MAX_BATCH_SIZE, self.source.batch_size
            )));
        }

        if self.export.columns.is_empty() {
            return Err(ConfigError::Invalid(
                "export.columns must name at least one column".into(),
            ));
        }

        if self.rewrite.max_tokens == 0 {
            return Err(ConfigError::Invalid("rewrite.max_tokens must be > 0".into()));
        }

        Ok(())
    }

    /// Get the default config file path: `~/.config/bulkfeed/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("bulkfeed").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# bulkfeed configuration

[source]
# Site to pull posts from when --domain is not given.
# domain = "example.com"

# Posts per page, 1-100.
batch_size = 10

[images]
# How image URLs are checked:
#   "existence"     HEAD request, falling back to a 5 second full load
#   "content-type"  full GET, must return an image/* content type
#   "canva-fetch"   like content-type, labelled canva_ok / canva_fail
policy = "content-type"

[rewrite]
# Which items get new titles:
#   "has-image"    any item with an image URL
#   "valid-image"  only items whose image check passed
eligibility = "has-image"
model = "claude-sonnet-4-20250514"
max_tokens = 1000
api_url = "https://api.anthropic.com/v1/messages"
# Environment variable holding the API key.
api_key_env = "ANTHROPIC_API_KEY"

[export]
# Header row of the CSV. Recognised names: Title, Original_Title,
# Image_URL, Link, Image_Status. Anything else exports empty cells.
columns = ["Title", "Image_URL", "Link"]
output_dir = "."
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.source.batch_size, 10);
        assert_eq!(config.images.policy, ImageCheckPolicy::ContentType);
        assert_eq!(config.rewrite.eligibility, RewriteEligibility::HasImage);
        assert_eq!(config.export.columns, vec!["Title", "Image_URL", "Link"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[images]
policy = "canva-fetch"

[rewrite]
eligibility = "valid-image"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.images.policy, ImageCheckPolicy::CanvaFetch);
        assert_eq!(config.rewrite.eligibility, RewriteEligibility::ValidImage);
        assert_eq!(config.rewrite.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.source.batch_size, 10);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(config.source.domain.is_none());
        assert_eq!(config.export.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let content = "[images]\npolicy = \"psychic\"\n";
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_load_from_validates_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[source]\nbatch_size = 250\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[source]\ndomain = \"example.com\"\nbatch_size = 50\n\n\
             [export]\ncolumns = [\"Title\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.source.domain.as_deref(), Some("example.com"));
        assert_eq!(config.source.batch_size, 50);
        assert_eq!(config.export.columns, vec!["Title"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
