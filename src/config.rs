use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory holding the source PDF documents.
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,
    /// Directory rendered page images are written into (created on demand).
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            image_dir: default_image_dir(),
        }
    }
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("study_notes")
}
fn default_image_dir() -> PathBuf {
    PathBuf::from("mcp_images")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8050".to_string()
}

/// Completion API settings.
///
/// The backend is selected by a static model → base-URL mapping so that an
/// unknown model fails at startup, not on the first request deep inside the
/// orchestration loop.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Model identifier; must be a key of `endpoints`.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable the API key is read from (once, at startup).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout for completion calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Model identifier → OpenAI-compatible base URL.
    #[serde(default = "default_endpoints")]
    pub endpoints: BTreeMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            endpoints: default_endpoints(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_endpoints() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "gpt-4o".to_string(),
            "https://api.openai.com/v1".to_string(),
        ),
        (
            "gemini-2.5-flash".to_string(),
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
        ),
    ])
}

impl LlmConfig {
    /// Resolve the base URL for the configured model.
    pub fn endpoint(&self) -> Result<&str> {
        self.endpoints
            .get(&self.model)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No endpoint configured for model '{}'. Add it under [llm.endpoints].",
                    self.model
                )
            })
    }
}

/// Load and validate a configuration file.
///
/// A missing file is not an error: all settings have defaults mirroring the
/// conventional layout (`study_notes/`, `mcp_images/`, port 8050).
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    // Fail fast on an unknown model rather than deferring to first use.
    config.llm.endpoint()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        validate(&config).unwrap();
        assert_eq!(config.corpus.dir, PathBuf::from("study_notes"));
        assert_eq!(config.corpus.image_dir, PathBuf::from("mcp_images"));
        assert_eq!(config.server.bind, "127.0.0.1:8050");
    }

    #[test]
    fn test_unknown_model_rejected() {
        let mut config = Config::default();
        config.llm.model = "mystery-model".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_endpoint_lookup() {
        let config = Config::default();
        assert_eq!(config.llm.endpoint().unwrap(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [corpus]
            dir = "notes"

            [llm]
            model = "gemini-2.5-flash"
            "#,
        )
        .unwrap();
        assert_eq!(config.corpus.dir, PathBuf::from("notes"));
        assert_eq!(config.corpus.image_dir, PathBuf::from("mcp_images"));
        assert!(config.llm.endpoint().unwrap().contains("googleapis"));
    }
}
