//! Configuration for synthesis runs
//!
//! Read from TOML: an explicit file, else `~/.fnforge/config.toml`, else
//! built-in defaults. `OPENAI_API_KEY` overrides the configured key.

use fnforge_cache::DEFAULT_CACHE_DIR;
use fnforge_interpreter::InterpreterOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::synthesizer::DEFAULT_ITERATIONS;

/// Environment variable holding the oracle API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,

    /// Wall-clock limit per test case
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            namespace: default_namespace(),
            enabled: default_true(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_recursion_depth: default_max_recursion_depth(),
            timeout_ms: None,
        }
    }
}

impl InterpreterConfig {
    pub fn to_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            max_steps: self.max_steps,
            max_recursion_depth: self.max_recursion_depth,
            timeout: self.timeout_ms.map(Duration::from_millis),
            ..InterpreterOptions::default()
        }
    }
}

fn default_model() -> String { "gpt-4".to_string() }
fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_timeout_secs() -> u64 { 120 }
fn default_cache_dir() -> PathBuf { PathBuf::from(DEFAULT_CACHE_DIR) }
fn default_namespace() -> String { "createChatCompletion".to_string() }
fn default_true() -> bool { true }
fn default_iterations() -> u32 { DEFAULT_ITERATIONS }
fn default_max_steps() -> u64 { InterpreterOptions::default().max_steps }
fn default_max_recursion_depth() -> usize { InterpreterOptions::default().max_recursion_depth }

/// Path of the per-user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fnforge").join("config.toml"))
}

/// Load configuration from file or use defaults
pub fn load_config(path: Option<PathBuf>) -> Result<SynthConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(&path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config(&path)?,
            _ => SynthConfig::default(),
        },
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            config.oracle.api_key = Some(key);
        }
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<SynthConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SynthConfig::default();
        assert_eq!(config.oracle.model, "gpt-4");
        assert_eq!(config.cache.dir, PathBuf::from(".cache"));
        assert!(config.cache.enabled);
        assert_eq!(config.synthesis.iterations, 3);
        assert_eq!(config.interpreter.max_steps, 1_000_000);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[oracle]\nmodel = \"gpt-4o\"\n\n[interpreter]\nmax_steps = 500\ntimeout_ms = 250\n",
        )
        .unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(config.oracle.model, "gpt-4o");
        assert_eq!(config.oracle.base_url, "https://api.openai.com/v1");
        assert_eq!(config.cache.namespace, "createChatCompletion");

        let options = config.interpreter.to_options();
        assert_eq!(options.max_steps, 500);
        assert_eq!(options.max_recursion_depth, 512);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(Some(dir.path().join("absent.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[oracle\nmodel =").unwrap();
        assert!(matches!(read_config(&path), Err(ConfigError::Parse(_))));
    }
}
