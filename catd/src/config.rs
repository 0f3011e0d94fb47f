//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::TaskType;
use crate::pool::PoolConfig;

/// Main catalogd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool sizing and timeouts
    pub workers: WorkersConfig,

    /// Model runtime endpoint and generation options
    pub ollama: OllamaConfig,

    /// Model substitution tables
    pub models: ModelsConfig,

    /// Capability declarations and fallback order
    #[serde(rename = "model-capabilities")]
    pub model_capabilities: ModelCapabilitiesConfig,

    /// Template and taxonomy locations
    pub paths: PathsConfig,

    /// Category matching knobs
    pub taxonomy: TaxonomyConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .catalogd.yml
        let local_config = PathBuf::from(".catalogd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/catalogd/catalogd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("catalogd").join("catalogd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Worker pool sizing and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Pool size
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Queue capacity
    #[serde(rename = "queue-size")]
    pub queue_size: usize,

    /// Per-result await timeout used by the coordinator, in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Per-task attempts inside a worker
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Result cache TTL in seconds
    #[serde(rename = "result-ttl-secs")]
    pub result_ttl_secs: u64,

    /// Stuck-worker threshold in seconds
    #[serde(rename = "stuck-threshold-secs")]
    pub stuck_threshold_secs: u64,

    /// Health monitor interval in seconds
    #[serde(rename = "health-interval-secs")]
    pub health_interval_secs: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_size: 100,
            timeout_secs: 120,
            retry_attempts: 3,
            result_ttl_secs: 3600,
            stuck_threshold_secs: 300,
            health_interval_secs: 10,
        }
    }
}

impl WorkersConfig {
    /// Coordinator-side await deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl From<&WorkersConfig> for PoolConfig {
    fn from(workers: &WorkersConfig) -> Self {
        Self {
            max_workers: workers.max_workers,
            queue_size: workers.queue_size,
            retry_attempts: workers.retry_attempts,
            result_ttl_secs: workers.result_ttl_secs,
            stuck_threshold_secs: workers.stuck_threshold_secs,
            health_interval_secs: workers.health_interval_secs,
        }
    }
}

/// Model runtime endpoint and generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Runtime endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Hard per-generation timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Availability probe timeout in seconds
    #[serde(rename = "probe-timeout-secs")]
    pub probe_timeout_secs: u64,

    pub temperature: f64,

    #[serde(rename = "top-p")]
    pub top_p: f64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 500,
            probe_timeout_secs: 5,
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

/// Model substitution tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// model -> quantized variant, applied when a task sets quantize=true
    pub quantized: HashMap<String, String>,
}

/// One model's capability declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapability {
    pub model: String,

    /// Task types the model is declared good at
    pub tasks: Vec<TaskType>,

    /// Token budget forwarded as num_predict
    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    1024
}

/// Capability declarations, tried in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCapabilitiesConfig {
    pub capabilities: Vec<ModelCapability>,

    /// Models tried when no declared-capable model is available
    #[serde(rename = "fallback-order")]
    pub fallback_order: Vec<String>,
}

/// Template and taxonomy locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Prompt template override directory
    #[serde(rename = "prompt-dir")]
    pub prompt_dir: Option<PathBuf>,

    /// Directory of newline-delimited taxonomy path files
    #[serde(rename = "taxonomy-dir")]
    pub taxonomy_dir: PathBuf,

    /// Serialized taxonomy cache written alongside for fast restart
    #[serde(rename = "taxonomy-cache")]
    pub taxonomy_cache: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompt_dir: None,
            taxonomy_dir: PathBuf::from("data/taxonomy"),
            taxonomy_cache: None,
        }
    }
}

/// Category matching knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Scores below this cutoff yield Uncategorized
    pub cutoff: f64,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self { cutoff: 0.3 }
    }
}
