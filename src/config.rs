use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use crate::record::TraceOptions;

/// Top-level configuration loaded from simtrace.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct SimtraceConfig {
    pub trace: TraceConfig,
    pub output: OutputConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub marker: String,
    pub episodes_per_iteration: u32,
}

/// Table output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub normalize_rewards: bool,
    pub dedup: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DiscoveryConfig {
    /// First capture group names the stream. Falls back to the file stem.
    pub stream_regex: Option<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            marker: crate::extract::DEFAULT_MARKER.to_string(),
            episodes_per_iteration: crate::record::DEFAULT_EPISODES_PER_ITERATION.get(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("episodes_per_iteration must be greater than zero")]
    ZeroEpisodesPerIteration,
    #[error("trace marker must not be empty")]
    EmptyMarker,
}

impl SimtraceConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse config from TOML text and validate it.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;
        config.trace_options()?;
        Ok(config)
    }

    /// Resolve the `[trace]` section into explicit extraction options.
    pub fn trace_options(&self) -> Result<TraceOptions, ConfigError> {
        if self.trace.marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        let episodes_per_iteration = NonZeroU32::new(self.trace.episodes_per_iteration)
            .ok_or(ConfigError::ZeroEpisodesPerIteration)?;
        Ok(TraceOptions {
            marker: self.trace.marker.clone(),
            episodes_per_iteration,
        })
    }
}
