//! Configuration structures for the synthesis service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{TtsError, TtsResult};
use crate::types::Voice;

/// Top-level service configuration.
///
/// Loaded from an optional TOML file with `TTS_*` environment overrides;
/// every section falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Inference engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Default audio output format.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Request validation bounds.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Admission queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Chunking and backpressure settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Registered voices.
    #[serde(default = "default_voices")]
    pub voices: Vec<Voice>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            audio: AudioConfig::default(),
            limits: LimitsConfig::default(),
            queue: QueueConfig::default(),
            stream: StreamConfig::default(),
            voices: default_voices(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// Environment variables use the `TTS_` prefix with `__` as the section
    /// separator (e.g. `TTS_SERVER__PORT=9000`).
    pub fn load(path: Option<&Path>) -> TtsResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("TTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| TtsError::config(e.to_string()))?;

        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| TtsError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> TtsResult<()> {
        if self.limits.max_text_len == 0 {
            return Err(TtsError::config("limits.max_text_len must be positive"));
        }
        if self.limits.min_speed <= 0.0 || self.limits.min_speed > self.limits.max_speed {
            return Err(TtsError::config(format!(
                "invalid speed range [{}, {}]",
                self.limits.min_speed, self.limits.max_speed
            )));
        }
        if self.queue.max_depth == 0 {
            return Err(TtsError::config("queue.max_depth must be positive"));
        }
        if self.stream.chunk_samples == 0 {
            return Err(TtsError::config("stream.chunk_samples must be positive"));
        }
        if self.stream.max_buffered_chunks == 0 {
            return Err(TtsError::config(
                "stream.max_buffered_chunks must be positive",
            ));
        }
        if self.audio.sample_rate == 0 {
            return Err(TtsError::config("audio.sample_rate must be positive"));
        }
        for voice in &self.voices {
            if voice.sample_rate == 0 || !(1..=2).contains(&voice.channels) {
                return Err(TtsError::config(format!(
                    "voice '{}' has invalid audio parameters",
                    voice.id
                )));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address.
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Request body size limit in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_max_body_size() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Selectable inference backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    /// Deterministic signal generator; no model artifacts required.
    #[default]
    Mock,
    /// ONNX-backed engine (requires the `onnx` feature and a model file).
    Onnx,
}

/// Inference engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: EngineBackend,
    /// Path to the model file (required for the onnx backend).
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

/// Default audio output format, used where a voice does not override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Channel count.
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_channels() -> u16 {
    1
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

/// Request validation bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum input text length in characters.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
    /// Minimum accepted speaking rate.
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    /// Maximum accepted speaking rate.
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
}

fn default_max_text_len() -> usize {
    2000
}

fn default_min_speed() -> f32 {
    0.5
}

fn default_max_speed() -> f32 {
    2.0
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_text_len: default_max_text_len(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
        }
    }
}

/// Admission queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of admitted, uncompleted jobs.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum time a job may wait for the execution slot, in milliseconds.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

fn default_max_depth() -> usize {
    32
}

fn default_wait_timeout_ms() -> u64 {
    30000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// Chunking and backpressure configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Target samples per delivered chunk.
    #[serde(default = "default_chunk_samples")]
    pub chunk_samples: usize,
    /// Maximum chunks produced ahead of the consumer (look-ahead bound).
    #[serde(default = "default_max_buffered_chunks")]
    pub max_buffered_chunks: usize,
}

fn default_chunk_samples() -> usize {
    4096
}

fn default_max_buffered_chunks() -> usize {
    4
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_samples: default_chunk_samples(),
            max_buffered_chunks: default_max_buffered_chunks(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json or text).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,
    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// The stock voice set, registered when no voices are configured.
pub fn default_voices() -> Vec<Voice> {
    vec![
        Voice::new("default", "Default", default_sample_rate()),
        Voice::new("male", "Male", default_sample_rate()),
        Voice::new("female", "Female", default_sample_rate()),
    ]
}
