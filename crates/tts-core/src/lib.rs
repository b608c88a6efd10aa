//! # tts-core
//!
//! Core types, traits, and error definitions for the streaming TTS service.
//!
//! This crate provides the foundational abstractions used across all other
//! crates in the workspace, including:
//!
//! - Common data types (`Voice`, `SynthesisRequest`, `AudioChunk`, etc.)
//! - The `SpeechEngine` trait behind which inference stays opaque
//! - Unified error handling via `TtsError`
//! - Configuration structures

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use self::config::{
    AudioConfig, EngineBackend, EngineConfig, LimitsConfig, LoggingConfig, MetricsConfig,
    QueueConfig, ServerConfig, ServiceConfig, StreamConfig,
};
pub use self::error::{TtsError, TtsResult};
pub use self::traits::{FrameIter, SpeechEngine};
pub use self::types::{AudioChunk, Frame, JobState, ModelState, SynthesisRequest, Voice};
