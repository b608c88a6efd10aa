//! # runtime
//!
//! Runtime orchestration for the streaming TTS service.
//!
//! This crate provides:
//! - The voice registry
//! - The model resource owning the single execution slot
//! - The synthesis scheduler (admission, FIFO queue, timeouts, cancellation)
//! - The audio streamer (chunking under bounded look-ahead)
//! - Health aggregation
//! - Structured logging and metrics

pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod streamer;
pub mod voices;

pub use health::{HealthTracker, ServiceStatus};
pub use model::{EngineFactory, ModelResource, SynthesisRun};
pub use scheduler::{JobHandle, JobStatus, SynthesisScheduler};
pub use streamer::AudioStream;
pub use voices::VoiceRegistry;
