//! Core data types for the synthesis service.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A selectable voice.
///
/// Voices are registered once at startup and never change afterwards;
/// requests reference them by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Unique voice identifier (registry key).
    pub id: String,
    /// Human-readable name shown in listings.
    pub display_name: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl Voice {
    /// Create a mono voice at the given sample rate.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            sample_rate,
            channels: 1,
        }
    }

    /// Set the channel count.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }
}

/// A synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Text to synthesize.
    pub text: String,
    /// Voice identifier, resolved against the registry at admission.
    pub voice_id: String,
    /// Speaking rate multiplier (1.0 = normal).
    pub speed: f32,
}

impl SynthesisRequest {
    /// Create a new request with a fresh id and normal speed.
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            text: text.into(),
            voice_id: voice_id.into(),
            speed: 1.0,
        }
    }

    /// Set the speaking rate.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set an explicit request id.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Lifecycle state of the loaded model.
///
/// Transitions: `Uninitialized → Loading → {Ready, Failed}`. `Failed` is
/// terminal until an explicit reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// Created, no load attempted yet.
    Uninitialized,
    /// A load is in flight.
    Loading,
    /// Model loaded, synthesis available.
    Ready,
    /// Load or fatal runtime error; the reason is kept for diagnostics.
    Failed(String),
}

impl ModelState {
    /// Whether synthesis may run in this state.
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready)
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Uninitialized => write!(f, "uninitialized"),
            ModelState::Loading => write!(f, "loading"),
            ModelState::Ready => write!(f, "ready"),
            ModelState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// State of a single synthesis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Admitted, waiting for the execution slot.
    Queued,
    /// Holding the execution slot, inference started.
    Running,
    /// At least one chunk delivered to the consumer.
    Streaming,
    /// All chunks delivered, final chunk sent.
    Completed,
    /// Inference failed; the stream ended without a final chunk.
    Failed,
    /// Removed before running, or abandoned by the consumer.
    Cancelled,
}

impl JobState {
    /// Whether the job can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Streaming => "streaming",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One engine-produced batch of samples (f32, interleaved, in [-1, 1]).
pub type Frame = Vec<f32>;

/// A bounded slice of synthesized audio delivered as part of a stream.
///
/// Chunks of a job carry strictly increasing sequence numbers starting at 0;
/// exactly one chunk has `is_final = true` and nothing follows it.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Position of this chunk within the job's stream.
    pub sequence: u64,
    /// 16-bit signed PCM samples.
    pub samples: Arc<[i16]>,
    /// Whether this is the last chunk of the job.
    pub is_final: bool,
}

impl AudioChunk {
    /// Create a new audio chunk.
    pub fn new(sequence: u64, samples: Vec<i16>, is_final: bool) -> Self {
        Self {
            sequence,
            samples: samples.into(),
            is_final,
        }
    }

    /// Number of samples in this chunk.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Duration of this chunk in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 * 1000.0 / sample_rate as f32
    }
}
