//! # synth-engine
//!
//! `SpeechEngine` implementations behind which inference stays opaque:
//!
//! - [`MockEngine`] — deterministic signal generator, always available
//! - `OnnxEngine` — ONNX-backed inference (feature `onnx`)
//!
//! [`create_engine`] is the factory the model resource loads through; its
//! errors are what drive the service into the degraded state.

pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use mock::{EngineStats, Gate, MockEngine};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEngine;

use tts_core::{AudioConfig, EngineBackend, EngineConfig, SpeechEngine, TtsError, TtsResult};

/// Samples per engine-produced frame.
pub const DEFAULT_FRAME_SAMPLES: usize = 2048;

/// Construct the configured engine, loading model artifacts as needed.
pub fn create_engine(
    engine: &EngineConfig,
    audio: &AudioConfig,
) -> TtsResult<Box<dyn SpeechEngine>> {
    match engine.backend {
        EngineBackend::Mock => Ok(Box::new(MockEngine::new(
            audio.sample_rate,
            DEFAULT_FRAME_SAMPLES,
        ))),
        EngineBackend::Onnx => {
            let path = engine
                .model_path
                .as_deref()
                .ok_or_else(|| TtsError::config("engine.model_path required for onnx backend"))?;

            #[cfg(feature = "onnx")]
            {
                Ok(Box::new(onnx::OnnxEngine::load(
                    path,
                    audio.sample_rate,
                    DEFAULT_FRAME_SAMPLES,
                )?))
            }

            #[cfg(not(feature = "onnx"))]
            {
                let _ = path;
                Err(TtsError::config(
                    "onnx backend selected but the binary was built without the `onnx` feature",
                ))
            }
        }
    }
}
