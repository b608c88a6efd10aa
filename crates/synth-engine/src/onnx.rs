//! ONNX-backed engine (VITS-style single-pass models).
//!
//! The model is a black box: character ids, lengths, and a scales vector in,
//! one f32 waveform out. The waveform is sliced into frames lazily so the
//! streaming pipeline downstream behaves identically to a truly incremental
//! backend.

use std::path::Path;

use ndarray::Array2;
use ort::{GraphOptimizationLevel, Session};
use tracing::info;

use tts_core::{FrameIter, SpeechEngine, TtsError, TtsResult, Voice};

/// ONNX inference engine.
pub struct OnnxEngine {
    session: Session,
    sample_rate: u32,
    frame_samples: usize,
}

impl OnnxEngine {
    /// Load a model from disk.
    pub fn load(path: &Path, sample_rate: u32, frame_samples: usize) -> TtsResult<Self> {
        let session = Session::builder()
            .map_err(|e| TtsError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| TtsError::model_load(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| TtsError::model_load(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| TtsError::model_load(e.to_string()))?;

        info!(path = %path.display(), sample_rate, "ONNX model loaded");

        Ok(Self {
            session,
            sample_rate,
            frame_samples: frame_samples.max(1),
        })
    }
}

impl SpeechEngine for OnnxEngine {
    fn synthesize(&self, text: &str, _voice: &Voice, speed: f32) -> TtsResult<FrameIter> {
        let text_ids: Vec<i64> = text.chars().map(|c| c as i64).collect();
        let num_ids = text_ids.len();

        let input = Array2::from_shape_vec((1, num_ids), text_ids)
            .map_err(|e| TtsError::inference(e.to_string()))?;

        let input_lengths = Array2::from_shape_vec((1, 1), vec![num_ids as i64])
            .map_err(|e| TtsError::inference(e.to_string()))?;

        // VITS scale triple: noise scale, length scale, noise-w. The length
        // scale is inverse to the requested speaking rate.
        let scales = Array2::from_shape_vec((1, 3), vec![0.667, 1.0 / speed.max(0.01), 0.8])
            .map_err(|e| TtsError::inference(e.to_string()))?;

        let outputs = self
            .session
            .run(
                ort::inputs![
                    "input" => input.view(),
                    "input_lengths" => input_lengths.view(),
                    "scales" => scales.view(),
                ]
                .map_err(|e| TtsError::inference(e.to_string()))?,
            )
            .map_err(|e| TtsError::inference(e.to_string()))?;

        let audio = outputs
            .get("output")
            .ok_or_else(|| TtsError::inference("model output tensor missing"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| TtsError::inference(e.to_string()))?;

        let samples: Vec<f32> = audio.view().iter().copied().collect();

        Ok(Box::new(FrameSlices {
            samples,
            pos: 0,
            frame_samples: self.frame_samples,
        }))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Lazy frame view over a fully materialized waveform.
struct FrameSlices {
    samples: Vec<f32>,
    pos: usize,
    frame_samples: usize,
}

impl Iterator for FrameSlices {
    type Item = TtsResult<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.samples.len() {
            return None;
        }
        let end = (self.pos + self.frame_samples).min(self.samples.len());
        let frame = self.samples[self.pos..end].to_vec();
        self.pos = end;
        Some(Ok(frame))
    }
}
