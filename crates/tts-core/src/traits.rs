//! Trait definitions for the inference seam.

use crate::error::TtsResult;
use crate::types::{Frame, Voice};

/// A lazy, pull-based sequence of raw audio frames.
///
/// Items are `Err` when synthesis fails after production has started; the
/// iterator ends after the first error.
pub type FrameIter = Box<dyn Iterator<Item = TtsResult<Frame>> + Send>;

/// The opaque inference capability: text plus a voice in, audio frames out.
///
/// Implementations own whatever model state they need and must be safe to
/// share behind an `Arc`; exclusive use of the accelerator is enforced by
/// the caller (`ModelResource`), not here. Frame production must be lazy so
/// that delivery can begin before synthesis completes.
pub trait SpeechEngine: Send + Sync {
    /// Synthesize speech for `text` with the given voice and speaking rate.
    ///
    /// Returns an error immediately for inputs the engine cannot accept;
    /// failures during generation surface as `Err` items of the iterator.
    fn synthesize(&self, text: &str, voice: &Voice, speed: f32) -> TtsResult<FrameIter>;

    /// Native output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
