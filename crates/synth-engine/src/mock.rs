//! Deterministic mock engine (no model artifacts needed).
//!
//! Produces a sine tone whose pitch is derived from the voice id and whose
//! duration scales with text length and speaking rate, roughly 50 ms of
//! audio per character. Used by tests, benchmarks, and model-less
//! deployments; also carries the instrumentation hooks the runtime tests
//! rely on (invocation counting, concurrency high-water mark, a start gate,
//! injectable failures).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tts_core::{FrameIter, SpeechEngine, TtsError, TtsResult, Voice};

/// Milliseconds of synthesized audio per input character at speed 1.0.
const MS_PER_CHAR: f32 = 50.0;

/// Counters exposed by [`MockEngine`] for assertions.
#[derive(Debug, Default)]
pub struct EngineStats {
    invocations: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl EngineStats {
    /// Total number of `synthesize` calls.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Highest number of frame iterators alive at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A reusable open/closed latch for holding synthesis at its start.
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    /// Create a closed gate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open the gate, releasing every waiter.
    pub fn open(&self) {
        *self.open.lock().expect("gate lock poisoned") = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().expect("gate lock poisoned");
        while !*open {
            open = self.cond.wait(open).expect("gate lock poisoned");
        }
    }
}

/// Deterministic signal-generator engine.
pub struct MockEngine {
    sample_rate: u32,
    frame_samples: usize,
    stats: Arc<EngineStats>,
    start_gate: Option<Arc<Gate>>,
    fail_at_start: bool,
    fail_after_frames: Option<usize>,
}

impl MockEngine {
    /// Create a mock engine emitting frames of `frame_samples` samples.
    pub fn new(sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            sample_rate,
            frame_samples: frame_samples.max(1),
            stats: Arc::new(EngineStats::default()),
            start_gate: None,
            fail_at_start: false,
            fail_after_frames: None,
        }
    }

    /// Block every `synthesize` call until the gate is opened.
    pub fn with_start_gate(mut self, gate: Arc<Gate>) -> Self {
        self.start_gate = Some(gate);
        self
    }

    /// Make `synthesize` fail before producing any frames.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_at_start = true;
        self
    }

    /// Make frame production fail after `frames` successful frames.
    pub fn with_failure_after(mut self, frames: usize) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }

    /// Shared counters for assertions.
    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Tone frequency for a voice, derived from its id.
    fn voice_frequency(voice: &Voice) -> f32 {
        let hash: u32 = voice
            .id
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        110.0 + (hash % 660) as f32
    }
}

impl SpeechEngine for MockEngine {
    fn synthesize(&self, text: &str, voice: &Voice, speed: f32) -> TtsResult<FrameIter> {
        self.stats.invocations.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.start_gate {
            gate.wait();
        }

        if self.fail_at_start {
            return Err(TtsError::inference("mock engine start failure"));
        }

        let chars = text.chars().count().max(1);
        let duration_ms = chars as f32 * MS_PER_CHAR / speed.max(0.01);
        let total_samples =
            ((duration_ms / 1000.0) * self.sample_rate as f32) as usize * voice.channels as usize;
        let total_samples = total_samples.max(1);

        let step = 2.0 * std::f32::consts::PI * Self::voice_frequency(voice)
            / self.sample_rate as f32;

        self.stats.enter();

        Ok(Box::new(MockFrames {
            remaining: total_samples,
            phase: 0.0,
            step,
            frame_samples: self.frame_samples,
            frames_emitted: 0,
            fail_after_frames: self.fail_after_frames,
            failed: false,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Lazy frame producer for [`MockEngine`].
struct MockFrames {
    remaining: usize,
    phase: f32,
    step: f32,
    frame_samples: usize,
    frames_emitted: usize,
    fail_after_frames: Option<usize>,
    failed: bool,
    stats: Arc<EngineStats>,
}

impl Iterator for MockFrames {
    type Item = TtsResult<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }

        if let Some(limit) = self.fail_after_frames {
            if self.frames_emitted >= limit {
                self.failed = true;
                return Some(Err(TtsError::inference("mock engine mid-stream failure")));
            }
        }

        let len = self.frame_samples.min(self.remaining);
        self.remaining -= len;
        self.frames_emitted += 1;

        let mut frame = Vec::with_capacity(len);
        for _ in 0..len {
            frame.push(0.3 * self.phase.sin());
            self.phase += self.step;
        }

        Some(Ok(frame))
    }
}

impl Drop for MockFrames {
    fn drop(&mut self) {
        self.stats.exit();
    }
}
