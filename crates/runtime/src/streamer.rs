//! Audio streamer: engine frames → ordered chunks under bounded look-ahead.
//!
//! The producer half ([`pump`]) runs on the blocking pool while the
//! execution slot is held; the consumer half ([`AudioStream`]) is the lazy,
//! finite, non-restartable pull sequence handed to the transport. The
//! channel between them is bounded by `stream.max_buffered_chunks`, so a
//! slow consumer stalls production after at most that many chunks — the
//! backpressure knob.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use tts_core::{AudioChunk, JobState, TtsResult, Voice};

use crate::metrics::TtsMetrics;
use crate::model::SynthesisRun;
use crate::scheduler::{JobHandle, JobStatus};

/// Drive one synthesis run to completion, delivering chunks through `tx`.
///
/// Frames are quantized to 16-bit PCM and grouped into chunks of
/// `chunk_samples`; the trailing partial group is emitted with
/// `is_final = true` (even when empty). An engine error mid-stream is sent
/// in-band and ends the stream with no final chunk. A closed receiver means
/// the consumer disconnected: the run is abandoned at the next chunk
/// boundary and the remaining output discarded.
///
/// Blocking; call from `spawn_blocking`. The slot guard inside `run` is
/// released when this returns.
pub(crate) fn pump(
    run: SynthesisRun,
    tx: &mpsc::Sender<TtsResult<AudioChunk>>,
    chunk_samples: usize,
    status: &JobStatus,
    metrics: TtsMetrics,
) {
    let frames = match run.start() {
        Ok(frames) => frames,
        Err(e) => {
            debug!(error = %e, "synthesis failed to start");
            let _ = tx.blocking_send(Err(e));
            status.advance(JobState::Failed);
            return;
        }
    };

    let mut buf: Vec<i16> = Vec::with_capacity(chunk_samples);
    let mut sequence = 0u64;
    let mut first_chunk_sent = false;

    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(sequence, error = %e, "synthesis failed mid-stream");
                let _ = tx.blocking_send(Err(e));
                status.advance(JobState::Failed);
                return;
            }
        };

        buf.extend(audio_wav::pcm16_from_f32(&frame));

        while buf.len() >= chunk_samples {
            let rest = buf.split_off(chunk_samples);
            let chunk = AudioChunk::new(sequence, std::mem::replace(&mut buf, rest), false);

            if tx.blocking_send(Ok(chunk)).is_err() {
                debug!(sequence, "consumer disconnected, discarding remaining output");
                status.advance(JobState::Cancelled);
                return;
            }

            if !first_chunk_sent {
                first_chunk_sent = true;
                metrics.record_first_chunk_ms(status.wait_time().as_secs_f64() * 1000.0);
                status.advance(JobState::Streaming);
            }
            sequence += 1;
        }
    }

    let last = AudioChunk::new(sequence, std::mem::take(&mut buf), true);
    if tx.blocking_send(Ok(last)).is_ok() {
        debug!(chunks = sequence + 1, "stream completed");
        status.advance(JobState::Completed);
    } else {
        status.advance(JobState::Cancelled);
    }
}

/// The consumer side of one job's chunk stream.
///
/// Obtained with [`AudioStream::open`]; chunks arrive in strictly
/// increasing sequence order and the stream cannot be restarted.
pub struct AudioStream {
    voice: Voice,
    rx: mpsc::Receiver<TtsResult<AudioChunk>>,
}

impl AudioStream {
    /// Take ownership of a job's output.
    pub fn open(handle: JobHandle) -> Self {
        let (voice, rx) = handle.into_parts();
        Self { voice, rx }
    }

    /// Voice the job synthesizes with (carries the output format).
    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// Pull the next chunk, waiting for production if necessary.
    ///
    /// `None` means the stream ended; whether it ended successfully is
    /// determined by the last item seen (`is_final` chunk vs. `Err`).
    pub async fn next_chunk(&mut self) -> Option<TtsResult<AudioChunk>> {
        self.rx.recv().await
    }

    /// Convert the remainder into a `Stream` for transport adapters.
    pub fn into_chunk_stream(self) -> ReceiverStream<TtsResult<AudioChunk>> {
        ReceiverStream::new(self.rx)
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("voice", &self.voice.id)
            .finish()
    }
}
