//! Synthesis scheduler: admission control and FIFO fairness around the
//! single execution slot.
//!
//! Admission rejects bad requests before they can touch the model: failed
//! validation, unknown voice, model not Ready, or a full queue. Admitted
//! jobs wait for the execution slot strictly in submission order; a job
//! that waits longer than the configured bound is cancelled as a timeout,
//! and a consumer that disconnects while its job is queued frees the queue
//! slot without the engine ever being invoked.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tts_core::{
    AudioChunk, JobState, LimitsConfig, QueueConfig, ServiceConfig, StreamConfig,
    SynthesisRequest, TtsError, TtsResult, Voice,
};

use crate::metrics::TtsMetrics;
use crate::model::ModelResource;
use crate::streamer;
use crate::voices::VoiceRegistry;

/// Shared, observable state of one synthesis job.
#[derive(Debug)]
pub struct JobStatus {
    state: Mutex<JobState>,
    enqueued_at: Instant,
}

impl JobStatus {
    fn new() -> Self {
        Self {
            state: Mutex::new(JobState::Queued),
            enqueued_at: Instant::now(),
        }
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    /// Time since the job was admitted.
    pub fn wait_time(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Move to `next` unless the job already reached a terminal state.
    pub(crate) fn advance(&self, next: JobState) {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = next;
        }
    }
}

/// Handle to an admitted job, used to pull its output.
///
/// Dropping the handle (and any stream opened from it) is the cancellation
/// signal: while queued the job is removed without running; while running
/// the output is discarded at the next chunk boundary.
pub struct JobHandle {
    request_id: Uuid,
    voice: Voice,
    status: Arc<JobStatus>,
    rx: mpsc::Receiver<TtsResult<AudioChunk>>,
}

impl JobHandle {
    /// Request this job was created for.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Resolved voice (carries the output format).
    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        self.status.state()
    }

    /// Shared status cell, observable after the handle is consumed.
    pub fn status(&self) -> Arc<JobStatus> {
        Arc::clone(&self.status)
    }

    pub(crate) fn into_parts(self) -> (Voice, mpsc::Receiver<TtsResult<AudioChunk>>) {
        (self.voice, self.rx)
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("request_id", &self.request_id)
            .field("state", &self.state())
            .finish()
    }
}

/// Serializes synthesis jobs against the single execution slot.
pub struct SynthesisScheduler {
    model: Arc<ModelResource>,
    registry: Arc<VoiceRegistry>,
    limits: LimitsConfig,
    queue: QueueConfig,
    stream: StreamConfig,
    depth: Arc<Semaphore>,
    jobs: Arc<DashMap<Uuid, Arc<JobStatus>>>,
    metrics: TtsMetrics,
}

impl SynthesisScheduler {
    /// Create a scheduler over the given model and registry.
    pub fn new(
        model: Arc<ModelResource>,
        registry: Arc<VoiceRegistry>,
        config: &ServiceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            model,
            registry,
            limits: config.limits.clone(),
            queue: config.queue.clone(),
            stream: config.stream.clone(),
            depth: Arc::new(Semaphore::new(config.queue.max_depth)),
            jobs: Arc::new(DashMap::new()),
            metrics: TtsMetrics,
        })
    }

    /// Validate a request and resolve its voice without touching the model.
    pub fn validate(&self, request: &SynthesisRequest) -> TtsResult<Voice> {
        if request.text.is_empty() {
            return Err(TtsError::invalid_input("text must not be empty"));
        }
        let chars = request.text.chars().count();
        if chars > self.limits.max_text_len {
            return Err(TtsError::invalid_input(format!(
                "text too long: {chars} chars (max {})",
                self.limits.max_text_len
            )));
        }
        if !request.speed.is_finite()
            || request.speed < self.limits.min_speed
            || request.speed > self.limits.max_speed
        {
            return Err(TtsError::invalid_input(format!(
                "speed {} outside [{}, {}]",
                request.speed, self.limits.min_speed, self.limits.max_speed
            )));
        }
        self.registry
            .resolve(&request.voice_id)
            .cloned()
            .ok_or_else(|| TtsError::voice_not_found(request.voice_id.clone()))
    }

    /// Number of admitted jobs that have not reached a terminal state.
    pub fn active_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Observable state of an in-flight job.
    pub fn job_state(&self, request_id: Uuid) -> Option<JobState> {
        self.jobs.get(&request_id).map(|s| s.state())
    }

    /// Admit a request, returning the handle its output is pulled through.
    ///
    /// Rejections (validation, unknown voice, model not Ready, queue full)
    /// are immediate and never reach the model. The queue-depth permit is
    /// held from admission until the job reaches a terminal state.
    pub async fn submit(&self, request: SynthesisRequest) -> TtsResult<JobHandle> {
        self.metrics.request_received();

        let voice = match self.validate(&request) {
            Ok(voice) => voice,
            Err(e) => {
                self.metrics.request_rejected();
                return Err(e);
            }
        };

        if !self.model.is_ready() {
            self.metrics.request_rejected();
            return Err(TtsError::model_unavailable(self.model.state().to_string()));
        }

        let permit = match Arc::clone(&self.depth).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.request_rejected();
                return Err(TtsError::resource_exhausted(format!(
                    "queue full ({} jobs)",
                    self.queue.max_depth
                )));
            }
        };

        let request_id = request.request_id;
        let status = Arc::new(JobStatus::new());
        let (tx, rx) = mpsc::channel(self.stream.max_buffered_chunks);

        self.jobs.insert(request_id, Arc::clone(&status));
        self.metrics.set_active_jobs(self.jobs.len() as f64);

        debug!(
            request_id = %request_id,
            voice = %voice.id,
            text_len = request.text.len(),
            queued = self.jobs.len(),
            "job admitted"
        );

        let driver = JobDriver {
            model: Arc::clone(&self.model),
            jobs: Arc::clone(&self.jobs),
            metrics: self.metrics,
            wait_timeout: Duration::from_millis(self.queue.wait_timeout_ms),
            chunk_samples: self.stream.chunk_samples,
        };
        tokio::spawn(driver.drive(request, voice.clone(), Arc::clone(&status), tx, permit));

        Ok(JobHandle {
            request_id,
            voice,
            status,
            rx,
        })
    }
}

impl std::fmt::Debug for SynthesisScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisScheduler")
            .field("active_jobs", &self.jobs.len())
            .field("max_depth", &self.queue.max_depth)
            .finish()
    }
}

/// Everything one admitted job needs to run to a terminal state.
struct JobDriver {
    model: Arc<ModelResource>,
    jobs: Arc<DashMap<Uuid, Arc<JobStatus>>>,
    metrics: TtsMetrics,
    wait_timeout: Duration,
    chunk_samples: usize,
}

impl JobDriver {
    /// Wait for the execution slot, stream the output, then unregister.
    ///
    /// The queue-depth permit travels with the driver and is released only
    /// when this returns.
    async fn drive(
        self,
        request: SynthesisRequest,
        voice: Voice,
        status: Arc<JobStatus>,
        tx: mpsc::Sender<TtsResult<AudioChunk>>,
        _permit: OwnedSemaphorePermit,
    ) {
        let request_id = request.request_id;

        let timed_out = self.run_job(&request, &voice, &status, &tx).await;

        self.jobs.remove(&request_id);
        self.metrics.set_active_jobs(self.jobs.len() as f64);

        match status.state() {
            JobState::Completed => {
                self.metrics.request_completed();
                info!(
                    request_id = %request_id,
                    total_ms = status.wait_time().as_millis() as u64,
                    "job completed"
                );
            }
            JobState::Failed => self.metrics.request_failed(),
            JobState::Cancelled if timed_out => self.metrics.request_timeout(),
            JobState::Cancelled => self.metrics.request_cancelled(),
            other => {
                warn!(request_id = %request_id, state = %other, "job ended in non-terminal state");
            }
        }
    }

    /// Returns whether the job was cancelled by the queue-wait timeout.
    async fn run_job(
        &self,
        request: &SynthesisRequest,
        voice: &Voice,
        status: &Arc<JobStatus>,
        tx: &mpsc::Sender<TtsResult<AudioChunk>>,
    ) -> bool {
        let request_id = request.request_id;

        let run = tokio::select! {
            biased;
            // Consumer disconnected while the job was still queued: dequeue
            // without consuming the execution slot.
            _ = tx.closed() => {
                debug!(request_id = %request_id, "cancelled while queued");
                status.advance(JobState::Cancelled);
                return false;
            }
            acquired = tokio::time::timeout(self.wait_timeout, self.model.run(request, voice)) => {
                match acquired {
                    Err(_) => {
                        warn!(
                            request_id = %request_id,
                            waited_ms = self.wait_timeout.as_millis() as u64,
                            "queue wait timeout"
                        );
                        status.advance(JobState::Cancelled);
                        let _ = tx
                            .send(Err(TtsError::Timeout {
                                ms: self.wait_timeout.as_millis() as u64,
                            }))
                            .await;
                        return true;
                    }
                    Ok(Err(e)) => {
                        warn!(request_id = %request_id, error = %e, "run rejected");
                        status.advance(JobState::Failed);
                        let _ = tx.send(Err(e)).await;
                        return false;
                    }
                    Ok(Ok(run)) => run,
                }
            }
        };

        status.advance(JobState::Running);
        debug!(request_id = %request_id, "job running");

        let chunk_samples = self.chunk_samples;
        let metrics = self.metrics;
        let pump_status = Arc::clone(status);
        let pump_tx = tx.clone();
        let joined = tokio::task::spawn_blocking(move || {
            streamer::pump(run, &pump_tx, chunk_samples, &pump_status, metrics);
        })
        .await;

        if joined.is_err() {
            warn!(request_id = %request_id, "streaming task panicked");
            status.advance(JobState::Failed);
            let _ = tx
                .send(Err(TtsError::internal("streaming task failed")))
                .await;
        }

        false
    }
}
