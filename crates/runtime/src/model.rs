//! Model resource: engine ownership and the single execution slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

use tts_core::{
    FrameIter, ModelState, SpeechEngine, SynthesisRequest, TtsError, TtsResult, Voice,
};

/// Constructor for the configured engine; performs the actual artifact
/// loading, so its errors are load errors.
pub type EngineFactory = Box<dyn Fn() -> TtsResult<Box<dyn SpeechEngine>> + Send + Sync>;

/// Owner of the loaded inference engine and the exclusive right to use the
/// accelerator.
///
/// There is exactly one execution slot: [`ModelResource::run`] waits for it
/// in FIFO order and the returned [`SynthesisRun`] holds it until dropped.
/// All access is mediated by the scheduler; this type never queues.
pub struct ModelResource {
    factory: Arc<EngineFactory>,
    state: RwLock<ModelState>,
    engine: RwLock<Option<Arc<dyn SpeechEngine>>>,
    slot: Arc<Mutex<()>>,
    load_lock: Mutex<()>,
    runs: AtomicU64,
}

impl ModelResource {
    /// Create an unloaded resource around an engine factory.
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            factory: Arc::new(factory),
            state: RwLock::new(ModelState::Uninitialized),
            engine: RwLock::new(None),
            slot: Arc::new(Mutex::new(())),
            load_lock: Mutex::new(()),
            runs: AtomicU64::new(0),
        }
    }

    /// Load the engine.
    ///
    /// Idempotent: Ready is a no-op, and a caller arriving during an
    /// in-flight load blocks until that load finishes and observes its
    /// outcome. Calling on a Failed resource retries — this is the explicit
    /// reload path, an operational action outside steady-state handling.
    pub async fn load(&self) -> TtsResult<()> {
        // A caller arriving during an in-flight load observes that load's
        // outcome instead of starting another attempt.
        let joined_inflight = matches!(*self.state.read(), ModelState::Loading);
        let _guard = self.load_lock.lock().await;

        match &*self.state.read() {
            ModelState::Ready => return Ok(()),
            ModelState::Failed(reason) if joined_inflight => {
                return Err(TtsError::model_load(reason.clone()));
            }
            _ => {}
        }

        *self.state.write() = ModelState::Loading;
        info!("loading speech engine");

        let factory = Arc::clone(&self.factory);
        let loaded = tokio::task::spawn_blocking(move || (factory.as_ref())())
            .await
            .map_err(|e| TtsError::internal(format!("engine load task failed: {e}")))?;

        match loaded {
            Ok(engine) => {
                let engine: Arc<dyn SpeechEngine> = Arc::from(engine);
                info!(
                    engine = engine.name(),
                    sample_rate = engine.sample_rate(),
                    "speech engine ready"
                );
                *self.engine.write() = Some(engine);
                *self.state.write() = ModelState::Ready;
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                error!(reason = %reason, "speech engine load failed");
                *self.state.write() = ModelState::Failed(reason.clone());
                *self.engine.write() = None;
                Err(TtsError::model_load(reason))
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModelState {
        self.state.read().clone()
    }

    /// Whether synthesis may run.
    pub fn is_ready(&self) -> bool {
        self.state.read().is_ready()
    }

    /// Number of runs that acquired the execution slot.
    pub fn runs_started(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Acquire the execution slot and prepare a synthesis run.
    ///
    /// Valid only while Ready; in any other state this fails immediately
    /// with `ModelUnavailable` rather than queueing (queueing is the
    /// scheduler's job). Concurrent callers wait for the slot in FIFO
    /// order. The slot is released when the returned run is dropped.
    pub async fn run(&self, request: &SynthesisRequest, voice: &Voice) -> TtsResult<SynthesisRun> {
        if !self.is_ready() {
            return Err(TtsError::model_unavailable(self.state().to_string()));
        }

        let slot = Arc::clone(&self.slot).lock_owned().await;

        // The state may have degraded while we waited.
        let engine = self
            .engine
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| TtsError::model_unavailable(self.state().to_string()))?;

        self.runs.fetch_add(1, Ordering::SeqCst);

        Ok(SynthesisRun {
            engine,
            text: request.text.clone(),
            voice: voice.clone(),
            speed: request.speed,
            _slot: slot,
        })
    }
}

impl std::fmt::Debug for ModelResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelResource")
            .field("state", &*self.state.read())
            .field("runs", &self.runs_started())
            .finish()
    }
}

/// An in-progress synthesis holding the execution slot.
///
/// A per-run engine failure (at start or mid-stream) fails only this run;
/// it never changes the model state.
pub struct SynthesisRun {
    engine: Arc<dyn SpeechEngine>,
    text: String,
    voice: Voice,
    speed: f32,
    _slot: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for SynthesisRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisRun")
            .field("text", &self.text)
            .field("voice", &self.voice)
            .field("speed", &self.speed)
            .finish_non_exhaustive()
    }
}

impl SynthesisRun {
    /// Start inference, producing the lazy frame sequence.
    ///
    /// Blocking backends do their work while frames are pulled; call this
    /// from a blocking context.
    pub fn start(&self) -> TtsResult<FrameIter> {
        self.engine.synthesize(&self.text, &self.voice, self.speed)
    }

    /// Voice this run synthesizes with.
    pub fn voice(&self) -> &Voice {
        &self.voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use synth_engine::MockEngine;

    fn mock_factory() -> EngineFactory {
        Box::new(|| Ok(Box::new(MockEngine::new(24000, 2048))))
    }

    fn failing_factory() -> EngineFactory {
        Box::new(|| Err(TtsError::model_load("weights missing")))
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest::new("hello", "default")
    }

    fn voice() -> Voice {
        Voice::new("default", "Default", 24000)
    }

    #[tokio::test]
    async fn test_load_transitions_to_ready() {
        let model = Arc::new(ModelResource::new(mock_factory()));
        assert_eq!(model.state(), ModelState::Uninitialized);

        model.load().await.unwrap();
        assert!(model.is_ready());

        // Idempotent.
        model.load().await.unwrap();
        assert!(model.is_ready());
    }

    #[tokio::test]
    async fn test_load_failure_is_sticky() {
        let model = Arc::new(ModelResource::new(failing_factory()));
        let err = model.load().await.unwrap_err();
        assert!(matches!(err, TtsError::ModelLoad(_)));
        assert!(matches!(model.state(), ModelState::Failed(_)));

        let err = model.run(&request(), &voice()).await.unwrap_err();
        assert!(matches!(err, TtsError::ModelUnavailable(_)));
        assert_eq!(model.runs_started(), 0);
    }

    #[tokio::test]
    async fn test_run_before_load_fails() {
        let model = Arc::new(ModelResource::new(mock_factory()));
        let err = model.run(&request(), &voice()).await.unwrap_err();
        assert!(matches!(err, TtsError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_run_counts_slot_acquisitions() {
        let model = Arc::new(ModelResource::new(mock_factory()));
        model.load().await.unwrap();

        let run = model.run(&request(), &voice()).await.unwrap();
        drop(run);
        let run = model.run(&request(), &voice()).await.unwrap();
        drop(run);

        assert_eq!(model.runs_started(), 2);
    }

    #[tokio::test]
    async fn test_slot_is_exclusive() {
        let model = Arc::new(ModelResource::new(mock_factory()));
        model.load().await.unwrap();

        let held = model.run(&request(), &voice()).await.unwrap();

        // A second run cannot acquire the slot while the first is alive.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), model.run(&request(), &voice())).await;
        assert!(blocked.is_err());

        drop(held);
        let run = tokio::time::timeout(Duration::from_millis(500), model.run(&request(), &voice()))
            .await
            .expect("slot should be free after drop")
            .unwrap();
        assert_eq!(run.voice().id, "default");
    }

    #[tokio::test]
    async fn test_concurrent_load_shares_outcome() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let factory_calls = Arc::clone(&calls);
        let factory: EngineFactory = Box::new(move || {
            factory_calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(Box::new(MockEngine::new(24000, 2048)))
        });

        let model = Arc::new(ModelResource::new(factory));
        let first = {
            let model = Arc::clone(&model);
            tokio::spawn(async move { model.load().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let model = Arc::clone(&model);
            tokio::spawn(async move { model.load().await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "one load, two observers");
    }

    #[tokio::test]
    async fn test_reload_after_failure() {
        // First load fails, second (reload) succeeds.
        let attempts = std::sync::atomic::AtomicUsize::new(0);
        let factory: EngineFactory = Box::new(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TtsError::model_load("transient"))
            } else {
                Ok(Box::new(MockEngine::new(24000, 2048)))
            }
        });

        let model = Arc::new(ModelResource::new(factory));
        assert!(model.load().await.is_err());
        assert!(matches!(model.state(), ModelState::Failed(_)));

        model.load().await.unwrap();
        assert!(model.is_ready());
    }
}
