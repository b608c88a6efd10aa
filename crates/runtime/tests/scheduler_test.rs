//! Integration tests for the synthesis scheduler and streaming pipeline.
//!
//! All tests run against the mock engine, which counts invocations, tracks
//! concurrent synthesis, and can be gated or made to fail on demand.

use std::sync::Arc;
use std::time::Duration;

use runtime::{AudioStream, EngineFactory, ModelResource, SynthesisScheduler, VoiceRegistry};
use synth_engine::{EngineStats, Gate, MockEngine};
use tts_core::config::default_voices;
use tts_core::{AudioChunk, JobState, ServiceConfig, SpeechEngine, SynthesisRequest, TtsError};

/// Factory that hands out a pre-built engine exactly once.
fn once_factory(engine: MockEngine) -> EngineFactory {
    let cell = std::sync::Mutex::new(Some(engine));
    Box::new(move || {
        cell.lock()
            .expect("factory lock poisoned")
            .take()
            .map(|e| Box::new(e) as Box<dyn SpeechEngine>)
            .ok_or_else(|| TtsError::internal("engine already taken"))
    })
}

/// Build a loaded scheduler around the given engine and config tweaks.
async fn build(
    engine: MockEngine,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (Arc<SynthesisScheduler>, Arc<ModelResource>, Arc<EngineStats>) {
    let stats = engine.stats();
    let mut config = ServiceConfig::default();
    configure(&mut config);

    let model = Arc::new(ModelResource::new(once_factory(engine)));
    model.load().await.expect("engine load");
    let registry = Arc::new(VoiceRegistry::new(default_voices()).expect("registry"));
    let scheduler = SynthesisScheduler::new(Arc::clone(&model), registry, &config);

    (scheduler, model, stats)
}

/// Drain a stream into (chunks, trailing error).
async fn drain(mut stream: AudioStream) -> (Vec<AudioChunk>, Option<TtsError>) {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next_chunk().await {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => return (chunks, Some(e)),
        }
    }
    (chunks, None)
}

#[tokio::test]
async fn test_valid_request_streams_ordered_chunks() {
    let (scheduler, _model, stats) = build(MockEngine::new(24000, 2048), |_| {}).await;

    let request = SynthesisRequest::new("Hello world", "default");
    let handle = scheduler.submit(request).await.unwrap();
    let status = handle.status();

    let (chunks, err) = drain(AudioStream::open(handle)).await;
    assert!(err.is_none());
    assert!(!chunks.is_empty(), "should deliver at least one chunk");

    // Strictly increasing sequence numbers from 0.
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.sequence, i as u64);
    }

    // Exactly one final chunk, and it is the last one.
    let finals = chunks.iter().filter(|c| c.is_final).count();
    assert_eq!(finals, 1);
    assert!(chunks.last().unwrap().is_final);

    let total_samples: usize = chunks.iter().map(|c| c.num_samples()).sum();
    assert!(total_samples > 0);

    assert_eq!(status.state(), JobState::Completed);
    assert_eq!(stats.invocations(), 1);
}

#[tokio::test]
async fn test_speed_out_of_range_never_runs() {
    let (scheduler, model, stats) = build(MockEngine::new(24000, 2048), |_| {}).await;

    for speed in [0.1, 2.5, f32::NAN] {
        let request = SynthesisRequest::new("Hello", "default").with_speed(speed);
        let err = scheduler.submit(request).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidInput(_)), "speed {speed}");
    }

    assert_eq!(stats.invocations(), 0);
    assert_eq!(model.runs_started(), 0);
}

#[tokio::test]
async fn test_text_bounds_enforced() {
    let (scheduler, _model, stats) = build(MockEngine::new(24000, 2048), |c| {
        c.limits.max_text_len = 10;
    })
    .await;

    let err = scheduler
        .submit(SynthesisRequest::new("", "default"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::InvalidInput(_)));

    let err = scheduler
        .submit(SynthesisRequest::new("far too long for the limit", "default"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::InvalidInput(_)));

    assert_eq!(stats.invocations(), 0);
}

#[tokio::test]
async fn test_unknown_voice_never_runs() {
    let (scheduler, model, stats) = build(MockEngine::new(24000, 2048), |_| {}).await;

    let err = scheduler
        .submit(SynthesisRequest::new("Hello", "does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::VoiceNotFound(_)));
    assert_eq!(stats.invocations(), 0);
    assert_eq!(model.runs_started(), 0);
}

#[tokio::test]
async fn test_single_execution_slot() {
    let (scheduler, _model, stats) = build(MockEngine::new(24000, 1024), |_| {}).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let request = SynthesisRequest::new(format!("Concurrent request number {i}"), "default");
        handles.push(scheduler.submit(request).await.unwrap());
    }

    let drains = handles
        .into_iter()
        .map(|h| drain(AudioStream::open(h)))
        .collect::<Vec<_>>();
    let results = futures::future::join_all(drains).await;

    for (chunks, err) in results {
        assert!(err.is_none());
        assert!(chunks.last().unwrap().is_final);
    }

    assert_eq!(stats.invocations(), 4);
    assert_eq!(stats.max_active(), 1, "only one synthesis at a time");
}

#[tokio::test]
async fn test_queue_full_rejects_overflow() {
    let gate = Gate::new();
    let engine = MockEngine::new(24000, 2048).with_start_gate(Arc::clone(&gate));
    let (scheduler, _model, stats) = build(engine, |c| {
        c.queue.max_depth = 3;
    })
    .await;

    let mut handles = Vec::new();
    for i in 0..3 {
        let request = SynthesisRequest::new(format!("queued {i}"), "default");
        handles.push(scheduler.submit(request).await.unwrap());
    }

    // Exactly one job holds the slot; the rest wait in the queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let states: Vec<_> = handles.iter().map(|h| h.state()).collect();
    assert_eq!(states.iter().filter(|s| **s == JobState::Running).count(), 1);
    assert_eq!(states.iter().filter(|s| **s == JobState::Queued).count(), 2);

    // The queue is at its bound; the next submission is rejected without
    // being enqueued.
    let err = scheduler
        .submit(SynthesisRequest::new("one too many", "default"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::ResourceExhausted(_)));
    assert_eq!(scheduler.active_jobs(), 3);

    gate.open();
    for handle in handles {
        let (chunks, err) = drain(AudioStream::open(handle)).await;
        assert!(err.is_none());
        assert!(chunks.last().unwrap().is_final);
    }
    assert_eq!(stats.invocations(), 3);
}

#[tokio::test]
async fn test_queue_wait_timeout_cancels_before_running() {
    let gate = Gate::new();
    let engine = MockEngine::new(24000, 2048).with_start_gate(Arc::clone(&gate));
    let (scheduler, model, stats) = build(engine, |c| {
        c.queue.wait_timeout_ms = 50;
    })
    .await;

    // First job takes the slot and parks on the gate.
    let first = scheduler
        .submit(SynthesisRequest::new("holding the slot", "default"))
        .await
        .unwrap();

    // Second job can never acquire the slot inside the wait bound.
    let second = scheduler
        .submit(SynthesisRequest::new("doomed to wait", "default"))
        .await
        .unwrap();
    let second_status = second.status();

    let (chunks, err) = drain(AudioStream::open(second)).await;
    assert!(chunks.is_empty());
    assert!(matches!(err, Some(TtsError::Timeout { .. })));
    assert_eq!(second_status.state(), JobState::Cancelled);

    // The timed-out job was never handed to the model.
    assert_eq!(model.runs_started(), 1);
    assert_eq!(stats.invocations(), 1);

    gate.open();
    let (chunks, err) = drain(AudioStream::open(first)).await;
    assert!(err.is_none());
    assert!(chunks.last().unwrap().is_final);
}

#[tokio::test]
async fn test_cancel_while_queued_frees_slot_without_running() {
    let gate = Gate::new();
    let engine = MockEngine::new(24000, 2048).with_start_gate(Arc::clone(&gate));
    let (scheduler, _model, stats) = build(engine, |_| {}).await;

    let first = scheduler
        .submit(SynthesisRequest::new("holding the slot", "default"))
        .await
        .unwrap();

    let second = scheduler
        .submit(SynthesisRequest::new("will disconnect", "default"))
        .await
        .unwrap();
    let second_status = second.status();
    drop(second);

    // The driver notices the dropped consumer and dequeues the job.
    for _ in 0..50 {
        if second_status.state() == JobState::Cancelled {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(second_status.state(), JobState::Cancelled);
    assert_eq!(stats.invocations(), 1, "cancelled job never ran");

    gate.open();
    let (chunks, err) = drain(AudioStream::open(first)).await;
    assert!(err.is_none());
    assert!(chunks.last().unwrap().is_final);

    // The driver task unregisters the job shortly after the final chunk.
    for _ in 0..50 {
        if scheduler.active_jobs() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(scheduler.active_jobs(), 0);
}

#[tokio::test]
async fn test_mid_stream_failure_ends_without_final_chunk() {
    let engine = MockEngine::new(24000, 512).with_failure_after(2);
    let (scheduler, model, _stats) = build(engine, |c| {
        c.stream.chunk_samples = 256;
    })
    .await;

    let handle = scheduler
        .submit(SynthesisRequest::new(
            "long enough to produce several frames of audio",
            "default",
        ))
        .await
        .unwrap();
    let status = handle.status();

    let (chunks, err) = drain(AudioStream::open(handle)).await;
    assert!(!chunks.is_empty(), "partial output precedes the failure");
    assert!(matches!(err, Some(TtsError::Inference(_))));
    assert!(chunks.iter().all(|c| !c.is_final));
    assert_eq!(status.state(), JobState::Failed);

    // A per-job failure does not degrade the model.
    assert!(model.is_ready());
    let handle = scheduler
        .submit(SynthesisRequest::new("next job still works", "default"))
        .await;
    // (This engine fails every run after two frames, but admission and the
    // model itself remain healthy.)
    assert!(handle.is_ok());
}

#[tokio::test]
async fn test_failed_model_rejects_without_enqueueing() {
    let model = Arc::new(ModelResource::new(Box::new(|| {
        Err(TtsError::model_load("weights missing"))
    })));
    let _ = model.load().await;
    let registry = Arc::new(VoiceRegistry::new(default_voices()).unwrap());
    let scheduler = SynthesisScheduler::new(Arc::clone(&model), registry, &ServiceConfig::default());

    let err = scheduler
        .submit(SynthesisRequest::new("Hello", "default"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::ModelUnavailable(_)));
    assert_eq!(scheduler.active_jobs(), 0);
    assert_eq!(model.runs_started(), 0);
}

#[tokio::test]
async fn test_fifo_first_chunk_order() {
    let gate = Gate::new();
    let engine = MockEngine::new(24000, 1024).with_start_gate(Arc::clone(&gate));
    let (scheduler, _model, _stats) = build(engine, |_| {}).await;

    let mut handles = Vec::new();
    for i in 0..3 {
        let request = SynthesisRequest::new(format!("ordered submission {i}"), "default");
        handles.push(scheduler.submit(request).await.unwrap());
    }
    gate.open();

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let order = Arc::clone(&order);
        tasks.push(tokio::spawn(async move {
            let mut stream = AudioStream::open(handle);
            let mut first = true;
            while let Some(item) = stream.next_chunk().await {
                if first {
                    order.lock().unwrap().push(i);
                    first = false;
                }
                item.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_chunk_sizes_match_configuration() {
    let (scheduler, _model, _stats) = build(MockEngine::new(24000, 600), |c| {
        c.stream.chunk_samples = 1000;
    })
    .await;

    let handle = scheduler
        .submit(SynthesisRequest::new(
            "a piece of text long enough for multiple chunks",
            "default",
        ))
        .await
        .unwrap();

    let (chunks, err) = drain(AudioStream::open(handle)).await;
    assert!(err.is_none());
    for chunk in &chunks[..chunks.len() - 1] {
        assert_eq!(chunk.num_samples(), 1000);
    }
    assert!(chunks.last().unwrap().num_samples() <= 1000);
}
