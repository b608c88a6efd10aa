//! Shared server state.

use std::sync::Arc;

use runtime::{HealthTracker, SynthesisScheduler, VoiceRegistry};

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Admission and queueing for synthesis jobs.
    pub scheduler: Arc<SynthesisScheduler>,
    /// Registered voices.
    pub registry: Arc<VoiceRegistry>,
    /// Read-only service health.
    pub health: Arc<HealthTracker>,
}

impl AppState {
    /// Bundle the core components for the router.
    pub fn new(
        scheduler: Arc<SynthesisScheduler>,
        registry: Arc<VoiceRegistry>,
        health: Arc<HealthTracker>,
    ) -> Self {
        Self {
            scheduler,
            registry,
            health,
        }
    }
}
