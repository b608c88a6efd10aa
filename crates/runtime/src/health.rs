//! Read-only service health aggregation.

use std::sync::Arc;

use tts_core::ModelState;

use crate::model::ModelResource;
use crate::voices::VoiceRegistry;

/// Aggregate service status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Model not loaded yet (or loading).
    Starting,
    /// Model ready and at least one voice registered.
    Ready,
    /// Service up but unable to synthesize.
    Degraded(String),
}

impl ServiceStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Starting => "starting",
            ServiceStatus::Ready => "ready",
            ServiceStatus::Degraded(_) => "degraded",
        }
    }

    /// Degradation reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ServiceStatus::Degraded(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Observes the model resource and voice registry; never blocks, never
/// mutates.
#[derive(Debug)]
pub struct HealthTracker {
    model: Arc<ModelResource>,
    registry: Arc<VoiceRegistry>,
}

impl HealthTracker {
    /// Create a tracker over the given components.
    pub fn new(model: Arc<ModelResource>, registry: Arc<VoiceRegistry>) -> Self {
        Self { model, registry }
    }

    /// Current aggregate status.
    pub fn status(&self) -> ServiceStatus {
        match self.model.state() {
            ModelState::Uninitialized | ModelState::Loading => ServiceStatus::Starting,
            ModelState::Failed(reason) => ServiceStatus::Degraded(reason),
            ModelState::Ready => {
                if self.registry.is_empty() {
                    ServiceStatus::Degraded("no voices registered".to_string())
                } else {
                    ServiceStatus::Ready
                }
            }
        }
    }
}
