//! Unified error types for the synthesis service.

/// Main error type for TTS operations.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Request failed validation (empty/oversized text, speed out of range).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested voice is not registered.
    #[error("unknown voice: {0}")]
    VoiceNotFound(String),

    /// Admission rejected because the queue is at capacity.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Job waited in queue longer than the configured bound.
    #[error("queue wait timeout after {ms}ms")]
    Timeout { ms: u64 },

    /// The model is not in the Ready state.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Inference failed for a single job; the model stays usable.
    #[error("inference error: {0}")]
    Inference(String),

    /// Model loading failed; the service degrades until reload.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Create a validation error with message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unknown-voice error.
    pub fn voice_not_found(voice_id: impl Into<String>) -> Self {
        Self::VoiceNotFound(voice_id.into())
    }

    /// Create a queue-full error with message.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Create a model-unavailable error with message.
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create an inference error with message.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a model-load error with message.
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a config error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is an admission rejection (never reached the
    /// execution slot).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::VoiceNotFound(_)
                | Self::ResourceExhausted(_)
                | Self::ModelUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TtsError::invalid_input("speed out of range");
        assert_eq!(err.to_string(), "invalid input: speed out of range");

        let err = TtsError::Timeout { ms: 5000 };
        assert_eq!(err.to_string(), "queue wait timeout after 5000ms");

        let err = TtsError::voice_not_found("narrator");
        assert_eq!(err.to_string(), "unknown voice: narrator");
    }

    #[test]
    fn test_error_constructors() {
        let err = TtsError::inference("decoder diverged");
        assert!(matches!(err, TtsError::Inference(_)));

        let err = TtsError::model_load("weights missing");
        assert!(matches!(err, TtsError::ModelLoad(_)));
    }

    #[test]
    fn test_is_rejection() {
        assert!(TtsError::resource_exhausted("queue full").is_rejection());
        assert!(TtsError::model_unavailable("loading").is_rejection());
        assert!(!TtsError::inference("boom").is_rejection());
        assert!(!TtsError::Timeout { ms: 10 }.is_rejection());
    }
}
