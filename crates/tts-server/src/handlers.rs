//! HTTP request handlers.

use axum::{
    body::{Body, Bytes},
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt as _;
use tracing::debug;

use runtime::AudioStream;
use tts_core::{SynthesisRequest, TtsError, Voice};

use crate::state::AppState;

/// Error body returned alongside non-200 statuses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Map a service error to its HTTP representation.
pub(crate) fn error_response(err: &TtsError) -> Response {
    let (status, code) = match err {
        TtsError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        TtsError::VoiceNotFound(_) => (StatusCode::NOT_FOUND, "VOICE_NOT_FOUND"),
        TtsError::ResourceExhausted(_) => (StatusCode::SERVICE_UNAVAILABLE, "OVERLOADED"),
        TtsError::ModelUnavailable(_) | TtsError::ModelLoad(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "MODEL_UNAVAILABLE")
        }
        TtsError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "QUEUE_TIMEOUT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "SYNTHESIS_ERROR"),
    };

    (
        status,
        Json(ErrorBody {
            code,
            message: err.to_string(),
        }),
    )
        .into_response()
}

/// Health response body; the HTTP status is always 200, the service status
/// lives in the body.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.status();
    Json(HealthBody {
        status: status.as_str(),
        reason: status.reason().map(str::to_string),
    })
}

/// `GET /voices`
pub async fn voices(State(state): State<AppState>) -> Json<Vec<Voice>> {
    Json(state.registry.list().to_vec())
}

/// `POST /synthesize` request body.
#[derive(Debug, Deserialize)]
pub struct SynthesizeBody {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
}

impl SynthesizeBody {
    pub(crate) fn into_request(self) -> SynthesisRequest {
        let request = SynthesisRequest::new(
            self.text,
            self.voice.unwrap_or_else(|| "default".to_string()),
        );
        match self.speed {
            Some(speed) => request.with_speed(speed),
            None => request,
        }
    }
}

/// `POST /synthesize`
///
/// On success the body is a chunked `audio/wav` stream: a RIFF header with
/// unbounded sizes followed by 16-bit PCM as chunks are produced. The first
/// chunk is awaited before committing to a 200 so that queue timeouts and
/// pre-stream failures still map to their own status codes; a failure after
/// that closes the connection mid-body (truncated container).
pub async fn synthesize(
    State(state): State<AppState>,
    Json(body): Json<SynthesizeBody>,
) -> Response {
    let request = body.into_request();
    let request_id = request.request_id;

    let handle = match state.scheduler.submit(request).await {
        Ok(handle) => handle,
        Err(e) => return error_response(&e),
    };

    let mut stream = AudioStream::open(handle);
    let first = match stream.next_chunk().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => return error_response(&e),
        None => return error_response(&TtsError::internal("stream ended before output")),
    };

    let voice = stream.voice().clone();
    debug!(request_id = %request_id, voice = %voice.id, "streaming response started");

    let mut head =
        audio_wav::streaming_wav_header(voice.sample_rate, voice.channels).to_vec();
    head.extend_from_slice(&audio_wav::pcm16_to_bytes(&first.samples));

    let rest = stream.into_chunk_stream().map(|item| match item {
        Ok(chunk) => Ok(Bytes::from(audio_wav::pcm16_to_bytes(&chunk.samples))),
        // Abort the chunked transfer; the truncated container is the
        // client's failure signal, already-sent audio is never retracted.
        Err(e) => Err(std::io::Error::other(e.to_string())),
    });
    let body_stream = tokio_stream::once(Ok(Bytes::from(head))).chain(rest);

    (
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CACHE_CONTROL, "no-cache"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=speech.wav",
            ),
        ],
        Body::from_stream(body_stream),
    )
        .into_response()
}
