//! # tts-server
//!
//! HTTP surface of the streaming TTS service.
//!
//! Provides:
//! - `GET /health` — aggregate service status
//! - `GET /voices` — registered voices in stable order
//! - `POST /synthesize` — chunked `audio/wav` streaming synthesis
//! - `GET /ws` — WebSocket streaming sessions
//!
//! All scheduling, backpressure, and failure-containment decisions live in
//! the `runtime` crate; this layer only maps requests and errors onto HTTP.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use routes::create_router;
pub use state::AppState;
