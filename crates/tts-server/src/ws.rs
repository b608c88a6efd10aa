//! WebSocket streaming endpoint.
//!
//! One socket carries a sequence of synthesis exchanges: the client sends
//! `{"type": "synthesize", "text": …, "voice"?, "speed"?}`, the server
//! replies with binary 16-bit PCM frames followed by `{"type": "end"}`.
//! Failures are reported as `{"type": "error", "message"}` without closing
//! the socket; `{"type": "stop"}` or a close frame ends the session.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use runtime::AudioStream;

use crate::handlers::SynthesizeBody;
use crate::state::AppState;

/// Client → server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WsCommand {
    Synthesize {
        text: String,
        #[serde(default)]
        voice: Option<String>,
        #[serde(default)]
        speed: Option<f32>,
    },
    Stop,
}

/// `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("websocket session opened");

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(_) => break,
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<WsCommand>(&text) {
                Ok(WsCommand::Synthesize { text, voice, speed }) => {
                    let body = SynthesizeBody { text, voice, speed };
                    if stream_to_socket(&mut socket, &state, body).await.is_err() {
                        break;
                    }
                }
                Ok(WsCommand::Stop) => break,
                Err(e) => {
                    if send_error(&mut socket, &e.to_string()).await.is_err() {
                        break;
                    }
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!("websocket session closed");
}

/// Run one synthesis and stream its chunks over the socket.
///
/// `Err` means the socket itself is gone; synthesis errors are reported
/// in-protocol and return `Ok`.
async fn stream_to_socket(
    socket: &mut WebSocket,
    state: &AppState,
    body: SynthesizeBody,
) -> Result<(), axum::Error> {
    let handle = match state.scheduler.submit(body.into_request()).await {
        Ok(handle) => handle,
        Err(e) => return send_error(socket, &e.to_string()).await,
    };

    let mut stream = AudioStream::open(handle);
    while let Some(item) = stream.next_chunk().await {
        match item {
            Ok(chunk) => {
                socket
                    .send(Message::Binary(audio_wav::pcm16_to_bytes(&chunk.samples)))
                    .await?;
                if chunk.is_final {
                    return socket
                        .send(Message::Text(json!({"type": "end"}).to_string()))
                        .await;
                }
            }
            Err(e) => return send_error(socket, &e.to_string()).await,
        }
    }

    // Stream closed without a final chunk and without an in-band error.
    send_error(socket, "stream ended unexpectedly").await
}

async fn send_error(socket: &mut WebSocket, message: &str) -> Result<(), axum::Error> {
    socket
        .send(Message::Text(
            json!({"type": "error", "message": message}).to_string(),
        ))
        .await
}
