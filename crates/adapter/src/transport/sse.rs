//! Server-Sent Events transport.
//!
//! `GET /sse` opens a session: the first event (`endpoint`) tells the client where to POST, every
//! later event (`message`) carries one JSON-RPC response. `POST /messages?sessionId=<id>` accepts
//! an envelope, answers `202` immediately and delivers the response on the session's stream.

use super::{Transport, cors_layer, info_router, serve_router};
use crate::error::Result;
use crate::protocol::{JsonRpcResponse, PARSE_ERROR, RpcHandler};
use crate::session::{SessionGuard, SessionStore};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Responses buffered per session before `POST` handlers start waiting.
const SESSION_BUFFER: usize = 32;

pub struct SseTransport {
    bind: SocketAddr,
    keep_alive: Duration,
}

impl SseTransport {
    #[must_use]
    pub fn new(bind: SocketAddr, keep_alive: Duration) -> Self {
        Self { bind, keep_alive }
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn name(&self) -> &'static str {
        "sse"
    }

    async fn run(self: Box<Self>, rpc: Arc<RpcHandler>) -> Result<()> {
        let app = router(rpc, Arc::new(SessionStore::new()), self.keep_alive);
        serve_router(self.name(), self.bind, app).await
    }
}

#[derive(Clone)]
struct SseState {
    rpc: Arc<RpcHandler>,
    store: Arc<SessionStore>,
    keep_alive: Duration,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Routes for the SSE transport over an injected session store.
pub fn router(rpc: Arc<RpcHandler>, store: Arc<SessionStore>, keep_alive: Duration) -> Router {
    let endpoints = json!({
        "/": "Server information (this response)",
        "/sse": "Server-Sent Events endpoint for MCP connection",
        "/messages": "POST endpoint for MCP messages",
        "/health": "Liveness probe",
        "/tools": "Tool catalog",
    });
    let state = SseState {
        rpc: Arc::clone(&rpc),
        store,
        keep_alive,
    };

    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .with_state(state)
        .merge(info_router(rpc, endpoints))
        .layer(cors_layer())
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);
    let guard = state.store.open(tx);
    info!(session_id = %guard.session_id(), "sse session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", guard.session_id()));
    let events = stream::iter([Ok::<_, Infallible>(endpoint)]).chain(
        ReceiverStream::new(rx).map(|payload| Ok(Event::default().event("message").data(payload))),
    );

    Sse::new(SessionStream {
        inner: events,
        _guard: guard,
    })
    .keep_alive(KeepAlive::new().interval(state.keep_alive))
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id.filter(|s| !s.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing sessionId").into_response();
    };
    let Some(sender) = state.store.lookup(&session_id) else {
        debug!(session_id = %session_id, "post for unknown session");
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };

    let envelope: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            let error =
                JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    let rpc = Arc::clone(&state.rpc);
    tokio::spawn(async move {
        let Some(response) = rpc.handle_value(envelope).await else {
            return;
        };
        if sender.send(response.to_json_string()).await.is_err() {
            warn!(session_id = %session_id, "session closed before the response was delivered");
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// Event stream that owns its session registration.
struct SessionStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S> Stream for SessionStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_the_stream_releases_the_session() {
        let store = Arc::new(SessionStore::new());
        let (tx, rx) = mpsc::channel::<String>(1);
        let guard = store.open(tx);
        let id = guard.session_id().to_string();
        let stream = SessionStream {
            inner: ReceiverStream::new(rx),
            _guard: guard,
        };
        assert!(store.lookup(&id).is_some());
        drop(stream);
        assert!(store.lookup(&id).is_none());
    }

    #[tokio::test]
    async fn stream_yields_forwarded_messages() {
        let store = Arc::new(SessionStore::new());
        let (tx, rx) = mpsc::channel::<String>(2);
        let guard = store.open(tx);
        let sender = store.lookup(guard.session_id()).expect("live");
        let mut stream = SessionStream {
            inner: ReceiverStream::new(rx),
            _guard: guard,
        };
        sender.send("one".to_string()).await.expect("send");
        assert_eq!(stream.next().await.as_deref(), Some("one"));
    }
}
