//! Front ends. Every transport feeds the same [`RpcHandler`].

pub mod http;
pub mod sse;
pub mod stdio;

use crate::config::{ServeConfig, TransportKind};
use crate::error::{AdapterError, Result};
use crate::protocol::RpcHandler;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[async_trait]
pub trait Transport: Send {
    fn name(&self) -> &'static str;

    /// Serve until the input ends (stdio) or the listener fails (HTTP-based).
    async fn run(self: Box<Self>, rpc: Arc<RpcHandler>) -> Result<()>;
}

/// Pick the transport named by `config`.
#[must_use]
pub fn select(config: &ServeConfig) -> Box<dyn Transport> {
    match config.transport {
        TransportKind::Stdio => Box::new(stdio::StdioTransport),
        TransportKind::Sse => Box::new(sse::SseTransport::new(config.bind, config.sse_keep_alive)),
        TransportKind::Http => Box::new(http::HttpTransport::new(config.bind)),
    }
}

/// `GET /`, `GET /health` and `GET /tools`, shared by the HTTP-based transports.
pub fn info_router(rpc: Arc<RpcHandler>, endpoints: Value) -> Router {
    Router::new()
        .route(
            "/",
            get(move |State(rpc): State<Arc<RpcHandler>>| async move {
                Json(server_info(&rpc, endpoints))
            }),
        )
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/tools", get(list_tools))
        .with_state(rpc)
}

async fn list_tools(State(rpc): State<Arc<RpcHandler>>) -> Json<Value> {
    Json(json!({ "tools": rpc.dispatcher().list_tools() }))
}

fn server_info(rpc: &RpcHandler, endpoints: Value) -> Value {
    let tools: Vec<Value> = rpc
        .dispatcher()
        .registry()
        .list()
        .iter()
        .map(|t| json!({ "name": t.name, "description": t.description }))
        .collect();
    json!({
        "name": rpc.info().name,
        "version": rpc.info().version,
        "status": "running",
        "endpoints": endpoints,
        "tools": tools,
    })
}

/// Any origin, GET/POST/OPTIONS, no credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub(crate) async fn serve_router(name: &str, bind: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| AdapterError::Startup(format!("{name} bind {bind} failed: {e}")))?;
    let local = listener.local_addr()?;
    info!(transport = name, addr = %local, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| AdapterError::Runtime(format!("{name} server failed: {e}")))
}
