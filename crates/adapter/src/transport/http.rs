//! Synchronous JSON-RPC over HTTP: one POST in, one JSON response out.

use super::{Transport, cors_layer, info_router, serve_router};
use crate::error::Result;
use crate::protocol::{PARSE_ERROR, RpcHandler};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct HttpTransport {
    bind: SocketAddr,
}

impl HttpTransport {
    #[must_use]
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run(self: Box<Self>, rpc: Arc<RpcHandler>) -> Result<()> {
        serve_router(self.name(), self.bind, router(rpc)).await
    }
}

pub fn router(rpc: Arc<RpcHandler>) -> Router {
    let endpoints = json!({
        "/": "Server information (this response)",
        "/mcp": "POST endpoint for MCP messages",
        "/messages": "Alias of /mcp",
        "/health": "Liveness probe",
        "/tools": "Tool catalog",
    });

    Router::new()
        .route("/mcp", post(handle_post))
        .route("/messages", post(handle_post))
        .with_state(Arc::clone(&rpc))
        .merge(info_router(rpc, endpoints))
        .layer(cors_layer())
}

async fn handle_post(State(rpc): State<Arc<RpcHandler>>, body: String) -> Response {
    match rpc.handle_payload(&body).await {
        Some(response) => {
            let status = match &response.error {
                Some(error) if error.code == PARSE_ERROR => StatusCode::BAD_REQUEST,
                _ => StatusCode::OK,
            };
            (status, Json(response)).into_response()
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}
