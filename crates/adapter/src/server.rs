use crate::config::{ServeConfig, UpstreamConfig};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::protocol::RpcHandler;
use crate::transport;
use std::sync::Arc;
use tracing::info;

/// Dispatcher + envelope handler + the configured transport.
pub struct AdapterServer {
    rpc: Arc<RpcHandler>,
    serve: ServeConfig,
}

impl AdapterServer {
    /// # Errors
    ///
    /// Returns a config error if the tool catalog cannot be registered.
    pub fn new(upstream: &UpstreamConfig, serve: ServeConfig, demo_tools: bool) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(upstream, demo_tools)?;
        Ok(Self {
            rpc: Arc::new(RpcHandler::new(Arc::new(dispatcher))),
            serve,
        })
    }

    #[must_use]
    pub fn rpc(&self) -> Arc<RpcHandler> {
        Arc::clone(&self.rpc)
    }

    /// Serve on the configured transport until it stops.
    ///
    /// # Errors
    ///
    /// Returns startup errors (bind failures) and transport I/O errors.
    pub async fn run(self) -> Result<()> {
        let transport = transport::select(&self.serve);
        info!(
            transport = transport.name(),
            tools = self.rpc.dispatcher().registry().len(),
            "starting adapter"
        );
        transport.run(self.rpc).await
    }
}
