//! Evolution API messaging tools exposed over MCP-style JSON-RPC.
//!
//! One [`dispatcher::Dispatcher`] owns the tool catalog and the outbound client; the
//! [`protocol::RpcHandler`] turns envelopes into dispatcher calls; a [`transport::Transport`]
//! (stdio, SSE or plain HTTP) moves envelopes in and responses out.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod transport;

pub use error::{AdapterError, Result, ToolCallError};
