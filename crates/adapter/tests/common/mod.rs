#![allow(dead_code)]

use anyhow::Context as _;
use evolution_mcp_adapter::config::UpstreamConfig;
use evolution_mcp_adapter::dispatcher::Dispatcher;
use evolution_mcp_adapter::protocol::RpcHandler;
use serde_json::Value;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout};

pub use evolution_test_support::{KillOnDrop, StubUpstream, pick_unused_port, wait_http_ok};

pub const INSTANCE: &str = "main";
pub const API_KEY: &str = "test-key";

const INHERITED_VARS: &[&str] = &[
    "EVOLUTION_INSTANCIA",
    "EVOLUTION_APIKEY",
    "EVOLUTION_API_BASE",
    "EVOLUTION_TIMEOUT_SECS",
    "MCP_TRANSPORT",
    "MCP_BIND",
    "MCP_DEMO_TOOLS",
    "MCP_SSE_KEEP_ALIVE_SECS",
    "PORT",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "RUST_LOG",
];

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_evolution-mcp-adapter")
}

/// Adapter command configured through the environment against `api_base`.
pub fn adapter_command(api_base: &str) -> Command {
    let mut cmd = Command::new(bin());
    for var in INHERITED_VARS {
        cmd.env_remove(var);
    }
    cmd.env("EVOLUTION_INSTANCIA", INSTANCE)
        .env("EVOLUTION_APIKEY", API_KEY)
        .env("EVOLUTION_API_BASE", api_base)
        .env("EVOLUTION_TIMEOUT_SECS", "5")
        .env("LOG_LEVEL", "warn");
    cmd
}

/// Spawn the adapter with the plain HTTP transport on `port`.
pub fn spawn_http_adapter(api_base: &str, port: u16) -> anyhow::Result<Child> {
    adapter_command(api_base)
        .arg("--transport")
        .arg("http")
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .stdin(Stdio::null())
        .spawn()
        .context("spawn adapter")
}

/// Adapter child speaking line-delimited JSON-RPC over its stdin/stdout.
pub struct StdioAdapter {
    _child: tokio::process::Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioAdapter {
    pub fn spawn(api_base: &str, extra_args: &[&str]) -> anyhow::Result<Self> {
        let mut cmd = tokio::process::Command::from(adapter_command(api_base));
        cmd.args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = cmd.spawn().context("spawn stdio adapter")?;
        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;
        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    pub async fn send(&mut self, envelope: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');
        self.send_raw(line.as_bytes()).await
    }

    /// Write bytes to the child's stdin unchanged.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.stdin.write_all(bytes).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        let line = tokio::time::timeout(Duration::from_secs(10), self.stdout.next_line())
            .await
            .context("timed out waiting for a response line")??
            .context("adapter closed stdout")?;
        serde_json::from_str(&line).context("response line is not JSON")
    }

    pub async fn request(&mut self, envelope: &Value) -> anyhow::Result<Value> {
        self.send(envelope).await?;
        self.recv().await
    }
}

/// Envelope handler wired to `stub`, for in-process transport tests.
pub fn rpc_for(stub: &StubUpstream) -> anyhow::Result<Arc<RpcHandler>> {
    let config = UpstreamConfig::new(
        Some(INSTANCE),
        Some(API_KEY),
        Some(&stub.host()),
        Some(Duration::from_secs(5)),
    )?;
    let dispatcher = Dispatcher::from_config(&config, false)?;
    Ok(Arc::new(RpcHandler::new(Arc::new(dispatcher))))
}

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn serve_in_process(app: axum::Router) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind in-process server")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

pub fn call_envelope(id: u64, tool: &str, arguments: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools.call",
        "params": { "name": tool, "arguments": arguments },
    })
}

pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
}
