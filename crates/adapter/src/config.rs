//! Command-line and environment configuration.
//!
//! Every setting is a flag with an environment-variable fallback. [`Cli`] is parsed once in
//! `main` and turned into the validated [`UpstreamConfig`] and [`ServeConfig`] structures that
//! the rest of the adapter receives explicitly.

use crate::error::{AdapterError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evolution_http_tools::request::UpstreamTarget;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// Header carrying the Evolution API key on every outbound request.
pub const API_KEY_HEADER: &str = "apikey";

#[derive(Parser)]
#[command(name = "evolution-mcp-adapter", version)]
#[command(about = "Expose Evolution API messaging tools over MCP (stdio, SSE or HTTP)")]
pub struct Cli {
    /// Evolution instance name
    #[arg(long, env = "EVOLUTION_INSTANCIA", global = true)]
    pub instance: Option<String>,

    /// Evolution API key (sent as the `apikey` header)
    #[arg(long, env = "EVOLUTION_APIKEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Evolution API host (`host:port`) or base URL
    #[arg(long, env = "EVOLUTION_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Outbound request timeout in seconds (0 disables)
    #[arg(long, env = "EVOLUTION_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Register the demo tools (`hello`) next to the Evolution catalog
    #[arg(long, env = "MCP_DEMO_TOOLS", global = true)]
    pub demo_tools: bool,

    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = TransportKind::Stdio, global = true)]
    pub transport: TransportKind,

    /// Listen address for the SSE/HTTP transports (overrides `--port`)
    #[arg(long, env = "MCP_BIND", global = true)]
    pub bind: Option<SocketAddr>,

    /// Listen port on all interfaces when `--bind` is not given
    #[arg(long, env = "PORT", default_value_t = 3001, global = true)]
    pub port: u16,

    /// Interval between SSE keep-alive comments
    #[arg(long, env = "MCP_SSE_KEEP_ALIVE_SECS", default_value_t = 15, global = true)]
    pub sse_keep_alive_secs: u64,

    /// Log level used when `RUST_LOG` is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(long, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve MCP requests on the selected transport (default)
    Serve,
    /// Call one tool and print the result
    Call {
        /// Tool name, e.g. `busca_grupos`
        tool: String,
        /// Tool arguments as a JSON object
        arguments: Option<String>,
        /// Print the outbound request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the tool catalog
    ListTools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Stdio,
    Sse,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Where and how to reach the Evolution API.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub instance_id: String,
    pub api_key: String,
    pub api_base_url: Url,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("instance_id", &self.instance_id)
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl UpstreamConfig {
    /// Validate raw settings.
    ///
    /// A base without a scheme (`evolution.example.com:8080`) is taken as a plain-HTTP host.
    ///
    /// # Errors
    ///
    /// Returns a config error when the instance, key or base is missing/blank or the base does
    /// not form a valid `http(s)` URL.
    pub fn new(
        instance_id: Option<&str>,
        api_key: Option<&str>,
        api_base: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let instance_id = required("EVOLUTION_INSTANCIA", instance_id)?;
        let api_key = required("EVOLUTION_APIKEY", api_key)?;
        let api_base = required("EVOLUTION_API_BASE", api_base)?;

        Ok(Self {
            instance_id,
            api_key,
            api_base_url: parse_base_url(&api_base)?,
            timeout: timeout.filter(|t| !t.is_zero()),
        })
    }

    /// # Errors
    ///
    /// See [`UpstreamConfig::new`].
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::new(
            cli.instance.as_deref(),
            cli.api_key.as_deref(),
            cli.api_base.as_deref(),
            Some(Duration::from_secs(cli.timeout_secs)),
        )
    }

    /// Outbound target: base URL, `{instance}` path variable and the API key header.
    #[must_use]
    pub fn target(&self) -> UpstreamTarget {
        UpstreamTarget::new(self.api_base_url.clone())
            .var("instance", self.instance_id.clone())
            .header(API_KEY_HEADER, self.api_key.clone())
    }
}

/// Front-end settings.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub transport: TransportKind,
    pub bind: SocketAddr,
    pub sse_keep_alive: Duration,
}

impl ServeConfig {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            transport: cli.transport,
            bind: cli
                .bind
                .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), cli.port)),
            sse_keep_alive: Duration::from_secs(cli.sse_keep_alive_secs.max(1)),
        }
    }
}

fn required(name: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AdapterError::Config(format!("{name} is not set"))),
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&with_scheme).map_err(|e| {
        AdapterError::Config(format!("Invalid EVOLUTION_API_BASE '{raw}': {e}"))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AdapterError::Config(format!(
            "Invalid EVOLUTION_API_BASE '{raw}': unsupported scheme '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        let cfg = UpstreamConfig::new(
            Some("main"),
            Some("key"),
            Some("evolution.local:8080"),
            None,
        )
        .expect("valid");
        assert_eq!(cfg.api_base_url.as_str(), "http://evolution.local:8080/");
    }

    #[test]
    fn full_url_is_kept() {
        let cfg = UpstreamConfig::new(
            Some("main"),
            Some("key"),
            Some("https://api.example.com/evo"),
            Some(Duration::from_secs(5)),
        )
        .expect("valid");
        assert_eq!(cfg.api_base_url.as_str(), "https://api.example.com/evo");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = UpstreamConfig::new(Some("main"), Some("  "), Some("h:1"), None).unwrap_err();
        assert!(matches!(err, AdapterError::Config(ref m) if m.contains("EVOLUTION_APIKEY")));
    }

    #[test]
    fn missing_instance_is_a_config_error() {
        let err = UpstreamConfig::new(None, Some("key"), Some("h:1"), None).unwrap_err();
        assert!(err.to_string().contains("EVOLUTION_INSTANCIA"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err =
            UpstreamConfig::new(Some("main"), Some("key"), Some("ftp://h"), None).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = UpstreamConfig::new(Some("main"), Some("s3cr3t"), Some("h:1"), None)
            .expect("valid");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("main"));
    }

    #[test]
    fn target_carries_instance_and_key_header() {
        let cfg = UpstreamConfig::new(Some("main"), Some("k"), Some("h:1"), None).expect("valid");
        let target = cfg.target();
        assert_eq!(target.vars.get("instance").map(String::as_str), Some("main"));
        assert_eq!(target.headers, vec![("apikey".to_string(), "k".to_string())]);
    }

    #[test]
    fn bind_falls_back_to_port_on_all_interfaces() {
        let cli = Cli::try_parse_from(["evolution-mcp-adapter", "--port", "4010"]).expect("parse");
        let serve = ServeConfig::from_cli(&cli);
        assert_eq!(serve.bind.to_string(), "0.0.0.0:4010");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from([
            "evolution-mcp-adapter",
            "serve",
            "--transport",
            "sse",
            "--bind",
            "127.0.0.1:5000",
        ])
        .expect("parse");
        let serve = ServeConfig::from_cli(&cli);
        assert_eq!(serve.transport, TransportKind::Sse);
        assert_eq!(serve.bind.to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn cli_parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "evolution-mcp-adapter",
            "call",
            "busca_grupos",
            r#"{"getParticipants":true}"#,
            "--dry-run",
        ])
        .expect("parse");
        let Some(Command::Call {
            tool,
            arguments,
            dry_run,
        }) = cli.command
        else {
            panic!("expected call subcommand");
        };
        assert_eq!(tool, "busca_grupos");
        assert_eq!(arguments.as_deref(), Some(r#"{"getParticipants":true}"#));
        assert!(dry_run);
    }
}
