use anyhow::Context as _;
use clap::Parser;
use evolution_mcp_adapter::config::{Cli, Command, ServeConfig, UpstreamConfig};
use evolution_mcp_adapter::dispatcher::{Dispatcher, PreparedCall};
use evolution_mcp_adapter::logging;
use evolution_mcp_adapter::server::AdapterServer;
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let command = cli.command.clone().unwrap_or(Command::Serve);

    match command {
        Command::Serve => {
            let upstream = UpstreamConfig::from_cli(&cli)?;
            let server = AdapterServer::new(&upstream, ServeConfig::from_cli(&cli), cli.demo_tools)?;
            server.run().await?;
        }
        Command::ListTools => {
            let dispatcher = Dispatcher::catalog_only(cli.demo_tools)?;
            print_json(&json!({ "tools": dispatcher.list_tools() }))?;
        }
        Command::Call {
            tool,
            arguments,
            dry_run,
        } => {
            let dispatcher = call_dispatcher(&cli, &tool)?;
            let arguments: Value = match arguments.as_deref() {
                Some(raw) => serde_json::from_str(raw).context("arguments must be valid JSON")?,
                None => Value::Null,
            };

            if dry_run {
                let prepared = dispatcher.prepare(&tool, &arguments)?;
                match prepared {
                    PreparedCall::Upstream(request) => print_json(&request)?,
                    PreparedCall::Local { tool } => {
                        print_json(&json!({ "local": tool }))?;
                    }
                }
            } else {
                let result = dispatcher.handle(&tool, arguments).await?;
                print_json(&result)?;
                if result.is_error == Some(true) {
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Upstream settings are required only when `tool` talks to the Evolution API.
fn call_dispatcher(cli: &Cli, tool: &str) -> anyhow::Result<Dispatcher> {
    match UpstreamConfig::from_cli(cli) {
        Ok(upstream) => Ok(Dispatcher::from_config(&upstream, cli.demo_tools)?),
        Err(e) => {
            let dispatcher = Dispatcher::catalog_only(cli.demo_tools)?;
            if dispatcher.needs_upstream(tool) {
                return Err(e.into());
            }
            Ok(dispatcher)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
