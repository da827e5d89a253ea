use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output always goes to stderr; stdout belongs to the stdio
/// transport.
///
/// `RUST_LOG` wins over `level` when set. Calling this twice is a no-op.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => builder.with_ansi(false).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
