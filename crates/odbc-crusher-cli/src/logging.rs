//! Logging setup. Everything goes to stderr so a JSON report on stdout stays
//! machine readable.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// JSON lines instead of human readable output
    pub json: bool,

    /// Include file/line information
    pub include_location: bool,
}

impl LoggingConfig {
    pub fn new(verbose: bool, json: bool) -> Self {
        let default_filter = if verbose {
            "debug,odbc_crusher_core=debug,odbc_crusher_odbc=debug"
        } else {
            "warn,odbc_crusher_core=info,odbc_crusher_odbc=info"
        };
        Self {
            default_filter: default_filter.to_string(),
            json,
            include_location: verbose,
        }
    }
}

pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    // RUST_LOG takes precedence over the default filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}
