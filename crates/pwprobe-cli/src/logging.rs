//! Logging setup for the `pwprobe` binary
//!
//! Logs go to stderr so stdout carries only the report. `RUST_LOG` takes
//! precedence over the filter derived from `-v`.

use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output
    pub json: bool,

    /// Include file/line information
    pub include_location: bool,

    /// Log span close events with their timing
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,pwprobe_cli=info,pwprobe_harness=info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn for_verbosity(verbose: u8, json: bool) -> Self {
        let default_filter = match verbose {
            0 => Self::default().default_filter,
            1 => "info,pwprobe_cli=debug,pwprobe_harness=debug,pwprobe_core=debug,pwprobe_driver_mssql=debug"
                .to_string(),
            _ => "debug,tiberius=info".to_string(),
        };

        Self {
            json,
            include_location: verbose >= 2,
            enable_spans: verbose >= 2,
            default_filter,
        }
    }
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = if config.json {
        fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(config.include_location)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(json = config.json, "logging initialized");
    Ok(())
}
