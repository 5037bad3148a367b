use super::config::{LogFormat, LogLevel};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Builds the event filter: `RUST_LOG` when set, otherwise `level`.
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::from(level).as_str().to_lowercase()))
}

/// Initialize the tracing subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_tracing(level: LogLevel, format: LogFormat) {
    let filter = build_filter(level);

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {e}");
    }
}
