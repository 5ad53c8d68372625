use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initialize tracing for the process.
///
/// `RUST_LOG` wins over the `info` default. Safe to call more than once;
/// later calls are no-ops.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
