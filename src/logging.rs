/**
 * Diagnostic logging to standard error.
 */
use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


/// The filter used when `RUST_LOG` is not set, by number of `-v` flags.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}


/// Install the global subscriber. `RUST_LOG` takes precedence over `verbosity`. Calling
/// this a second time does nothing.
pub fn init_logging(verbosity: u8, ansi: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
