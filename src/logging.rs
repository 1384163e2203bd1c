//! Tracing setup for engine diagnostics.
//!
//! Progress and error text is a caller-visible output of the engine (CI logs
//! are how failures get diagnosed), so the default level is `info` rather
//! than `warn`. `RUST_LOG` overrides as usual. Output goes to stderr; stdout
//! is reserved for the chosen-task id in advance-next-task mode.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Call once, before any engine work.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
