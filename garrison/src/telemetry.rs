//! Telemetry initialization (structured logging via `tracing`).
//!
//! Log verbosity is controlled with the standard `RUST_LOG` environment
//! variable. Security audit events are emitted at the dedicated `security`
//! target, so they can be filtered independently, e.g.
//! `RUST_LOG=warn,security=info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; embedding applications that install their
/// own subscriber should skip this.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
