//! Shared utilities: tracing bootstrap and keyed locks.

mod keyed_locks;

pub use keyed_locks::KeyedLocks;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with the EXPEDITOR_LOG environment variable.
///
/// Defaults to "info" level if EXPEDITOR_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("EXPEDITOR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
