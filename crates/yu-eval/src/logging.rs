//! Tracing subscriber setup for hosts that do not install their own.

use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Install a compact fmt subscriber filtered by `RUST_LOG`, with `level` as
/// the default directive. Only the first call has any effect, and a
/// subscriber installed earlier by the host is left in place.
pub fn init_logging(level: Level) {
    INIT.get_or_init(|| {
        let installed = SubscriberBuilder::default()
            .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(%level, "yu tracing initialised");
        }
    });
}
