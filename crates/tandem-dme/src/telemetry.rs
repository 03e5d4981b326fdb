//! Tracing initialization for Tandem binaries.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the filter directives,
/// e.g. `TANDEM_LOG=tandem_dme=debug,tandem_net=info`.
pub const LOG_ENV: &str = "TANDEM_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,tandem=info";

/// Install the global fmt subscriber, writing to stderr.
///
/// Falls back to `warn,tandem=info` when `TANDEM_LOG` is unset or invalid.
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .try_init();
    });
}
