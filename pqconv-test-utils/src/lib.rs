//! Test helpers shared by the pqconv crates.

use std::sync::Once;

use tracing_subscriber::filter::EnvFilter;

static INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset or invalid.
pub const DEFAULT_TEST_FILTER: &str = "info";

/// Install a tracing subscriber for test binaries. Safe to call repeatedly.
///
/// Output goes through the libtest writer so it is captured per test and
/// only shown for failures (or with `--nocapture`). `RUST_LOG` overrides the
/// default `info` level, e.g. `RUST_LOG=pqconv=trace`.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
        // Another subscriber may already be installed by the harness.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}
