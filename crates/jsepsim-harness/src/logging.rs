//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_TEST_FILTER: &str = "warn";

/// Route `tracing` output through the test harness's captured writer.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Set `RUST_LOG=jsepsim_core=trace` to see every peer operation.
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

    // Another test may already have installed one.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
