//! Tracing initialisation for tests.
//!
//! Budget decisions and store writes are logged at `debug`, so the default
//! filter turns that level on for `maktaba_core` only.

use tracing_subscriber::EnvFilter;

const DEFAULT_TEST_FILTER: &str = "info,maktaba_core=debug";

/// Install a subscriber that writes to the test-harness writer.
///
/// `RUST_LOG` overrides the default filter. Later calls are ignored, so
/// every test may call this.
///
/// ```ignore
/// #[tokio::test]
/// async fn trims_history() {
///     maktaba_test_utils::tracing_setup::init_test_tracing();
///     // budget eviction events are now visible with --nocapture
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER)),
        )
        .with_test_writer()
        .try_init();
}
