pub mod auth; // BFF token exchange + identity-provider failure classification
pub mod config;
pub mod dashboard; // Collections, load state, filter/selection state machine
pub mod gateway; // Authenticated BFF data access
pub mod metrics; // Derived practice analytics
pub mod models;
pub mod normalize; // Raw record -> typed entity boundary
pub mod reschedule; // Reschedule validation + time planning
pub mod session; // Persisted token/claims store
pub mod timefmt; // Time, formatting, and display helpers

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the embedding shell.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
