pub mod config;
pub mod core_state;
pub mod db;
pub mod generation;
pub mod models;
pub mod voice;

use tracing_subscriber::EnvFilter;

pub use core_state::{CoreError, CoreState};

/// Install the global `fmt` subscriber. Honors `RUST_LOG`, else
/// `config::default_log_filter()`. Safe to call more than once.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
