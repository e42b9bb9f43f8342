use crate::fetch::FetchError;
use influx_migrate_core::TranslationError;
use thiserror::Error;

/// Why one (sensor, window) iteration produced nothing.
///
/// Caught and logged by the orchestrator; the loop continues with the next
/// window.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to translate readings")]
    Translation(#[from] TranslationError),
}
