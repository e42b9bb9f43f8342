use thiserror::Error;

/// A read against a store failed.
///
/// Transient and permanent failures are not distinguished; the fetch layer
/// reacts to all of them the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreQueryError {
    #[error("query request failed: {0}")]
    Transport(String),

    #[error("query returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode query response: {0}")]
    Decode(String),

    #[error("store rejected query: {0}")]
    Rejected(String),
}
