//! Sync error types.

/// Synchronization error. All of these are soft: the service logs, keeps the
/// previously persisted state intact and retries on its next cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("http: {0}")]
    Http(String),

    /// The version endpoint answered something that is not a decimal number.
    #[error("invalid version payload: {0:?}")]
    InvalidVersion(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
