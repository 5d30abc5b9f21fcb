//! Directory and ledger error types.

/// Storage-layer error.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The operation needs "today" and the clock is not synchronized.
    #[error("clock not synchronized")]
    ClockUnsynced,
}
