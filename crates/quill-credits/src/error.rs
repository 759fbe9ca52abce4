/// Errors returned by credit store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport or connection error
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Store returned a non-success status
    #[error("store API error ({status}): {message}")]
    Api {
        /// HTTP status from the store
        status: u16,
        /// Error message from the response body
        message: String,
    },
}

/// Errors returned by ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Balance could not be read or written
    #[error("credit balance unavailable: {0}")]
    Unavailable(#[from] StoreError),

    /// No balance row exists for this user
    #[error("no credit balance for user")]
    MissingBalance,
}
