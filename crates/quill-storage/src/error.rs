/// Errors from the blob storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// HTTP transport or connection error
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Storage returned a non-success status
    #[error("storage API error ({status}): {message}")]
    Api {
        /// HTTP status from the storage service
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// Object path did not contain a bucket component
    #[error("invalid object path: {0}")]
    InvalidPath(String),
}
