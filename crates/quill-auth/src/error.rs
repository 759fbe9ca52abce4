/// Identity verification errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request to the identity provider failed
    #[error("identity verification failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Identity provider returned a non-success response
    #[error("identity provider error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },
}
