use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// converts these into actual JSON error responses, keeping domain
/// errors decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error code (e.g. `INSUFFICIENT_CREDITS`)
    fn error_code(&self) -> &'static str;

    /// Short human-readable summary (the `error` field of the JSON body)
    fn summary(&self) -> &'static str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}
