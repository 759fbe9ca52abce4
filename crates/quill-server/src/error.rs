use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

use quill_core::HttpError;
use quill_llm::RelayError;

/// Request validation failures surfaced by the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request body is not valid JSON")]
    InvalidJson,
    #[error("request carries no content fields")]
    EmptyRequest,
    #[error("request content is empty")]
    NoContent,
    #[error("multipart body could not be parsed")]
    InvalidFormData,
    #[error("no files in multipart body")]
    NoFilesUploaded,
    #[error("failed to read an uploaded file")]
    FileProcessingError,
    #[error("no readable content in uploaded files")]
    NoReadableContent,
    #[error("image references are not valid URLs")]
    InvalidImageUrls,
    #[error("authentication required")]
    AuthRequired,
}

impl HttpError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::EmptyRequest => "EMPTY_REQUEST",
            Self::NoContent => "NO_CONTENT",
            Self::InvalidFormData => "INVALID_FORM_DATA",
            Self::NoFilesUploaded => "NO_FILES_UPLOADED",
            Self::FileProcessingError => "FILE_PROCESSING_ERROR",
            Self::NoReadableContent => "NO_READABLE_CONTENT",
            Self::InvalidImageUrls => "INVALID_IMAGE_URLS",
            Self::AuthRequired => "AUTH_REQUIRED",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON body",
            Self::EmptyRequest => "Empty request",
            Self::NoContent => "No content provided",
            Self::InvalidFormData => "Invalid form data",
            Self::NoFilesUploaded => "No files uploaded",
            Self::FileProcessingError => "File processing failed",
            Self::NoReadableContent => "No readable content",
            Self::InvalidImageUrls => "Invalid image URLs",
            Self::AuthRequired => "Authentication required",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidJson => "The request body must be valid JSON.".to_owned(),
            Self::EmptyRequest => {
                "Provide text, a prompt, or images to generate from.".to_owned()
            }
            Self::NoContent => "The provided content is empty.".to_owned(),
            Self::InvalidFormData => "The multipart form data could not be parsed.".to_owned(),
            Self::NoFilesUploaded => "Upload at least one file.".to_owned(),
            Self::FileProcessingError => {
                "One of the uploaded files could not be read.".to_owned()
            }
            Self::NoReadableContent => {
                "None of the uploaded files contained readable content.".to_owned()
            }
            Self::InvalidImageUrls => {
                "Image references must be http(s) or data URLs.".to_owned()
            }
            Self::AuthRequired => "Sign in to access this endpoint.".to_owned(),
        }
    }
}

/// Render any domain error as the JSON error body
///
/// Insufficient-credits responses additionally carry the shortfall fields
/// so clients can prompt an upgrade with exact numbers.
pub fn error_response(error: &dyn HttpError) -> Response {
    let mut body = json!({
        "error": error.summary(),
        "message": error.client_message(),
        "code": error.error_code(),
    });
    (error.status_code(), Json(body.take())).into_response()
}

/// [`error_response`] specialized for relay errors
pub fn relay_error_response(error: &RelayError) -> Response {
    if let RelayError::InsufficientCredits { needed, available } = error {
        let body = json!({
            "error": error.summary(),
            "message": error.client_message(),
            "code": error.error_code(),
            "creditsNeeded": needed,
            "creditsAvailable": available,
            "shortfall": needed - available,
        });
        return (error.status_code(), Json(body)).into_response();
    }
    error_response(error)
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}
