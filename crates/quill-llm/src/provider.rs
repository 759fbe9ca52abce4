use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

/// A generation request, already budgeted and billed
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Prompt text, including any extracted document content
    pub prompt: String,
    /// Image references: data URLs or https URLs, in upload order
    pub images: Vec<String>,
}

/// Opaque provider failure
///
/// Carries only a message; the relay classifies it by text (see
/// [`classify`](crate::classify)).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Failure text, usually embedding the upstream status code
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Stream of generated text chunks
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// A streaming text generation backend
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Open a token stream for the request
    ///
    /// An error here means no tokens were produced and the caller's
    /// reservation is fully refundable.
    async fn open_stream(&self, request: &GenerationRequest) -> Result<TokenStream, ProviderError>;
}
