use crate::types::FileInput;

/// Extraction failure for a single file
///
/// Never aborts the batch; the allocator logs the failure and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("file is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0}")]
    Other(String),
}

/// Format-specific text extraction
///
/// PDF, DOCX and slide-deck extractors plug in here; the built-in set only
/// handles plain-text formats.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the given MIME type
    fn supports(&self, mime_type: &str) -> bool;

    /// Extract the text content of the file
    fn extract(&self, file: &FileInput) -> Result<String, ExtractError>;
}

/// UTF-8 passthrough for `text/*` and common text-bearing types
///
/// Markdown upload widgets often send no content type, so `.md` files are
/// matched by extension as well.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, mime_type: &str) -> bool {
        mime_type.starts_with("text/")
            || mime_type == "application/json"
            || mime_type == "application/xml"
    }

    fn extract(&self, file: &FileInput) -> Result<String, ExtractError> {
        std::str::from_utf8(&file.bytes)
            .map(str::to_owned)
            .map_err(|_| ExtractError::InvalidUtf8)
    }
}

/// Ordered collection of extractors; first supporting extractor wins
pub struct ExtractorSet {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorSet {
    /// Set with only the plain-text builtins
    pub fn builtin() -> Self {
        Self {
            extractors: vec![Box::new(PlainTextExtractor)],
        }
    }

    /// Register an additional extractor, consulted after existing ones
    #[must_use]
    pub fn with(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Find the extractor for a MIME type, if one is registered
    pub fn find(&self, mime_type: &str) -> Option<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(mime_type))
            .map(AsRef::as_ref)
    }
}

impl std::fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorSet")
            .field("len", &self.extractors.len())
            .finish()
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::builtin()
    }
}
