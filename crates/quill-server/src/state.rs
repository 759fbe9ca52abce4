use std::sync::Arc;

use quill_credits::EntitlementResolver;
use quill_ingest::ExtractorSet;
use quill_llm::MeteredRelay;

/// Shared per-request state for all handlers
///
/// Identity verification lives in the middleware layer, not here.
#[derive(Clone)]
pub struct AppState {
    pub resolver: EntitlementResolver,
    pub relay: Arc<MeteredRelay>,
    pub extractors: Arc<ExtractorSet>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
