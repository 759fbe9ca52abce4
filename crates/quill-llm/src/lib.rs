#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod classify;
mod error;
mod openai;
mod provider;
mod relay;

pub use classify::{UpstreamKind, classify};
pub use error::RelayError;
pub use openai::OpenAiProvider;
pub use provider::{GenerationProvider, GenerationRequest, ProviderError, TokenStream};
pub use relay::{GenerationJob, MeteredRelay, RelayStream};
