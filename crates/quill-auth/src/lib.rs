#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod verifier;

pub use error::AuthError;
pub use verifier::IdentityVerifier;
