#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod cleanup;
mod client;
mod error;

pub use cleanup::CleanupQueue;
pub use client::BlobClient;
pub use error::StorageError;
