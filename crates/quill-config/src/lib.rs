#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod credits;
mod env;
pub mod llm;
mod loader;
pub mod server;
pub mod storage;
pub mod store;

use serde::Deserialize;

pub use auth::AuthConfig;
pub use credits::CreditsConfig;
pub use llm::LlmConfig;
pub use server::{HealthConfig, ServerConfig};
pub use storage::StorageConfig;
pub use store::StoreConfig;

/// Top-level Quill configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Relational store (credits and subscriptions)
    pub store: StoreConfig,
    /// Identity provider
    pub auth: AuthConfig,
    /// Generation provider
    pub llm: LlmConfig,
    /// Blob storage for staged uploads
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    /// Credit and entitlement tuning
    #[serde(default)]
    pub credits: CreditsConfig,
}
