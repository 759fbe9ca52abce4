//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use secrecy::SecretString;
use url::Url;

use quill_config::{
    AuthConfig, Config, CreditsConfig, HealthConfig, LlmConfig, ServerConfig, StorageConfig,
    StoreConfig,
};

use super::backends::Backends;

/// Builder for constructing test configurations pointed at mock backends
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder wired to the given mock collaborators
    pub fn new(backends: &Backends) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig::default(),
                },
                store: StoreConfig {
                    base_url: parse(&backends.store.uri()),
                    service_key: SecretString::from("store-test-key"),
                },
                auth: AuthConfig {
                    base_url: parse(&backends.auth.uri()),
                    service_key: SecretString::from("auth-test-key"),
                    cache_ttl_seconds: 60,
                    cache_capacity: 100,
                },
                // trailing slash so "chat/completions" joins under /v1/
                llm: LlmConfig {
                    base_url: parse(&format!("{}/v1/", backends.llm.uri())),
                    api_key: SecretString::from("sk-test"),
                    model: "quick-v1".to_owned(),
                    request_timeout_secs: 30,
                },
                storage: None,
                credits: CreditsConfig::default(),
            },
        }
    }

    /// Point blob cleanup at a storage mock
    pub fn with_storage(mut self, base_url: &str) -> Self {
        self.config.storage = Some(StorageConfig {
            base_url: parse(base_url),
            service_key: SecretString::from("storage-test-key"),
        });
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

fn parse(value: &str) -> Url {
    value.parse().expect("valid URL")
}
