use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Identity provider configuration
///
/// Bearer tokens are verified against this service; verification results
/// are cached for a short TTL to avoid a network round-trip per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Base URL of the identity provider
    pub base_url: Url,
    /// Service key sent alongside user tokens
    pub service_key: SecretString,
    /// TTL in seconds for cached token verifications
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached verifications
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

const fn default_cache_ttl_seconds() -> u64 {
    60
}

const fn default_cache_capacity() -> u64 {
    10_000
}
