use serde::Deserialize;

/// Credit and entitlement tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditsConfig {
    /// TTL in seconds for cached tier decisions
    #[serde(default = "default_tier_cache_ttl_secs")]
    pub tier_cache_ttl_secs: u64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            tier_cache_ttl_secs: default_tier_cache_ttl_secs(),
        }
    }
}

const fn default_tier_cache_ttl_secs() -> u64 {
    300
}
