use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Relational store holding `user_credits` and `subscriptions` rows
///
/// Accessed over its REST surface with point queries only; the schema is
/// owned by the payment/webhook side and read-mostly here.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Base URL of the store's REST API
    pub base_url: Url,
    /// Service role key used for row-level access
    pub service_key: SecretString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_store_config() {
        let toml = r#"
            base_url = "https://db.example.com/"
            service_key = "svc-key-123"
        "#;

        let config: StoreConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url.as_str(), "https://db.example.com/");
    }
}
