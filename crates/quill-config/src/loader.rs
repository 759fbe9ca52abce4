use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if required secrets are empty or timeouts are zero
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.store.service_key.expose_secret().is_empty() {
            anyhow::bail!("store.service_key must not be empty");
        }
        if self.auth.service_key.expose_secret().is_empty() {
            anyhow::bail!("auth.service_key must not be empty");
        }
        if self.llm.api_key.expose_secret().is_empty() {
            anyhow::bail!("llm.api_key must not be empty");
        }
        if self.llm.model.is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }
        if self.llm.request_timeout_secs == 0 {
            anyhow::bail!("llm.request_timeout_secs must be greater than 0");
        }
        if self.auth.cache_ttl_seconds == 0 {
            anyhow::bail!("auth.cache_ttl_seconds must be greater than 0");
        }
        if self.credits.tier_cache_ttl_secs == 0 {
            anyhow::bail!("credits.tier_cache_ttl_secs must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [store]
            base_url = "https://db.example.com/"
            service_key = "db-key"

            [auth]
            base_url = "https://auth.example.com/"
            service_key = "auth-key"

            [llm]
            base_url = "https://llm.example.com/v1/"
            api_key = "sk-test"
            model = "quick-v1"
        "#
    }

    #[test]
    fn minimal_config_is_valid() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.storage.is_none());
        assert_eq!(config.credits.tier_cache_ttl_secs, 300);
    }

    #[test]
    fn empty_api_key_fails_validation() {
        let toml = minimal_toml().replace("api_key = \"sk-test\"", "api_key = \"\"");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = format!("{}\n[unknown]\nfoo = 1\n", minimal_toml());
        assert!(toml::from_str::<Config>(&toml).is_err());
    }
}
