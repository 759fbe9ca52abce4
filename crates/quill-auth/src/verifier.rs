use std::fmt::Write as _;
use std::time::Duration;

use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::AuthError;

/// User record returned by the identity provider
#[derive(Debug, Clone, Deserialize)]
struct UserRecord {
    id: String,
}

/// Verifies bearer tokens against the identity provider, with caching
///
/// A token either maps to a user id or to nothing; invalid and expired
/// tokens are treated as anonymous rather than rejected, since the
/// generation surface is open to unauthenticated callers.
#[derive(Clone)]
pub struct IdentityVerifier {
    http: reqwest::Client,
    base_url: url::Url,
    service_key: SecretString,
    cache: Cache<String, Option<String>>,
}

impl IdentityVerifier {
    /// Create a new verifier
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        base_url: url::Url,
        service_key: SecretString,
        cache_ttl: Duration,
        cache_capacity: u64,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(cache_capacity)
            .build();

        Ok(Self {
            http,
            base_url,
            service_key,
            cache,
        })
    }

    /// Resolve a bearer token to a user id
    ///
    /// Returns `None` for unknown, expired, or malformed tokens. Results
    /// (including negative ones) are cached for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` only when the identity provider is unreachable
    /// or answers with an unexpected status
    pub async fn verify(&self, token: &str) -> Result<Option<String>, AuthError> {
        let cache_key = sha256_hex(token);

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let url = self.base_url.join("auth/v1/user").map_err(|e| AuthError::Api {
            status: 0,
            message: format!("invalid URL: {e}"),
        })?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("apikey", self.service_key.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status.is_client_error() {
            self.cache.insert(cache_key, None);
            return Ok(None);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let user: UserRecord = response.json().await.map_err(|e| AuthError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;

        let resolved = Some(user.id);
        self.cache.insert(cache_key, resolved.clone());

        Ok(resolved)
    }
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Compute the SHA-256 hex digest of a string
fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_verifier(base_url: &str) -> IdentityVerifier {
        IdentityVerifier::new(
            url::Url::parse(base_url).unwrap(),
            SecretString::from("svc-key".to_owned()),
            Duration::from_secs(60),
            100,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_resolves_user_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("apikey", "svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "usr_123",
                "email": "a@example.com"
            })))
            .mount(&server)
            .await;

        let verifier = test_verifier(&format!("{}/", server.uri()));
        let result = verifier.verify("tok-1").await.unwrap();
        assert_eq!(result.as_deref(), Some("usr_123"));
    }

    #[tokio::test]
    async fn invalid_token_is_anonymous() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let verifier = test_verifier(&format!("{}/", server.uri()));
        let result = verifier.verify("bogus").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn verification_is_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "usr_123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = test_verifier(&format!("{}/", server.uri()));
        let first = verifier.verify("tok-1").await.unwrap();
        let second = verifier.verify("tok-1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn server_error_surfaces() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let verifier = test_verifier(&format!("{}/", server.uri()));
        let err = verifier.verify("tok-1").await.unwrap_err();
        assert!(matches!(err, AuthError::Api { status: 500, .. }));
    }
}
