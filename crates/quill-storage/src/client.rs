use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::StorageError;

/// Delete-only client for the blob storage collaborator
///
/// Staged uploads live under `bucket/object-path`; the only operation this
/// core needs is removing them once a generation run has consumed them.
#[derive(Clone)]
pub struct BlobClient {
    http: reqwest::Client,
    base_url: Url,
    service_key: SecretString,
}

impl BlobClient {
    /// Create a new storage client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: Url, service_key: SecretString) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(StorageError::Request)?;

        Ok(Self {
            http,
            base_url,
            service_key,
        })
    }

    /// Delete one staged object by its `bucket/object-path` reference
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        if !path.contains('/') {
            return Err(StorageError::InvalidPath(path.to_owned()));
        }

        let url = self
            .base_url
            .join(&format!("storage/v1/object/{path}"))
            .map_err(|e| StorageError::Api {
                status: 0,
                message: format!("invalid URL: {e}"),
            })?;

        let response = self
            .http
            .delete(url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(StorageError::Api { status, message })
        }
    }
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
