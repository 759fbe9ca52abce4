use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Blob storage holding staged user uploads
///
/// Quill only ever deletes objects by path, after a fully successful
/// generation. Optional: without it, cleanup is skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Base URL of the storage API
    pub base_url: Url,
    /// Service key for object deletion
    pub service_key: SecretString,
}
