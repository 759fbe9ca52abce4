use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Generation provider configuration
///
/// The provider is any OpenAI-compatible chat-completions endpoint; Quill
/// treats it as an opaque streaming token source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API
    pub base_url: Url,
    /// API key for the provider
    pub api_key: SecretString,
    /// Model identifier passed through on every request
    pub model: String,
    /// Upper bound on a single provider call, in seconds
    ///
    /// Streams still running at the deadline are treated as failed for
    /// refund purposes.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    300
}
