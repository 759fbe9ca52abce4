use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::provider::{GenerationProvider, GenerationRequest, ProviderError, TokenStream};

/// OpenAI-compatible streaming chat completion provider
///
/// Works against any backend speaking the `/chat/completions` SSE dialect.
/// The request timeout bounds the whole stream; a stalled provider turns
/// into a stream error, which the relay treats like any other failure.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
}

impl OpenAiProvider {
    /// Create a provider client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        model: String,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::new(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

fn build_body<'a>(model: &'a str, request: &'a GenerationRequest) -> ChatRequest<'a> {
    let content = if request.images.is_empty() {
        MessageContent::Text(&request.prompt)
    } else {
        let mut parts = vec![ContentPart::Text {
            text: &request.prompt,
        }];
        parts.extend(request.images.iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        }));
        MessageContent::Parts(parts)
    };

    ChatRequest {
        model,
        stream: true,
        messages: vec![ChatMessage {
            role: "user",
            content,
        }],
    }
}

enum SseItem {
    Token(Bytes),
    Done,
    Skip,
    Fail(ProviderError),
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<TokenStream, ProviderError> {
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| ProviderError::new(format!("invalid provider URL: {e}")))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&build_body(&self.model, request))
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("provider request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(format!(
                "provider returned {status}: {body}"
            )));
        }

        let events = response.bytes_stream().eventsource();
        let tokens = events
            .map(|result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == "[DONE]" {
                        return SseItem::Done;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            .filter(|text| !text.is_empty())
                            .map_or(SseItem::Skip, |text| SseItem::Token(Bytes::from(text))),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                            SseItem::Skip
                        }
                    }
                }
                Err(e) => SseItem::Fail(ProviderError::new(format!("stream error: {e}"))),
            })
            .take_while(|item| std::future::ready(!matches!(item, SseItem::Done)))
            .filter_map(|item| {
                std::future::ready(match item {
                    SseItem::Token(bytes) => Some(Ok(bytes)),
                    SseItem::Fail(error) => Some(Err(error)),
                    SseItem::Skip | SseItem::Done => None,
                })
            });

        Ok(Box::pin(tokens))
    }
}
