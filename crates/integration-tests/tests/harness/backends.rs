//! Mocked collaborator services: identity provider, credit store, and the
//! generation provider

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One mock server per collaborator Quill talks to
pub struct Backends {
    pub auth: MockServer,
    pub store: MockServer,
    pub llm: MockServer,
}

impl Backends {
    /// Start all three mock collaborators
    pub async fn start() -> Self {
        Self {
            auth: MockServer::start().await,
            store: MockServer::start().await,
            llm: MockServer::start().await,
        }
    }

    /// Make the identity provider resolve `token` to `user_id`
    pub async fn verify_token(&self, token: &str, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {token}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user_id })))
            .mount(&self.auth)
            .await;
    }

    /// Serve a `user_credits` row for `user_id`
    pub async fn credits_row(&self, user_id: &str, row: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_credits"))
            .and(query_param("user_id", format!("eq.{user_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
            .mount(&self.store)
            .await;
    }

    /// Serve an empty `user_credits` result for `user_id`
    pub async fn no_credits_row(&self, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_credits"))
            .and(query_param("user_id", format!("eq.{user_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&self.store)
            .await;
    }

    /// Serve no subscription rows for `user_id`
    pub async fn no_subscription(&self, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/subscriptions"))
            .and(query_param("user_id", format!("eq.{user_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&self.store)
            .await;
    }

    /// Serve the latest subscription status for `user_id`
    pub async fn subscription(&self, user_id: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/subscriptions"))
            .and(query_param("user_id", format!("eq.{user_id}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "status": status }])),
            )
            .mount(&self.store)
            .await;
    }

    /// Accept all balance writes (inserts and updates) against the store
    pub async fn accept_credit_writes(&self) {
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/user_credits"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.store)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_credits"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&self.store)
            .await;
    }

    /// Make the generation provider stream the given tokens and finish
    pub async fn stream_tokens(&self, tokens: &[&str]) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(tokens)),
            )
            .mount(&self.llm)
            .await;
    }

    /// Make the generation provider fail every open with `status`
    pub async fn llm_failure(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.to_owned()))
            .mount(&self.llm)
            .await;
    }

    /// Number of balance update requests the store has seen
    pub async fn balance_writes(&self) -> usize {
        self.store
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "PATCH" && r.url.path() == "/rest/v1/user_credits")
            .count()
    }

    /// Number of row insert requests the store has seen
    pub async fn row_inserts(&self) -> usize {
        self.store
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/user_credits")
            .count()
    }

    /// Number of generation requests the provider has seen
    pub async fn generation_requests(&self) -> usize {
        self.llm
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/v1/chat/completions")
            .count()
    }
}

/// Build an SSE chat-completions body from content tokens
pub fn sse_body(tokens: &[&str]) -> String {
    let mut body = String::new();
    for token in tokens {
        let chunk = json!({
            "choices": [{ "delta": { "content": token } }]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
