use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;

use crate::error::StoreError;
use crate::store::CreditStore;
use crate::types::{CreditsPatch, CreditsRow, SubscriptionStatus};

const CREDITS_COLUMNS: &str = "credits,last_refilled_at,trial_started_at,trial_ends_at";

/// PostgREST-backed credit store
///
/// Talks to `rest/v1/user_credits` and `rest/v1/subscriptions` with the
/// service key, so row-level security is bypassed; every query is a point
/// query keyed on `user_id`.
#[derive(Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: Url,
    service_key: SecretString,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestStore {
    /// Create a new store client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: Url, service_key: SecretString) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(StoreError::Request)?;

        Ok(Self {
            http,
            base_url,
            service_key,
        })
    }

    fn endpoint(&self, table: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| StoreError::Api {
                status: 0,
                message: format!("invalid URL: {e}"),
            })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
    }

    async fn error_from(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Api { status, message }
    }
}

#[async_trait]
impl CreditStore for RestStore {
    async fn fetch_credits(&self, user_id: &str) -> Result<Option<CreditsRow>, StoreError> {
        let url = self.endpoint("user_credits")?;
        let response = self
            .authed(self.http.get(url).query(&[
                ("user_id", format!("eq.{user_id}").as_str()),
                ("select", CREDITS_COLUMNS),
                ("limit", "1"),
            ]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let mut rows: Vec<CreditsRow> = response.json().await?;
        Ok(rows.pop())
    }

    async fn insert_credits(&self, user_id: &str, row: &CreditsRow) -> Result<(), StoreError> {
        let url = self.endpoint("user_credits")?;
        let body = json!({
            "user_id": user_id,
            "credits": row.credits,
            "last_refilled_at": row.last_refilled_at,
            "trial_started_at": row.trial_started_at,
            "trial_ends_at": row.trial_ends_at,
        });

        let response = self
            .authed(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn update_credits(&self, user_id: &str, patch: &CreditsPatch) -> Result<(), StoreError> {
        let url = self.endpoint("user_credits")?;

        let mut body = serde_json::Map::new();
        if let Some(credits) = patch.credits {
            body.insert("credits".to_owned(), json!(credits));
        }
        if let Some(stamp) = patch.last_refilled_at {
            body.insert("last_refilled_at".to_owned(), json!(stamp));
        }
        if patch.clear_trial {
            body.insert("trial_started_at".to_owned(), Value::Null);
            body.insert("trial_ends_at".to_owned(), Value::Null);
        }

        let response = self
            .authed(
                self.http
                    .patch(url)
                    .query(&[("user_id", format!("eq.{user_id}"))]),
            )
            .header("Prefer", "return=minimal")
            .json(&Value::Object(body))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn latest_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionStatus>, StoreError> {
        let url = self.endpoint("subscriptions")?;
        let response = self
            .authed(self.http.get(url).query(&[
                ("user_id", format!("eq.{user_id}").as_str()),
                ("select", "status"),
                ("order", "updated_at.desc"),
                ("limit", "1"),
            ]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        #[derive(serde::Deserialize)]
        struct StatusRow {
            status: SubscriptionStatus,
        }

        let mut rows: Vec<StatusRow> = response.json().await?;
        Ok(rows.pop().map(|row| row.status))
    }
}
