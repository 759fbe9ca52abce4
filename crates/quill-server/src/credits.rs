use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use jiff::Timestamp;
use serde::Serialize;

use quill_core::Identity;
use quill_llm::RelayError;

use crate::error::{RequestError, error_response};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditsResponse {
    ok: bool,
    credits: f64,
    tier: &'static str,
    trial_ends_at: Option<Timestamp>,
}

/// `GET /v1/credits` — the caller's balance and tier
///
/// Requires a verified identity; runs the provisioning state machine so a
/// first-time caller sees their trial balance immediately.
pub async fn credits_handler(
    State(state): State<AppState>,
    identity: Option<axum::Extension<Identity>>,
) -> Response {
    let Some(axum::Extension(identity)) = identity else {
        return error_response(&RequestError::AuthRequired);
    };

    match state.resolver.ensure_credits(&identity).await {
        Ok(snapshot) => Json(CreditsResponse {
            ok: true,
            credits: snapshot.credits,
            tier: snapshot.tier.as_str(),
            trial_ends_at: snapshot.trial_ends_at,
        })
        .into_response(),
        Err(error) => {
            tracing::warn!(user_id = %identity.user_id, %error, "credit lookup failed");
            error_response(&RelayError::CreditsUnavailable)
        }
    }
}
