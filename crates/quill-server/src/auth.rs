use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use quill_auth::IdentityVerifier;
use quill_core::Identity;

/// Attach a verified [`Identity`] to the request, when one exists
///
/// Identity is optional everywhere except the credits endpoint: an absent,
/// invalid, or unverifiable bearer token leaves the request anonymous and
/// generation proceeds at the smallest budget tier. Only a verified token
/// yields an `Identity` extension.
pub async fn identity_middleware(
    verifier: IdentityVerifier,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        match verifier.verify(&token).await {
            Ok(Some(user_id)) => {
                request.extensions_mut().insert(Identity { user_id });
            }
            Ok(None) => {
                tracing::debug!("bearer token did not verify, continuing anonymously");
            }
            Err(error) => {
                tracing::warn!(%error, "identity provider unreachable, continuing anonymously");
            }
        }
    }

    next.run(request).await
}
