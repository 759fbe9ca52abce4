use http::StatusCode;
use thiserror::Error;

use quill_core::HttpError;

use crate::classify::{UpstreamKind, classify};
use crate::provider::ProviderError;

/// Errors that abort a metered generation before or instead of streaming
#[derive(Debug, Error)]
pub enum RelayError {
    /// Balance check failed because the credit store is unreachable
    #[error("credits service unavailable")]
    CreditsUnavailable,

    /// Balance cannot cover the computed cost
    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientCredits {
        /// Credits the request costs
        needed: f64,
        /// Balance observed at check time
        available: f64,
    },

    /// Balance covered the cost but the debit write failed
    #[error("credit deduction failed")]
    DeductionFailed,

    /// Provider call failed; classified from the failure text
    #[error("upstream failure: {message}")]
    Upstream {
        /// Classified failure kind
        kind: UpstreamKind,
        /// Raw provider failure text
        message: String,
    },
}

impl RelayError {
    /// Wrap a provider failure, classifying its message
    pub fn from_provider(error: &ProviderError) -> Self {
        let message = error.to_string();
        Self::Upstream {
            kind: classify(&message),
            message,
        }
    }
}

impl HttpError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CreditsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::DeductionFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { kind, .. } => match kind {
                UpstreamKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                UpstreamKind::AuthFailed | UpstreamKind::Unavailable => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                UpstreamKind::BadRequest => StatusCode::BAD_REQUEST,
                UpstreamKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                UpstreamKind::Other => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CreditsUnavailable => "CREDITS_SERVICE_ERROR",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::DeductionFailed => "CREDIT_DEDUCTION_ERROR",
            Self::Upstream { kind, .. } => match kind {
                UpstreamKind::RateLimited => "UPSTREAM_RATE_LIMITED",
                UpstreamKind::AuthFailed => "UPSTREAM_AUTH_ERROR",
                UpstreamKind::BadRequest => "UPSTREAM_BAD_REQUEST",
                UpstreamKind::PayloadTooLarge => "UPSTREAM_PAYLOAD_TOO_LARGE",
                UpstreamKind::Unavailable => "UPSTREAM_UNAVAILABLE",
                UpstreamKind::Other => "UPSTREAM_ERROR",
            },
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::CreditsUnavailable => "Credits service unavailable",
            Self::InsufficientCredits { .. } => "Insufficient credits",
            Self::DeductionFailed => "Credit deduction failed",
            Self::Upstream { .. } => "Generation service error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::CreditsUnavailable => {
                "Unable to check your credit balance. Please try again later.".to_owned()
            }
            Self::InsufficientCredits { needed, available } => format!(
                "You need {needed:.1} credits but only have {available:.1}. \
                 Please upload a smaller file or upgrade your plan."
            ),
            Self::DeductionFailed => {
                "Unable to reserve credits for this request. Please try again.".to_owned()
            }
            Self::Upstream { kind, .. } => match kind {
                UpstreamKind::RateLimited => {
                    "Service temporarily busy - rate limit exceeded".to_owned()
                }
                UpstreamKind::AuthFailed => "AI service authentication failed".to_owned(),
                UpstreamKind::BadRequest => "Invalid request format for AI service".to_owned(),
                UpstreamKind::PayloadTooLarge => {
                    "Content too large for AI service processing".to_owned()
                }
                UpstreamKind::Unavailable => "AI service temporarily unavailable".to_owned(),
                UpstreamKind::Other => "AI service request failed".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_statuses_follow_classification() {
        let rate_limited = RelayError::Upstream {
            kind: UpstreamKind::RateLimited,
            message: "429".to_owned(),
        };
        assert_eq!(rate_limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rate_limited.error_code(), "UPSTREAM_RATE_LIMITED");

        let auth = RelayError::Upstream {
            kind: UpstreamKind::AuthFailed,
            message: "401".to_owned(),
        };
        assert_eq!(auth.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn insufficient_credits_message_is_user_facing() {
        let error = RelayError::InsufficientCredits {
            needed: 2.632,
            available: 1.0,
        };
        assert_eq!(error.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert!(error.client_message().contains("2.6 credits"));
        assert!(error.client_message().contains("1.0"));
    }
}
