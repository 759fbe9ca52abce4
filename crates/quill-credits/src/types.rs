use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use quill_core::Tier;

/// One `user_credits` row
///
/// The trial timestamps are present only while a reverse trial is active;
/// the downgrade transition clears both atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditsRow {
    /// Current balance; fractional, and not clamped at zero by the ledger
    pub credits: f64,
    /// Last monthly refill instant
    #[serde(default)]
    pub last_refilled_at: Option<Timestamp>,
    /// Reverse trial start, set together with `trial_ends_at`
    #[serde(default)]
    pub trial_started_at: Option<Timestamp>,
    /// Reverse trial end; in the past means the downgrade is still pending
    #[serde(default)]
    pub trial_ends_at: Option<Timestamp>,
}

/// Partial update to a `user_credits` row
///
/// Only set fields are written; `clear_trial` writes explicit nulls over
/// both trial timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditsPatch {
    /// New balance
    pub credits: Option<f64>,
    /// New refill stamp
    pub last_refilled_at: Option<Timestamp>,
    /// Null out both trial timestamps
    pub clear_trial: bool,
}

impl CreditsPatch {
    /// Patch that only moves the balance
    pub const fn balance(credits: f64) -> Self {
        Self {
            credits: Some(credits),
            last_refilled_at: None,
            clear_trial: false,
        }
    }
}

/// Subscription status reported by the payment collaborator
///
/// Quill never writes subscription rows; it only classifies the latest
/// status into paid-like or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether this status grants the paid tier
    pub const fn is_paid_like(self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

/// Tier decision computed per request and cached briefly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierDecision {
    /// Active tier
    pub tier: Tier,
    /// Trial end, present only while a reverse trial is active
    pub trial_ends_at: Option<Timestamp>,
}

/// Result of `ensure_credits`: the balance after any provisioning or refill
#[derive(Debug, Clone, PartialEq)]
pub struct CreditSnapshot {
    /// Balance after the state machine ran
    pub credits: f64,
    /// Tier the balance belongs to
    pub tier: Tier,
    /// Trial end, present only while a reverse trial is active
    pub trial_ends_at: Option<Timestamp>,
}
