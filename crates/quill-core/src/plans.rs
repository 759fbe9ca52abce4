//! Plan constants and cost arithmetic shared by the ledger, the budget
//! allocator, and the streaming relay

use serde::{Deserialize, Serialize};

/// Input characters covered by one credit of work
pub const CHARS_PER_CREDIT: f64 = 3800.0;

/// Flat monthly allotment for free-tier users, refilled per UTC calendar month
pub const FREE_MONTHLY_CREDITS: f64 = 100.0;

/// Credit volume granted by the one-time reverse trial
pub const TRIAL_CREDITS: f64 = 300.0;

/// Reverse trial duration in days
pub const TRIAL_DURATION_DAYS: i64 = 7;

/// Minimum charge when any images are attached
pub const IMAGE_MINIMUM_CREDITS: f64 = 0.5;

/// Minimum charge for a prompt-text-only request
pub const PROMPT_ONLY_MINIMUM_CREDITS: f64 = 1.0;

/// Entitlement class of a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// No identity presented
    NonAuth,
    /// Identified user without a subscription or active trial
    Free,
    /// Identified user inside the reverse-trial window
    Trial,
    /// Identified user with a paid-like subscription status
    Paid,
}

impl Tier {
    /// Cumulative character budget for document ingestion
    ///
    /// Fixed multiples of [`CHARS_PER_CREDIT`]: 1 credit for anonymous
    /// callers, 32 for free users, 320 for trial and paid users.
    pub const fn max_chars(self) -> usize {
        match self {
            Self::NonAuth => 3_800,
            Self::Free => 121_600,
            Self::Trial | Self::Paid => 1_216_000,
        }
    }

    /// Label used in API responses and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonAuth => "non-auth",
            Self::Free => "free",
            Self::Trial => "trial",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the credit cost of one generation request
///
/// `raw_chars` counts only billable source characters: allocated file text
/// for document requests, or the prompt itself for prompt-only requests.
/// Costs are fractional; the image and prompt-only minimums floor the
/// result, and the final value is rounded to 3 decimal places.
pub fn cost_for(raw_chars: usize, has_images: bool, prompt_only: bool) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let mut credits = if raw_chars > 0 {
        raw_chars as f64 / CHARS_PER_CREDIT
    } else {
        0.0
    };

    if has_images && credits < IMAGE_MINIMUM_CREDITS {
        credits = IMAGE_MINIMUM_CREDITS;
    }
    if prompt_only && !has_images && credits < PROMPT_ONLY_MINIMUM_CREDITS {
        credits = PROMPT_ONLY_MINIMUM_CREDITS;
    }

    (credits * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_budgets_are_credit_multiples() {
        assert_eq!(Tier::NonAuth.max_chars(), 3_800);
        assert_eq!(Tier::Free.max_chars(), 121_600);
        assert_eq!(Tier::Trial.max_chars(), Tier::Paid.max_chars());
    }

    #[test]
    fn file_cost_is_proportional() {
        let cost = cost_for(10_000, false, false);
        assert!((cost - 2.632).abs() < 1e-9);
    }

    #[test]
    fn prompt_only_minimum_applies() {
        assert!((cost_for(500, false, true) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn image_minimum_applies_when_text_is_tiny() {
        assert!((cost_for(0, true, false) - 0.5).abs() < f64::EPSILON);
        assert!((cost_for(100, true, false) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn image_minimum_does_not_lower_a_larger_cost() {
        let cost = cost_for(38_000, true, false);
        assert!((cost - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_request_costs_nothing() {
        assert!((cost_for(0, false, false)).abs() < f64::EPSILON);
    }

    #[test]
    fn tier_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Tier::NonAuth).unwrap(), "\"non-auth\"");
        assert_eq!(serde_json::to_string(&Tier::Paid).unwrap(), "\"paid\"");
    }
}
