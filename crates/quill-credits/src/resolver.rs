use std::sync::Arc;
use std::time::Duration;

use jiff::{Timestamp, ToSpan, tz::TimeZone};
use tracing::warn;

use quill_core::plans::{FREE_MONTHLY_CREDITS, TRIAL_CREDITS, TRIAL_DURATION_DAYS};
use quill_core::{Identity, Tier};

use crate::error::StoreError;
use crate::store::CreditStore;
use crate::tier_cache::TierCache;
use crate::types::{CreditSnapshot, CreditsPatch, CreditsRow, SubscriptionStatus, TierDecision};

/// Tier resolution and lazy credit provisioning
///
/// Decides a caller's tier from the latest subscription status and the
/// trial timestamps on their credits row, and runs the provisioning state
/// machine (first-call reverse trial, one-time trial downgrade, monthly
/// free refill). Paid users skip the state machine entirely; their balance
/// is replenished out-of-band by subscription event handling.
#[derive(Clone)]
pub struct EntitlementResolver {
    store: Arc<dyn CreditStore>,
    cache: TierCache,
}

impl EntitlementResolver {
    pub fn new(store: Arc<dyn CreditStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: TierCache::new(cache_ttl, 10_000),
        }
    }

    /// Resolve the active tier for an optional identity
    ///
    /// Never fails: store errors degrade to the free tier so a flaky
    /// backing store cannot block generation.
    pub async fn resolve_tier(&self, identity: Option<&Identity>) -> TierDecision {
        self.resolve_tier_at(identity, Timestamp::now()).await
    }

    /// [`resolve_tier`](Self::resolve_tier) with an explicit clock
    pub async fn resolve_tier_at(
        &self,
        identity: Option<&Identity>,
        now: Timestamp,
    ) -> TierDecision {
        let Some(identity) = identity else {
            return TierDecision {
                tier: Tier::NonAuth,
                trial_ends_at: None,
            };
        };

        if let Some(decision) = self.cache.get(&identity.user_id) {
            return decision;
        }

        let decision = match self.classify(&identity.user_id, now).await {
            Ok(decision) => decision,
            Err(error) => {
                warn!(user_id = %identity.user_id, %error, "tier lookup failed, defaulting to free");
                return TierDecision {
                    tier: Tier::Free,
                    trial_ends_at: None,
                };
            }
        };

        self.cache.insert(&identity.user_id, decision.clone());
        decision
    }

    async fn classify(&self, user_id: &str, now: Timestamp) -> Result<TierDecision, StoreError> {
        let status = self.store.latest_subscription_status(user_id).await?;
        if status.is_some_and(SubscriptionStatus::is_paid_like) {
            return Ok(TierDecision {
                tier: Tier::Paid,
                trial_ends_at: None,
            });
        }

        let row = self.store.fetch_credits(user_id).await?;
        let trial_ends_at = row.and_then(|row| row.trial_ends_at);
        match trial_ends_at {
            Some(ends_at) if ends_at > now => Ok(TierDecision {
                tier: Tier::Trial,
                trial_ends_at: Some(ends_at),
            }),
            _ => Ok(TierDecision {
                tier: Tier::Free,
                trial_ends_at: None,
            }),
        }
    }

    /// Ensure a credits row exists and is current, returning the balance
    ///
    /// Runs the provisioning state machine for non-paid users. Paid users
    /// short-circuit to a plain balance read.
    pub async fn ensure_credits(&self, identity: &Identity) -> Result<CreditSnapshot, StoreError> {
        self.ensure_credits_at(identity, Timestamp::now()).await
    }

    /// [`ensure_credits`](Self::ensure_credits) with an explicit clock
    pub async fn ensure_credits_at(
        &self,
        identity: &Identity,
        now: Timestamp,
    ) -> Result<CreditSnapshot, StoreError> {
        let user_id = identity.user_id.as_str();

        let status = self.store.latest_subscription_status(user_id).await?;
        if status.is_some_and(SubscriptionStatus::is_paid_like) {
            let credits = self
                .store
                .fetch_credits(user_id)
                .await?
                .map_or(0.0, |row| row.credits);
            return Ok(CreditSnapshot {
                credits,
                tier: Tier::Paid,
                trial_ends_at: None,
            });
        }

        let Some(row) = self.store.fetch_credits(user_id).await? else {
            return self.provision_trial(user_id, now).await;
        };

        match row.trial_ends_at {
            Some(ends_at) if ends_at > now => Ok(CreditSnapshot {
                credits: row.credits,
                tier: Tier::Trial,
                trial_ends_at: Some(ends_at),
            }),
            Some(_) => self.downgrade_trial(user_id, now).await,
            None => self.refill_if_due(user_id, &row, now).await,
        }
    }

    /// `no-row -> trial-active`: first-ever call starts the reverse trial
    async fn provision_trial(
        &self,
        user_id: &str,
        now: Timestamp,
    ) -> Result<CreditSnapshot, StoreError> {
        // jiff refuses calendar units on a Timestamp, so the trial window
        // is a fixed number of 24-hour days
        let ends_at = now.checked_add((TRIAL_DURATION_DAYS * 24).hours()).map_err(|e| {
            StoreError::Api {
                status: 0,
                message: format!("trial end out of range: {e}"),
            }
        })?;

        let row = CreditsRow {
            credits: TRIAL_CREDITS,
            last_refilled_at: Some(now),
            trial_started_at: Some(now),
            trial_ends_at: Some(ends_at),
        };
        self.store.insert_credits(user_id, &row).await?;

        Ok(CreditSnapshot {
            credits: TRIAL_CREDITS,
            tier: Tier::Trial,
            trial_ends_at: Some(ends_at),
        })
    }

    /// `trial-expired -> free-steady`: one-time downgrade, idempotent
    /// because clearing the timestamps removes this branch from later calls
    async fn downgrade_trial(
        &self,
        user_id: &str,
        now: Timestamp,
    ) -> Result<CreditSnapshot, StoreError> {
        let patch = CreditsPatch {
            credits: Some(FREE_MONTHLY_CREDITS),
            last_refilled_at: Some(now),
            clear_trial: true,
        };
        self.store.update_credits(user_id, &patch).await?;

        Ok(CreditSnapshot {
            credits: FREE_MONTHLY_CREDITS,
            tier: Tier::Free,
            trial_ends_at: None,
        })
    }

    /// `free-steady -> free-steady`: refill once per UTC calendar month
    async fn refill_if_due(
        &self,
        user_id: &str,
        row: &CreditsRow,
        now: Timestamp,
    ) -> Result<CreditSnapshot, StoreError> {
        let due = row
            .last_refilled_at
            .is_none_or(|last| !same_utc_month(last, now));

        let credits = if due {
            let patch = CreditsPatch {
                credits: Some(FREE_MONTHLY_CREDITS),
                last_refilled_at: Some(now),
                clear_trial: false,
            };
            self.store.update_credits(user_id, &patch).await?;
            FREE_MONTHLY_CREDITS
        } else {
            row.credits
        };

        Ok(CreditSnapshot {
            credits,
            tier: Tier::Free,
            trial_ends_at: None,
        })
    }
}

impl std::fmt::Debug for EntitlementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementResolver").finish_non_exhaustive()
    }
}

fn same_utc_month(a: Timestamp, b: Timestamp) -> bool {
    let a = a.to_zoned(TimeZone::UTC);
    let b = b.to_zoned(TimeZone::UTC);
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    fn resolver(store: Arc<MemoryStore>) -> EntitlementResolver {
        EntitlementResolver::new(store, Duration::from_secs(300))
    }

    fn identity(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_owned(),
        }
    }

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn first_call_provisions_reverse_trial() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(Arc::clone(&store));
        let now = ts("2026-03-10T12:00:00Z");

        let snapshot = resolver
            .ensure_credits_at(&identity("u1"), now)
            .await
            .unwrap();

        assert_eq!(snapshot.tier, Tier::Trial);
        assert!((snapshot.credits - TRIAL_CREDITS).abs() < f64::EPSILON);
        assert_eq!(snapshot.trial_ends_at, Some(ts("2026-03-17T12:00:00Z")));

        let row = store.row("u1").unwrap();
        assert_eq!(row.trial_started_at, Some(now));
    }

    #[tokio::test]
    async fn active_trial_balance_is_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.put_row("u1", CreditsRow {
            credits: 123.5,
            last_refilled_at: Some(ts("2026-03-01T00:00:00Z")),
            trial_started_at: Some(ts("2026-03-01T00:00:00Z")),
            trial_ends_at: Some(ts("2026-03-08T00:00:00Z")),
        });
        let resolver = resolver(Arc::clone(&store));

        let snapshot = resolver
            .ensure_credits_at(&identity("u1"), ts("2026-03-05T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(snapshot.tier, Tier::Trial);
        assert!((snapshot.credits - 123.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn expired_trial_downgrades_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        store.put_row("u1", CreditsRow {
            credits: 250.0,
            last_refilled_at: Some(ts("2026-03-01T00:00:00Z")),
            trial_started_at: Some(ts("2026-03-01T00:00:00Z")),
            trial_ends_at: Some(ts("2026-03-08T00:00:00Z")),
        });
        let resolver = resolver(Arc::clone(&store));
        let now = ts("2026-03-09T00:00:00Z");

        let snapshot = resolver.ensure_credits_at(&identity("u1"), now).await.unwrap();
        assert_eq!(snapshot.tier, Tier::Free);
        assert!((snapshot.credits - FREE_MONTHLY_CREDITS).abs() < f64::EPSILON);

        // trial timestamps are gone, so a later call takes the refill path
        // and leaves the (spent-down) balance alone within the month
        store
            .update_credits("u1", &CreditsPatch::balance(40.0))
            .await
            .unwrap();
        let again = resolver.ensure_credits_at(&identity("u1"), now).await.unwrap();
        assert!((again.credits - 40.0).abs() < f64::EPSILON);
        assert!(store.row("u1").unwrap().trial_ends_at.is_none());
    }

    #[tokio::test]
    async fn refill_triggers_on_month_boundary_only() {
        let store = Arc::new(MemoryStore::new());
        store.put_row("u1", CreditsRow {
            credits: 3.0,
            last_refilled_at: Some(ts("2026-03-31T23:00:00Z")),
            trial_started_at: None,
            trial_ends_at: None,
        });
        let resolver = resolver(Arc::clone(&store));

        // same UTC month: no top-up, even near the boundary
        let snapshot = resolver
            .ensure_credits_at(&identity("u1"), ts("2026-03-31T23:59:00Z"))
            .await
            .unwrap();
        assert!((snapshot.credits - 3.0).abs() < f64::EPSILON);

        // next month: reset to the flat allotment
        let snapshot = resolver
            .ensure_credits_at(&identity("u1"), ts("2026-04-01T00:01:00Z"))
            .await
            .unwrap();
        assert!((snapshot.credits - FREE_MONTHLY_CREDITS).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn paid_subscription_short_circuits_state_machine() {
        let store = Arc::new(MemoryStore::new());
        store.put_subscription("u1", SubscriptionStatus::PastDue);
        store.put_row("u1", CreditsRow {
            credits: 9000.0,
            last_refilled_at: None,
            trial_started_at: Some(ts("2026-01-01T00:00:00Z")),
            trial_ends_at: Some(ts("2026-01-08T00:00:00Z")),
        });
        let resolver = resolver(Arc::clone(&store));

        // expired trial timestamps present, but the paid path ignores them
        let snapshot = resolver
            .ensure_credits_at(&identity("u1"), ts("2026-06-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(snapshot.tier, Tier::Paid);
        assert!((snapshot.credits - 9000.0).abs() < f64::EPSILON);
        assert!(store.row("u1").unwrap().trial_ends_at.is_some());
    }

    #[tokio::test]
    async fn anonymous_resolves_to_non_auth() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(store);
        let decision = resolver.resolve_tier(None).await;
        assert_eq!(decision.tier, Tier::NonAuth);
    }

    #[tokio::test]
    async fn tier_lookup_failure_degrades_to_free() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let resolver = resolver(store);

        let decision = resolver.resolve_tier(Some(&identity("u1"))).await;
        assert_eq!(decision.tier, Tier::Free);
    }

    #[tokio::test]
    async fn tier_decision_is_cached() {
        let store = Arc::new(MemoryStore::new());
        store.put_subscription("u1", SubscriptionStatus::Active);
        let resolver = resolver(Arc::clone(&store));

        let first = resolver.resolve_tier(Some(&identity("u1"))).await;
        assert_eq!(first.tier, Tier::Paid);

        // cancel the subscription; the cached decision still wins
        store.put_subscription("u1", SubscriptionStatus::Canceled);
        let second = resolver.resolve_tier(Some(&identity("u1"))).await;
        assert_eq!(second.tier, Tier::Paid);
    }
}
