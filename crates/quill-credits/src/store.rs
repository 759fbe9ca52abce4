use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{CreditsPatch, CreditsRow, SubscriptionStatus};

/// Row-level access to `user_credits` and `subscriptions`
///
/// Point queries only; implementations are [`RestStore`](crate::RestStore)
/// in production and [`MemoryStore`] in tests.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Fetch the credits row for a user, if one exists
    async fn fetch_credits(&self, user_id: &str) -> Result<Option<CreditsRow>, StoreError>;

    /// Insert a fresh credits row
    async fn insert_credits(&self, user_id: &str, row: &CreditsRow) -> Result<(), StoreError>;

    /// Apply a partial update to an existing credits row
    async fn update_credits(&self, user_id: &str, patch: &CreditsPatch) -> Result<(), StoreError>;

    /// Latest subscription status for a user, if any subscription exists
    async fn latest_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionStatus>, StoreError>;
}

/// In-memory store for tests and embedded use
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    credits: HashMap<String, CreditsRow>,
    subscriptions: HashMap<String, SubscriptionStatus>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a credits row
    pub fn put_row(&self, user_id: &str, row: CreditsRow) {
        self.inner
            .lock()
            .expect("memory store lock")
            .credits
            .insert(user_id.to_owned(), row);
    }

    /// Read a credits row back out
    pub fn row(&self, user_id: &str) -> Option<CreditsRow> {
        self.inner
            .lock()
            .expect("memory store lock")
            .credits
            .get(user_id)
            .cloned()
    }

    /// Seed a subscription status
    pub fn put_subscription(&self, user_id: &str, status: SubscriptionStatus) {
        self.inner
            .lock()
            .expect("memory store lock")
            .subscriptions
            .insert(user_id.to_owned(), status);
    }

    /// Make every operation fail, simulating an unreachable store
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().expect("memory store lock").fail = unavailable;
    }

    fn check_available(inner: &MemoryInner) -> Result<(), StoreError> {
        if inner.fail {
            return Err(StoreError::Api {
                status: 503,
                message: "store unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn fetch_credits(&self, user_id: &str) -> Result<Option<CreditsRow>, StoreError> {
        let inner = self.inner.lock().expect("memory store lock");
        Self::check_available(&inner)?;
        Ok(inner.credits.get(user_id).cloned())
    }

    async fn insert_credits(&self, user_id: &str, row: &CreditsRow) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock");
        Self::check_available(&inner)?;
        inner.credits.insert(user_id.to_owned(), row.clone());
        Ok(())
    }

    async fn update_credits(&self, user_id: &str, patch: &CreditsPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock");
        Self::check_available(&inner)?;
        let Some(row) = inner.credits.get_mut(user_id) else {
            return Err(StoreError::Api {
                status: 404,
                message: format!("no credits row for {user_id}"),
            });
        };
        if let Some(credits) = patch.credits {
            row.credits = credits;
        }
        if let Some(stamp) = patch.last_refilled_at {
            row.last_refilled_at = Some(stamp);
        }
        if patch.clear_trial {
            row.trial_started_at = None;
            row.trial_ends_at = None;
        }
        Ok(())
    }

    async fn latest_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionStatus>, StoreError> {
        let inner = self.inner.lock().expect("memory store lock");
        Self::check_available(&inner)?;
        Ok(inner.subscriptions.get(user_id).copied())
    }
}
