use std::time::Duration;

use mini_moka::sync::Cache;

use crate::types::TierDecision;

/// Short-lived cache of tier decisions keyed by user id
///
/// Keeps the resolver from hitting the subscription and credits tables on
/// every request; entries expire on their own, nothing invalidates them.
#[derive(Debug, Clone)]
pub struct TierCache {
    cache: Cache<String, TierDecision>,
}

impl TierCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<TierDecision> {
        self.cache.get(&user_id.to_owned())
    }

    pub fn insert(&self, user_id: &str, decision: TierDecision) {
        self.cache.insert(user_id.to_owned(), decision);
    }
}
