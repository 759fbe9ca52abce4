use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LedgerError;
use crate::store::CreditStore;
use crate::types::CreditsPatch;

/// Outcome of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReserveOutcome {
    /// Balance was debited by the requested amount
    Reserved,
    /// Balance was left untouched because it could not cover the amount
    Insufficient {
        /// Amount the caller asked for
        needed: f64,
        /// Balance observed at check time
        available: f64,
    },
}

/// Read / reserve / refund over a single per-user balance
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance for a user
    async fn balance(&self, user_id: &str) -> Result<f64, LedgerError>;

    /// Debit `amount` if the balance covers it
    async fn reserve(&self, user_id: &str, amount: f64) -> Result<ReserveOutcome, LedgerError>;

    /// Credit `amount` back to the balance
    async fn refund(&self, user_id: &str, amount: f64) -> Result<(), LedgerError>;
}

/// Ledger over a [`CreditStore`]
///
/// Reserve is check-then-write across two store round-trips, not an atomic
/// decrement: two concurrent reservations for the same user can both pass
/// the check and overdraw the balance. Accepted trade-off; the balance is
/// fractional and self-corrects on the next monthly refill.
#[derive(Clone)]
pub struct StoreLedger {
    store: Arc<dyn CreditStore>,
}

impl StoreLedger {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for StoreLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLedger").finish_non_exhaustive()
    }
}

#[async_trait]
impl CreditLedger for StoreLedger {
    async fn balance(&self, user_id: &str) -> Result<f64, LedgerError> {
        let row = self.store.fetch_credits(user_id).await?;
        row.map(|row| row.credits).ok_or(LedgerError::MissingBalance)
    }

    async fn reserve(&self, user_id: &str, amount: f64) -> Result<ReserveOutcome, LedgerError> {
        let available = self.balance(user_id).await?;
        if available < amount {
            return Ok(ReserveOutcome::Insufficient {
                needed: amount,
                available,
            });
        }

        self.store
            .update_credits(user_id, &CreditsPatch::balance(available - amount))
            .await?;
        debug!(user_id, amount, remaining = available - amount, "credits reserved");
        Ok(ReserveOutcome::Reserved)
    }

    async fn refund(&self, user_id: &str, amount: f64) -> Result<(), LedgerError> {
        let current = self.balance(user_id).await?;
        self.store
            .update_credits(user_id, &CreditsPatch::balance(current + amount))
            .await?;
        debug!(user_id, amount, "credits refunded");
        Ok(())
    }
}
