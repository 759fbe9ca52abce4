#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
pub mod ledger;
pub mod resolver;
mod rest;
pub mod store;
mod tier_cache;
mod types;

pub use error::{LedgerError, StoreError};
pub use ledger::{CreditLedger, ReserveOutcome, StoreLedger};
pub use resolver::EntitlementResolver;
pub use rest::RestStore;
pub use store::{CreditStore, MemoryStore};
pub use tier_cache::TierCache;
pub use types::{CreditSnapshot, CreditsPatch, CreditsRow, SubscriptionStatus, TierDecision};
