use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use tracing::{debug, warn};

use quill_core::Identity;
use quill_core::plans::cost_for;
use quill_credits::{CreditLedger, EntitlementResolver, ReserveOutcome};
use quill_storage::CleanupQueue;

use crate::error::RelayError;
use crate::provider::{GenerationProvider, GenerationRequest, TokenStream};

/// One metered generation request, assembled by the HTTP layer
#[derive(Debug, Clone, Default)]
pub struct GenerationJob {
    /// Caller identity; absent for anonymous requests
    pub identity: Option<Identity>,
    /// Full prompt text sent to the provider
    pub prompt: String,
    /// Image references forwarded to the provider
    pub images: Vec<String>,
    /// Characters counted against the balance (allocated file text, or the
    /// prompt itself for prompt-only requests)
    pub billable_chars: usize,
    /// Whether the request is prompt text only (triggers the 1-credit floor)
    pub prompt_only: bool,
    /// Staged blob paths to delete after a successful run
    pub cleanup_paths: Vec<String>,
}

/// Byte stream relayed to the caller; errors after the first token end the
/// stream rather than surfacing
pub type RelayStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// The orchestrator: cost, authorization, provider call, reconciliation
///
/// The charge is settled before the provider is contacted; afterwards the
/// only question is whether to give it back. The rule is single: refund if
/// and only if zero tokens reached the caller.
pub struct MeteredRelay {
    resolver: EntitlementResolver,
    ledger: Arc<dyn CreditLedger>,
    provider: Arc<dyn GenerationProvider>,
    cleanup: Option<CleanupQueue>,
}

impl MeteredRelay {
    pub fn new(
        resolver: EntitlementResolver,
        ledger: Arc<dyn CreditLedger>,
        provider: Arc<dyn GenerationProvider>,
        cleanup: Option<CleanupQueue>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            provider,
            cleanup,
        }
    }

    /// Run a generation request end to end
    ///
    /// On success the returned stream owns the reconciliation: dropping it
    /// before the first token refunds the reservation in the background.
    pub async fn generate(&self, job: GenerationJob) -> Result<RelayStream, RelayError> {
        if let Some(identity) = &job.identity
            && let Err(error) = self.resolver.ensure_credits(identity).await
        {
            // provisioning is best-effort; a stale balance row still works
            warn!(user_id = %identity.user_id, %error, "credit provisioning failed, continuing");
        }

        let cost = cost_for(job.billable_chars, !job.images.is_empty(), job.prompt_only);
        let reservation = self.reserve(job.identity.as_ref(), cost).await?;

        let request = GenerationRequest {
            prompt: job.prompt,
            images: job.images,
        };
        let upstream = match self.provider.open_stream(&request).await {
            Ok(stream) => stream,
            Err(error) => {
                if let Some((user_id, amount)) = &reservation {
                    refund(self.ledger.as_ref(), user_id, *amount).await;
                }
                return Err(RelayError::from_provider(&error));
            }
        };

        let guard = reservation.map(|(user_id, amount)| {
            ReservationGuard::new(Arc::clone(&self.ledger), user_id, amount)
        });

        Ok(relay_stream(
            upstream,
            guard,
            self.cleanup.clone(),
            job.cleanup_paths,
        ))
    }

    /// Check the balance and debit the cost, mirroring the two-step store
    /// conversation: a failed read means we cannot bill at all, a failed
    /// write means we must not proceed
    async fn reserve(
        &self,
        identity: Option<&Identity>,
        cost: f64,
    ) -> Result<Option<(String, f64)>, RelayError> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        if cost <= 0.0 {
            return Ok(None);
        }

        let available = match self.ledger.balance(&identity.user_id).await {
            Ok(available) => available,
            Err(error) => {
                warn!(user_id = %identity.user_id, %error, "balance check failed");
                return Err(RelayError::CreditsUnavailable);
            }
        };
        if available < cost {
            return Err(RelayError::InsufficientCredits {
                needed: cost,
                available,
            });
        }

        match self.ledger.reserve(&identity.user_id, cost).await {
            Ok(ReserveOutcome::Reserved) => {
                Ok(Some((identity.user_id.clone(), cost)))
            }
            Ok(ReserveOutcome::Insufficient { needed, available }) => {
                Err(RelayError::InsufficientCredits { needed, available })
            }
            Err(error) => {
                warn!(user_id = %identity.user_id, %error, "credit deduction failed");
                Err(RelayError::DeductionFailed)
            }
        }
    }
}

impl std::fmt::Debug for MeteredRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteredRelay").finish_non_exhaustive()
    }
}

struct RelayState {
    upstream: TokenStream,
    guard: Option<ReservationGuard>,
    emitted: bool,
    cleanup: Option<CleanupQueue>,
    cleanup_paths: Vec<String>,
}

fn relay_stream(
    upstream: TokenStream,
    guard: Option<ReservationGuard>,
    cleanup: Option<CleanupQueue>,
    cleanup_paths: Vec<String>,
) -> RelayStream {
    let state = RelayState {
        upstream,
        guard,
        emitted: false,
        cleanup,
        cleanup_paths,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        match state.upstream.next().await {
            Some(Ok(token)) => {
                if !state.emitted {
                    state.emitted = true;
                    // the caller has received value; the charge stands
                    if let Some(mut guard) = state.guard.take() {
                        guard.disarm();
                    }
                }
                Some((token, state))
            }
            Some(Err(error)) => {
                if state.emitted {
                    warn!(%error, "provider stream failed mid-flight, ending response");
                } else {
                    warn!(%error, "provider stream failed before any token, refunding");
                    if let Some(guard) = state.guard.take() {
                        guard.refund_now().await;
                    }
                }
                None
            }
            None => {
                if !state.emitted
                    && let Some(guard) = state.guard.take()
                {
                    guard.refund_now().await;
                }
                let paths = std::mem::take(&mut state.cleanup_paths);
                if let Some(queue) = &state.cleanup
                    && !paths.is_empty()
                {
                    debug!(count = paths.len(), "enqueueing staged blob cleanup");
                    queue.enqueue(paths);
                }
                None
            }
        }
    }))
}

/// Holds an unsettled reservation while the stream is live
///
/// Disarmed on the first token. If the caller disconnects before then,
/// the stream (and this guard) is dropped with the reservation still
/// armed, and the refund runs as a background task.
struct ReservationGuard {
    ledger: Arc<dyn CreditLedger>,
    user_id: String,
    amount: f64,
    armed: bool,
}

impl ReservationGuard {
    fn new(ledger: Arc<dyn CreditLedger>, user_id: String, amount: f64) -> Self {
        Self {
            ledger,
            user_id,
            amount,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    async fn refund_now(mut self) {
        self.armed = false;
        refund(self.ledger.as_ref(), &self.user_id, self.amount).await;
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ledger = Arc::clone(&self.ledger);
        let user_id = std::mem::take(&mut self.user_id);
        let amount = self.amount;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                refund(ledger.as_ref(), &user_id, amount).await;
            });
        } else {
            warn!(%user_id, amount, "no runtime available to refund cancelled reservation");
        }
    }
}

async fn refund(ledger: &dyn CreditLedger, user_id: &str, amount: f64) {
    if let Err(error) = ledger.refund(user_id, amount).await {
        // never retried synchronously; the caller already has its response
        warn!(user_id, amount, %error, "refund failed");
    }
}
