#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod auth;
mod credits;
mod error;
mod generate;
mod health;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

use quill_auth::IdentityVerifier;
use quill_config::Config;
use quill_credits::{CreditStore, EntitlementResolver, RestStore, StoreLedger};
use quill_ingest::ExtractorSet;
use quill_llm::{MeteredRelay, OpenAiProvider};
use quill_storage::{BlobClient, CleanupQueue};

pub use error::RequestError;
pub use state::AppState;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any collaborator client fails to initialize
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let verifier = IdentityVerifier::new(
            config.auth.base_url.clone(),
            config.auth.service_key.clone(),
            Duration::from_secs(config.auth.cache_ttl_seconds),
            config.auth.cache_capacity,
        )?;

        let store = Arc::new(RestStore::new(
            config.store.base_url.clone(),
            config.store.service_key.clone(),
        )?);
        let resolver = EntitlementResolver::new(
            Arc::clone(&store) as Arc<dyn CreditStore>,
            Duration::from_secs(config.credits.tier_cache_ttl_secs),
        );
        let ledger = Arc::new(StoreLedger::new(store));

        let provider = Arc::new(OpenAiProvider::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
            Duration::from_secs(config.llm.request_timeout_secs),
        )?);

        let cleanup = config
            .storage
            .as_ref()
            .map(|storage| {
                BlobClient::new(storage.base_url.clone(), storage.service_key.clone())
                    .map(CleanupQueue::new)
            })
            .transpose()?;

        let relay = Arc::new(MeteredRelay::new(
            resolver.clone(),
            ledger,
            provider,
            cleanup,
        ));

        let state = AppState {
            resolver,
            relay,
            extractors: Arc::new(ExtractorSet::builtin()),
        };

        let mut app = Router::new();
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }
        let app = app
            .route("/v1/generate", axum::routing::post(generate::generate_handler))
            .route("/v1/credits", axum::routing::get(credits::credits_handler))
            .with_state(state);

        let app = app.layer(axum::middleware::from_fn(move |req, next| {
            let verifier = verifier.clone();
            async move { auth::identity_middleware(verifier, req, next).await }
        }));
        let app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
