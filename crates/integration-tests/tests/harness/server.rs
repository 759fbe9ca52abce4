//! Runs the assembled router on an ephemeral port for the duration of a test

use quill_config::Config;
use quill_server::Server;
use tokio_util::sync::CancellationToken;

/// A running server instance, torn down on drop
pub struct TestServer {
    base_url: String,
    client: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Build the server from `config` and serve it on a random local port
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let router = Server::new(config)?.into_router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let shutdown = CancellationToken::new();
        let drain = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { drain.cancelled().await })
                .await
                .ok();
        });

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            shutdown,
        })
    }

    /// Absolute URL for a route on this instance
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Client to issue requests with
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
