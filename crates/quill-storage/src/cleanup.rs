use tokio::sync::mpsc;

use crate::client::BlobClient;

/// Fire-and-forget deletion of staged upload blobs
///
/// Paths are sent over an unbounded channel to a background task so the
/// response stream never waits on storage. Failures are logged and
/// dropped; a leaked blob is preferable to a stalled response, and the
/// storage side runs its own scheduled sweep.
#[derive(Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl CleanupQueue {
    /// Create the queue and spawn its background worker
    ///
    /// The worker runs until every sender is dropped.
    #[must_use]
    pub fn new(client: BlobClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(process_batches(rx, client));
        Self { tx }
    }

    /// Enqueue a batch of object paths for deletion
    ///
    /// Non-blocking. If the worker has stopped the batch is silently
    /// dropped.
    pub fn enqueue(&self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        if let Err(e) = self.tx.send(paths) {
            tracing::warn!(error = %e, "failed to enqueue blob cleanup, channel closed");
        }
    }
}

impl std::fmt::Debug for CleanupQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupQueue").finish_non_exhaustive()
    }
}

async fn process_batches(mut rx: mpsc::UnboundedReceiver<Vec<String>>, client: BlobClient) {
    while let Some(paths) = rx.recv().await {
        for path in paths {
            if let Err(error) = client.delete(&path).await {
                tracing::warn!(%path, %error, "staged blob cleanup failed");
            }
        }
    }

    tracing::debug!("cleanup queue shutting down");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn enqueued_paths_are_deleted_in_background() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/uploads/a.png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/uploads/b.png"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = BlobClient::new(
            server.uri().parse().unwrap(),
            secrecy::SecretString::from("service-key"),
        )
        .unwrap();
        let queue = CleanupQueue::new(client);

        queue.enqueue(vec!["uploads/a.png".to_owned(), "uploads/b.png".to_owned()]);

        // the worker is fire-and-forget; give it a moment to drain
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if server.received_requests().await.map(|r| r.len()) == Some(2) {
                break;
            }
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
