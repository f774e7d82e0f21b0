//! Fallback delivery as an unawaited request on the host runtime.

use super::{encode, Delivery, DeliveryError, DeliveryOutcome, DeliveryStrategy};
use crate::api::CSRF_HEADER;
use crate::core::ViewEvent;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Spawns one request per view and returns without waiting for it.
///
/// Failures are logged and dropped. Nothing is retried.
pub struct KeepaliveTransport {
    client: reqwest::Client,
    endpoint: Url,
    csrf_token: Option<String>,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl KeepaliveTransport {
    pub fn new(
        endpoint: Url,
        csrf_token: Option<String>,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            csrf_token,
            runtime,
            in_flight: Mutex::new(Vec::new()),
        })
    }
}

impl Delivery for KeepaliveTransport {
    fn deliver(&self, event: &ViewEvent) -> DeliveryOutcome {
        let Some(body) = encode(event) else {
            return DeliveryOutcome::Rejected;
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let job_id = event.job_id.clone();
        let task = self.runtime.spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(%job_id, "Tracking rejected by server: {}", response.status());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(%job_id, "Tracking failed: {e}"),
            }
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.retain(|task| !task.is_finished());
        in_flight.push(task);

        DeliveryOutcome::Dispatched
    }

    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Keepalive
    }

    /// Block until spawned requests finish. Must not be called from async code.
    fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(|e| e.into_inner()));
        if tasks.is_empty() {
            return;
        }

        self.runtime.block_on(async {
            for task in tasks {
                let _ = task.await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn event() -> ViewEvent {
        ViewEvent {
            job_id: "42".to_string(),
            time_spent_seconds: 10,
            source: "direct".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unreachable_endpoint_is_logged_and_dropped() {
        let endpoint = Url::parse("http://127.0.0.1:9/jobs/api/track-view/").unwrap();
        let transport = Arc::new(
            KeepaliveTransport::new(
                endpoint,
                Some("token".to_string()),
                Duration::from_millis(500),
                Handle::current(),
            )
            .unwrap(),
        );

        let started = Instant::now();
        assert_eq!(transport.deliver(&event()), DeliveryOutcome::Dispatched);
        assert!(started.elapsed() < Duration::from_millis(500));

        let shutdown = Arc::clone(&transport);
        tokio::task::spawn_blocking(move || shutdown.shutdown())
            .await
            .unwrap();
        assert!(transport.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_request_is_not_retried() {
        // Hangs up on every connection without answering.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });

        let endpoint = Url::parse(&format!("http://{addr}/jobs/api/track-view/")).unwrap();
        let transport = Arc::new(
            KeepaliveTransport::new(endpoint, None, Duration::from_millis(500), Handle::current())
                .unwrap(),
        );
        assert_eq!(transport.deliver(&event()), DeliveryOutcome::Dispatched);

        let shutdown = Arc::clone(&transport);
        tokio::task::spawn_blocking(move || shutdown.shutdown())
            .await
            .unwrap();
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }
}
