//! Durable fire-and-forget delivery.

use super::{encode, Delivery, DeliveryError, DeliveryOutcome, DeliveryStrategy};
use crate::core::ViewEvent;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Queue of view payloads drained by a dedicated sender thread.
///
/// `deliver` only enqueues. The sender keeps running when the outbox handle
/// is dropped and exits once every queued payload has been attempted.
/// Beacons carry no custom headers, so no CSRF token is sent.
pub struct BeaconOutbox {
    sender: Mutex<Option<Sender<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BeaconOutbox {
    /// Start the sender thread for `endpoint`.
    pub fn spawn(endpoint: Url, capacity: usize, timeout: Duration) -> Result<Self, DeliveryError> {
        let (sender, receiver) = bounded(capacity.max(1));

        let worker = thread::Builder::new()
            .name("beacon-outbox".to_string())
            .spawn(move || drain(endpoint, receiver, timeout))
            .map_err(DeliveryError::SenderThread)?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stop accepting payloads and wait until queued ones were attempted.
    pub fn close(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("Beacon sender thread panicked");
            }
        }
    }
}

impl Delivery for BeaconOutbox {
    fn deliver(&self, event: &ViewEvent) -> DeliveryOutcome {
        let Some(body) = encode(event) else {
            return DeliveryOutcome::Rejected;
        };

        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            return DeliveryOutcome::Rejected;
        };

        match sender.try_send(body) {
            Ok(()) => {
                tracing::info!(job_id = %event.job_id, seconds = event.time_spent_seconds, "Beacon queued");
                DeliveryOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job_id = %event.job_id, "Beacon outbox full, view dropped");
                DeliveryOutcome::Rejected
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!(job_id = %event.job_id, "Beacon sender gone, view dropped");
                DeliveryOutcome::Rejected
            }
        }
    }

    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Beacon
    }

    fn shutdown(&self) {
        self.close();
    }
}

/// Sender thread body: post every queued payload until the outbox closes.
fn drain(endpoint: Url, receiver: Receiver<Vec<u8>>, timeout: Duration) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Beacon sender could not start a runtime: {e}");
            return;
        }
    };

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Beacon sender could not create HTTP client: {e}");
            return;
        }
    };

    for body in receiver.iter() {
        let request = client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        match runtime.block_on(request.send()) {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!("Beacon rejected by server: {}", response.status());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Beacon delivery failed: {e}"),
        }
    }
}
