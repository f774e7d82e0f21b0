//! Best-effort, non-blocking delivery of view events.
//!
//! Two interchangeable strategies satisfy the same contract: hand the payload
//! off and return immediately, never waiting for an acknowledgment.
//!
//! - [`BeaconOutbox`]: durable fire-and-forget. Payloads are queued for a
//!   dedicated sender thread that keeps draining after the page is gone.
//! - [`KeepaliveTransport`]: an unawaited request spawned on the host runtime.
//!
//! [`select_delivery`] picks one by probing what the host can do.

pub mod beacon;
pub mod keepalive;

pub use beacon::BeaconOutbox;
pub use keepalive::KeepaliveTransport;

use crate::core::ViewEvent;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Which strategy carried a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    Beacon,
    Keepalive,
}

impl std::fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStrategy::Beacon => write!(f, "beacon"),
            DeliveryStrategy::Keepalive => write!(f, "keep-alive request"),
        }
    }
}

/// Immediate result of handing a payload to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted by the beacon outbox
    Queued,
    /// A keep-alive request was spawned
    Dispatched,
    /// The transport refused the payload (outbox full or closed)
    Rejected,
}

/// A one-way transport for view events.
pub trait Delivery: Send + Sync {
    /// Attempt delivery without blocking the caller.
    fn deliver(&self, event: &ViewEvent) -> DeliveryOutcome;

    fn strategy(&self) -> DeliveryStrategy;

    /// Wait for already accepted payloads to be attempted.
    ///
    /// Blocks the calling thread; call it at exit from outside async code.
    fn shutdown(&self) {}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to start beacon sender: {0}")]
    SenderThread(std::io::Error),
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// What the host environment supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Payloads may outlive the page on a background sender
    pub beacon: bool,
}

impl Capabilities {
    pub fn new(beacon: bool) -> Self {
        Self { beacon }
    }
}

/// Settings shared by both strategies.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Absolute URL of the view endpoint
    pub endpoint: Url,
    /// Token sent on keep-alive requests; beacons cannot carry headers
    pub csrf_token: Option<String>,
    pub timeout: Duration,
    pub beacon_queue_capacity: usize,
}

/// Pick the beacon outbox when the host supports it and its sender starts,
/// otherwise fall back to keep-alive requests on `runtime`.
pub fn select_delivery(
    capabilities: Capabilities,
    settings: &DeliverySettings,
    runtime: tokio::runtime::Handle,
) -> Result<Arc<dyn Delivery>, DeliveryError> {
    if capabilities.beacon {
        match BeaconOutbox::spawn(
            settings.endpoint.clone(),
            settings.beacon_queue_capacity,
            settings.timeout,
        ) {
            Ok(outbox) => return Ok(Arc::new(outbox)),
            Err(e) => {
                tracing::warn!("Beacon unavailable, falling back to keep-alive requests: {e}");
            }
        }
    }

    let transport = KeepaliveTransport::new(
        settings.endpoint.clone(),
        settings.csrf_token.clone(),
        settings.timeout,
        runtime,
    )?;
    Ok(Arc::new(transport))
}

/// JSON body shared by both strategies.
pub(crate) fn encode(event: &ViewEvent) -> Option<Vec<u8>> {
    match serde_json::to_vec(event) {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::error!("Failed to encode view event: {e}");
            None
        }
    }
}
