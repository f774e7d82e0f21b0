//! Running counts of emitted signals.
//!
//! Only counts are kept: no job ids, sources or timestamps of individual
//! events are stored.

use crate::core::ReportOutcome;
use crate::delivery::DeliveryOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signal counters for the current run, optionally persisted across runs.
#[derive(Debug)]
pub struct SignalLog {
    /// Views handed to a delivery strategy
    views_sent: AtomicU64,
    /// Views below the dwell threshold
    views_discarded: AtomicU64,
    beacons_queued: AtomicU64,
    beacons_rejected: AtomicU64,
    keepalive_requests: AtomicU64,
    preferences_confirmed: AtomicU64,
    preferences_declined: AtomicU64,
    preferences_failed: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self {
            views_sent: AtomicU64::new(0),
            views_discarded: AtomicU64::new(0),
            beacons_queued: AtomicU64::new(0),
            beacons_rejected: AtomicU64::new(0),
            keepalive_requests: AtomicU64::new(0),
            preferences_confirmed: AtomicU64::new(0),
            preferences_declined: AtomicU64::new(0),
            preferences_failed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads and saves its counts at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous signal stats: {e}");
        }

        log
    }

    /// Record a view handed to delivery and how the transport took it.
    pub fn record_view_sent(&self, outcome: DeliveryOutcome) {
        self.views_sent.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            DeliveryOutcome::Queued => &self.beacons_queued,
            DeliveryOutcome::Rejected => &self.beacons_rejected,
            DeliveryOutcome::Dispatched => &self.keepalive_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_view_discarded(&self) {
        self.views_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preference(&self, outcome: ReportOutcome) {
        let counter = match outcome {
            ReportOutcome::Confirmed => &self.preferences_confirmed,
            ReportOutcome::Declined => &self.preferences_declined,
            ReportOutcome::Failed => &self.preferences_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> SignalStats {
        SignalStats {
            views_sent: self.views_sent.load(Ordering::Relaxed),
            views_discarded: self.views_discarded.load(Ordering::Relaxed),
            beacons_queued: self.beacons_queued.load(Ordering::Relaxed),
            beacons_rejected: self.beacons_rejected.load(Ordering::Relaxed),
            keepalive_requests: self.keepalive_requests.load(Ordering::Relaxed),
            preferences_confirmed: self.preferences_confirmed.load(Ordering::Relaxed),
            preferences_declined: self.preferences_declined.load(Ordering::Relaxed),
            preferences_failed: self.preferences_failed.load(Ordering::Relaxed),
            session_start: self.session_start,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Signal Statistics:\n\
             - Views reported: {} (beacon: {}, keep-alive: {}, dropped: {})\n\
             - Views too short to report: {}\n\
             - Preferences confirmed: {}\n\
             - Preferences declined: {}\n\
             - Preferences failed: {}\n\
             \n\
             Only job ids, whole seconds on page, traffic source and\n\
             save/reject/ignore choices are ever sent.",
            stats.views_sent,
            stats.beacons_queued,
            stats.keepalive_requests,
            stats.beacons_rejected,
            stats.views_discarded,
            stats.preferences_confirmed,
            stats.preferences_declined,
            stats.preferences_failed,
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                views_sent: stats.views_sent,
                views_discarded: stats.views_discarded,
                beacons_queued: stats.beacons_queued,
                beacons_rejected: stats.beacons_rejected,
                keepalive_requests: stats.keepalive_requests,
                preferences_confirmed: stats.preferences_confirmed,
                preferences_declined: stats.preferences_declined,
                preferences_failed: stats.preferences_failed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.views_sent.store(persisted.views_sent, Ordering::Relaxed);
                self.views_discarded
                    .store(persisted.views_discarded, Ordering::Relaxed);
                self.beacons_queued
                    .store(persisted.beacons_queued, Ordering::Relaxed);
                self.beacons_rejected
                    .store(persisted.beacons_rejected, Ordering::Relaxed);
                self.keepalive_requests
                    .store(persisted.keepalive_requests, Ordering::Relaxed);
                self.preferences_confirmed
                    .store(persisted.preferences_confirmed, Ordering::Relaxed);
                self.preferences_declined
                    .store(persisted.preferences_declined, Ordering::Relaxed);
                self.preferences_failed
                    .store(persisted.preferences_failed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.views_sent,
            &self.views_discarded,
            &self.beacons_queued,
            &self.beacons_rejected,
            &self.keepalive_requests,
            &self.preferences_confirmed,
            &self.preferences_declined,
            &self.preferences_failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SignalLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of signal statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalStats {
    pub views_sent: u64,
    pub views_discarded: u64,
    pub beacons_queued: u64,
    pub beacons_rejected: u64,
    pub keepalive_requests: u64,
    pub preferences_confirmed: u64,
    pub preferences_declined: u64,
    pub preferences_failed: u64,
    pub session_start: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    views_sent: u64,
    views_discarded: u64,
    beacons_queued: u64,
    beacons_rejected: u64,
    keepalive_requests: u64,
    preferences_confirmed: u64,
    preferences_declined: u64,
    preferences_failed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared signal log.
pub type SharedSignalLog = Arc<SignalLog>;

pub fn create_shared_log() -> SharedSignalLog {
    Arc::new(SignalLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedSignalLog {
    Arc::new(SignalLog::with_persistence(path))
}
