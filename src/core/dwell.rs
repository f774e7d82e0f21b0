//! Dwell-time measurement for the tracked job.
//!
//! A session opens when the page starts (or becomes visible again) and is
//! flushed when the page is hidden or unloaded. Each flush measures whole
//! seconds since the session opened and hands a [`ViewEvent`] to the
//! delivery subsystem when the visit was long enough to count.

use crate::core::Clock;
use crate::delivery::{Delivery, DeliveryOutcome};
use crate::page::{PageContext, Visibility};
use crate::transparency::SharedSignalLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Visits shorter than this many whole seconds are not reported.
pub const MIN_DWELL_SECONDS: u64 = 3;

/// Wire payload for `POST /jobs/api/track-view/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    pub job_id: String,
    pub time_spent_seconds: u64,
    pub source: String,
}

/// An open measurement of visible time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellSession {
    pub started_at: DateTime<Utc>,
}

impl DwellSession {
    pub fn open(now: DateTime<Utc>) -> Self {
        Self { started_at: now }
    }

    /// Whole seconds elapsed since the session opened, floored.
    ///
    /// A clock that moved backwards yields zero.
    pub fn dwell_seconds(&self, now: DateTime<Utc>) -> u64 {
        let elapsed_ms = (now - self.started_at).num_milliseconds().max(0);
        (elapsed_ms / 1000) as u64
    }
}

/// Lifecycle of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// `start` has not run yet
    Uninitialized,
    /// The page has no tracked item; every trigger is a no-op
    Disabled,
    /// A session is open
    Armed(DwellSession),
    /// The last session was flushed and no new one is open
    Flushed(DwellSession),
}

/// What a flush trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Tracker not started or disabled
    Inactive,
    /// Visit too short to count
    Discarded { dwell_seconds: u64 },
    /// A view event was handed to the delivery subsystem
    Sent {
        event: ViewEvent,
        outcome: DeliveryOutcome,
    },
}

/// Measures how long the tracked job stayed visible and reports it.
pub struct DwellTracker {
    context: Arc<PageContext>,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn Delivery>,
    state: TrackerState,
    signal_log: Option<SharedSignalLog>,
}

impl DwellTracker {
    pub fn new(
        context: Arc<PageContext>,
        clock: Arc<dyn Clock>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            context,
            clock,
            delivery,
            state: TrackerState::Uninitialized,
            signal_log: None,
        }
    }

    /// Record flush decisions in the given signal log.
    pub fn with_signal_log(mut self, log: SharedSignalLog) -> Self {
        self.signal_log = Some(log);
        self
    }

    /// Arm the tracker. Returns false when the page has no tracked item,
    /// in which case the tracker stays disabled for the page lifetime.
    pub fn start(&mut self) -> bool {
        match self.state {
            TrackerState::Uninitialized => {}
            TrackerState::Disabled => return false,
            _ => return true,
        }

        if self.context.tracked_item().is_some() {
            self.state = TrackerState::Armed(DwellSession::open(self.clock.now()));
            true
        } else {
            tracing::debug!("No tracked job on this page, dwell tracking disabled");
            self.state = TrackerState::Disabled;
            false
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(
            self.state,
            TrackerState::Uninitialized | TrackerState::Disabled
        )
    }

    /// Handle a visibility change.
    ///
    /// Hidden flushes the current session; visible opens a fresh one
    /// whatever the prior state. Returns the flush outcome for hidden.
    pub fn on_visibility(&mut self, visibility: Visibility) -> Option<FlushOutcome> {
        match visibility {
            Visibility::Hidden => Some(self.flush()),
            Visibility::Visible => {
                if self.is_enabled() {
                    self.state = TrackerState::Armed(DwellSession::open(self.clock.now()));
                }
                None
            }
        }
    }

    /// Handle page teardown.
    pub fn on_unload(&mut self) -> FlushOutcome {
        self.flush()
    }

    /// Close the current session and attempt delivery of its measurement.
    ///
    /// A flush while already flushed measures the last session again, so a
    /// hidden flush followed by an unload flush reports the same visit twice.
    pub fn flush(&mut self) -> FlushOutcome {
        let session = match self.state {
            TrackerState::Armed(session) | TrackerState::Flushed(session) => session,
            TrackerState::Uninitialized | TrackerState::Disabled => {
                return FlushOutcome::Inactive
            }
        };
        self.state = TrackerState::Flushed(session);

        let Some(item) = self.context.tracked_item() else {
            return FlushOutcome::Inactive;
        };

        let dwell_seconds = session.dwell_seconds(self.clock.now());
        if dwell_seconds < MIN_DWELL_SECONDS {
            tracing::debug!(job_id = %item, dwell_seconds, "Visit too short, not reported");
            if let Some(log) = &self.signal_log {
                log.record_view_discarded();
            }
            return FlushOutcome::Discarded { dwell_seconds };
        }

        let event = ViewEvent {
            job_id: item.to_string(),
            time_spent_seconds: dwell_seconds,
            source: self.context.source(),
        };
        let outcome = self.delivery.deliver(&event);

        if let Some(log) = &self.signal_log {
            log.record_view_sent(outcome);
        }

        FlushOutcome::Sent { event, outcome }
    }
}
