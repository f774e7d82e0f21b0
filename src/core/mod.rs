//! Core signal logic.
//!
//! This module contains:
//! - Dwell-time measurement and flushing for the tracked job
//! - Preference reporting with acknowledgment and UI feedback
//! - The page session that dispatches host events to both

pub mod clock;
pub mod dwell;
pub mod preference;
pub mod session;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use dwell::{
    DwellSession, DwellTracker, FlushOutcome, TrackerState, ViewEvent, MIN_DWELL_SECONDS,
};
pub use preference::{
    confirmation_message, PreferenceAck, PreferenceEvent, PreferenceKind, PreferenceReporter,
    PreferenceSink, ReportOutcome,
};
pub use session::{Dispatched, PageSession, SessionBuilder, SessionError};
