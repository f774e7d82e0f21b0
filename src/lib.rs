//! Job-feed signals - dwell time and preference capture for job listings.
//!
//! This library measures how long a visitor keeps a job posting visible and
//! reports explicit save / reject / ignore choices, producing the signals a
//! personalization pipeline consumes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Page session                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  PageEvent ──▶ ┌──────────────┐   ┌────────────────────────┐ │
//! │  (hidden,      │ DwellTracker │──▶│ Delivery               │ │
//! │   visible,     └──────────────┘   │ beacon │ keep-alive    │ │
//! │   unload)                         └────────────────────────┘ │
//! │                                                              │
//! │  PageEvent ──▶ ┌────────────────────┐   ┌─────────────────┐  │
//! │  (control)     │ PreferenceReporter │──▶│ track-preference│  │
//! │                └────────────────────┘   └─────────────────┘  │
//! │                          │                                   │
//! │                          ▼                                   │
//! │                 FeedbackSurface (toast, card)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobfeed_signals::{Config, ConsoleSurface, PageContext, PageEvent, SessionBuilder, TrackedItem};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let context = PageContext::new(
//!     "http://127.0.0.1:8000/jobs/42/?source=feed",
//!     "csrftoken=abc",
//!     TrackedItem::from_attribute(Some("42")),
//! )?;
//! let (mut session, delivery) = SessionBuilder::new(context, Config::default())
//!     .build(Arc::new(ConsoleSurface), tokio::runtime::Handle::current())?;
//!
//! session.start();
//! session.dispatch(PageEvent::hidden());
//! session.settle().await;
//! tokio::task::spawn_blocking(move || delivery.shutdown()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod core;
pub mod delivery;
pub mod feedback;
pub mod page;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use api::{ApiConfig, ApiError, PreferenceClient};
pub use config::{Config, ConfigError, FeedbackTimings};
pub use crate::core::{
    Clock, Dispatched, DwellTracker, FlushOutcome, ManualClock, PageSession, PreferenceKind,
    PreferenceReporter, ReportOutcome, SessionBuilder, SessionError, SystemClock, ViewEvent,
};
pub use delivery::{Capabilities, Delivery, DeliveryOutcome, DeliveryStrategy};
pub use feedback::{ConsoleSurface, FeedbackSurface, Toast};
pub use page::{ControlAction, PageContext, PageEvent, PageEventBus, PreferenceControl, TrackedItem};
pub use transparency::{SharedSignalLog, SignalLog, SignalStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Declaration of what the client sends, shown to users on request.
pub const TRACKING_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              JOB FEED SIGNALS - TRACKING DECLARATION             ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This client reports how you interact with job postings so the   ║
║  feed can show you more relevant jobs.                           ║
║                                                                  ║
║  ✓ WHAT WE SEND:                                                 ║
║    • The job id and whole seconds a posting stayed visible       ║
║      (visits under 3 seconds are never sent)                     ║
║    • The traffic source label from the page address              ║
║    • Your explicit save / not interested / ignore choices        ║
║                                                                  ║
║  ✗ WHAT WE NEVER SEND:                                           ║
║    • Scrolling, typing or cursor activity                        ║
║    • Page content or other browsing history                      ║
║                                                                  ║
║  You can view reporting statistics anytime with:                 ║
║    jobfeed-signals status                                        ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_declaration_contents() {
        assert!(TRACKING_DECLARATION.contains("TRACKING DECLARATION"));
        assert!(TRACKING_DECLARATION.contains("NEVER SEND"));
        assert!(TRACKING_DECLARATION.contains("under 3 seconds"));
    }
}
