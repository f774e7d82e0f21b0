//! Explicit preference signals (save / reject / ignore).
//!
//! Each click on a preference control is sent with acknowledgment. A positive
//! acknowledgment shows a short confirmation toast; anything else is logged
//! and otherwise silent.

use crate::api::ApiError;
use crate::config::FeedbackTimings;
use crate::feedback::{FeedbackSurface, Toast};
use crate::page::PreferenceControl;
use crate::transparency::SharedSignalLog;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// Interest polarity expressed by the user toward a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    Saved,
    Rejected,
    Ignored,
}

impl PreferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKind::Saved => "saved",
            PreferenceKind::Rejected => "rejected",
            PreferenceKind::Ignored => "ignored",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "saved" => Some(PreferenceKind::Saved),
            "rejected" => Some(PreferenceKind::Rejected),
            "ignored" => Some(PreferenceKind::Ignored),
            _ => None,
        }
    }
}

impl std::fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmation copy for a preference label. Unknown labels get a generic message.
pub fn confirmation_message(label: &str) -> &'static str {
    match PreferenceKind::parse(label) {
        Some(PreferenceKind::Saved) => "Job saved! We'll show you more like this.",
        Some(PreferenceKind::Rejected) => "Got it. We'll show you fewer jobs like this.",
        Some(PreferenceKind::Ignored) => "Noted. Adjusting your recommendations.",
        None => "Preference saved.",
    }
}

/// Wire payload for `POST /jobs/api/track-preference/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEvent {
    pub job_id: String,
    pub preference_type: PreferenceKind,
}

impl PreferenceEvent {
    pub fn new(job_id: impl Into<String>, preference_type: PreferenceKind) -> Self {
        Self {
            job_id: job_id.into(),
            preference_type,
        }
    }
}

/// Server acknowledgment of a preference.
///
/// Bodies without `success` (error responses) read as `success: false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceAck {
    #[serde(default)]
    pub success: bool,
    /// `created` or `updated`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_type: Option<String>,
}

/// Destination for preference events.
pub trait PreferenceSink: Send + Sync + 'static {
    fn send(
        &self,
        event: &PreferenceEvent,
    ) -> impl Future<Output = Result<PreferenceAck, ApiError>> + Send;
}

/// How a preference report ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Acknowledged; a confirmation toast was scheduled
    Confirmed,
    /// The server answered `success: false`
    Declined,
    /// Network or parse failure
    Failed,
}

/// Sends preference signals and drives the transient UI feedback.
pub struct PreferenceReporter<S> {
    sink: S,
    surface: Arc<dyn FeedbackSurface>,
    timings: FeedbackTimings,
    signal_log: Option<SharedSignalLog>,
}

impl<S: PreferenceSink> PreferenceReporter<S> {
    pub fn new(sink: S, surface: Arc<dyn FeedbackSurface>, timings: FeedbackTimings) -> Self {
        Self {
            sink,
            surface,
            timings,
            signal_log: None,
        }
    }

    pub fn with_signal_log(mut self, log: SharedSignalLog) -> Self {
        self.signal_log = Some(log);
        self
    }

    /// Report one clicked control.
    ///
    /// Must run inside a tokio runtime: card removal and the toast lifecycle
    /// are scheduled as their own tasks.
    pub async fn report(&self, control: PreferenceControl) -> ReportOutcome {
        let kind = control.action.kind();

        // The card goes away whatever the backend says.
        if kind == PreferenceKind::Rejected {
            self.retire_card(&control.job_id);
        }

        let event = PreferenceEvent::new(control.job_id, kind);
        let outcome = match self.sink.send(&event).await {
            Ok(ack) if ack.success => {
                tracing::info!(job_id = %event.job_id, action = ?ack.action, "Preference tracked: {kind}");
                self.confirm(kind.as_str());
                ReportOutcome::Confirmed
            }
            Ok(_) => {
                tracing::warn!(job_id = %event.job_id, "Preference not accepted by server: {kind}");
                ReportOutcome::Declined
            }
            Err(e) => {
                tracing::error!(job_id = %event.job_id, "Preference tracking failed: {e}");
                ReportOutcome::Failed
            }
        };

        if let Some(log) = &self.signal_log {
            log.record_preference(outcome);
        }

        outcome
    }

    /// Fade the job card now and remove it after the configured delay.
    fn retire_card(&self, job_id: &str) {
        self.surface.fade_card(job_id);

        let surface = Arc::clone(&self.surface);
        let delay = self.timings.card_removal_delay;
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            surface.remove_card(&job_id);
        });
    }

    /// Show a confirmation toast, then animate it out and remove it.
    fn confirm(&self, label: &str) {
        let toast = Toast::new(confirmation_message(label));
        self.surface.show_toast(&toast);

        let surface = Arc::clone(&self.surface);
        let timings = self.timings;
        tokio::spawn(async move {
            tokio::time::sleep(timings.toast_duration).await;
            surface.begin_toast_exit(&toast);
            tokio::time::sleep(timings.toast_exit_animation).await;
            surface.remove_toast(&toast);
        });
    }
}
