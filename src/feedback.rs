//! Transient UI feedback: confirmation toasts and retired job cards.

use uuid::Uuid;

/// A confirmation message shown for a few seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
}

impl Toast {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
        }
    }
}

/// The page's visual layer, as seen by the preference reporter.
///
/// Calls arrive in lifecycle order: `show_toast` (enter animation),
/// `begin_toast_exit` (exit animation), `remove_toast`. Rejected cards get
/// `fade_card` then `remove_card`.
pub trait FeedbackSurface: Send + Sync {
    fn show_toast(&self, toast: &Toast);
    fn begin_toast_exit(&self, toast: &Toast);
    fn remove_toast(&self, toast: &Toast);
    fn fade_card(&self, job_id: &str);
    fn remove_card(&self, job_id: &str);
}

/// Renders feedback as terminal lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSurface;

impl FeedbackSurface for ConsoleSurface {
    fn show_toast(&self, toast: &Toast) {
        println!("  ✓ {}", toast.message);
    }

    fn begin_toast_exit(&self, _toast: &Toast) {}

    fn remove_toast(&self, toast: &Toast) {
        tracing::debug!(toast = %toast.id, "Toast removed");
    }

    fn fade_card(&self, job_id: &str) {
        println!("  ░ job {job_id} dimmed");
    }

    fn remove_card(&self, job_id: &str) {
        println!("  ✗ job {job_id} removed from feed");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum SurfaceCall {
        ToastShown(String),
        ToastExit(Uuid),
        ToastRemoved(Uuid),
        CardFaded(String),
        CardRemoved(String),
    }

    /// Surface double that records every call.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        calls: Mutex<Vec<SurfaceCall>>,
    }

    impl RecordingSurface {
        pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn toasts_shown(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    SurfaceCall::ToastShown(message) => Some(message),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, call: SurfaceCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl FeedbackSurface for RecordingSurface {
        fn show_toast(&self, toast: &Toast) {
            self.push(SurfaceCall::ToastShown(toast.message.clone()));
        }

        fn begin_toast_exit(&self, toast: &Toast) {
            self.push(SurfaceCall::ToastExit(toast.id));
        }

        fn remove_toast(&self, toast: &Toast) {
            self.push(SurfaceCall::ToastRemoved(toast.id));
        }

        fn fade_card(&self, job_id: &str) {
            self.push(SurfaceCall::CardFaded(job_id.to_string()));
        }

        fn remove_card(&self, job_id: &str) {
            self.push(SurfaceCall::CardRemoved(job_id.to_string()));
        }
    }

    #[test]
    fn test_toasts_have_distinct_ids() {
        let a = Toast::new("one");
        let b = Toast::new("one");
        assert_ne!(a.id, b.id);
    }
}
