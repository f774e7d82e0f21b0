//! Events and controls the host page emits.

use crate::core::PreferenceKind;
use serde::{Deserialize, Serialize};

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Action marker carried by a preference control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    #[serde(rename = "save-job")]
    Save,
    #[serde(rename = "reject-job")]
    Reject,
    #[serde(rename = "ignore-job")]
    Ignore,
}

impl ControlAction {
    /// Parse the marker attribute of a control (`save-job`, `reject-job`, `ignore-job`).
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim() {
            "save-job" => Some(ControlAction::Save),
            "reject-job" => Some(ControlAction::Reject),
            "ignore-job" => Some(ControlAction::Ignore),
            _ => None,
        }
    }

    /// The preference kind bound to this control's role.
    pub fn kind(&self) -> PreferenceKind {
        match self {
            ControlAction::Save => PreferenceKind::Saved,
            ControlAction::Reject => PreferenceKind::Rejected,
            ControlAction::Ignore => PreferenceKind::Ignored,
        }
    }
}

/// A clicked preference control.
///
/// The item id comes from the control itself, so it may reference any job
/// on the page, not only the tracked one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceControl {
    pub action: ControlAction,
    pub job_id: String,
}

impl PreferenceControl {
    pub fn new(action: ControlAction, job_id: impl Into<String>) -> Self {
        Self {
            action,
            job_id: job_id.into(),
        }
    }
}

/// A discrete event dispatched from the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// The page became visible or hidden
    Visibility { state: Visibility },
    /// The page is being torn down
    Unload,
    /// A preference control was clicked
    Control(PreferenceControl),
}

impl PageEvent {
    pub fn hidden() -> Self {
        PageEvent::Visibility {
            state: Visibility::Hidden,
        }
    }

    pub fn visible() -> Self {
        PageEvent::Visibility {
            state: Visibility::Visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_parsing() {
        assert_eq!(ControlAction::from_marker("save-job"), Some(ControlAction::Save));
        assert_eq!(ControlAction::from_marker("reject-job"), Some(ControlAction::Reject));
        assert_eq!(ControlAction::from_marker(" ignore-job "), Some(ControlAction::Ignore));
        assert_eq!(ControlAction::from_marker("apply-job"), None);
    }

    #[test]
    fn test_action_kind_binding() {
        assert_eq!(ControlAction::Save.kind(), PreferenceKind::Saved);
        assert_eq!(ControlAction::Reject.kind(), PreferenceKind::Rejected);
        assert_eq!(ControlAction::Ignore.kind(), PreferenceKind::Ignored);
    }

    #[test]
    fn test_page_event_json_shape() {
        let event: PageEvent =
            serde_json::from_str(r#"{"type":"control","action":"reject-job","job_id":"7"}"#)
                .unwrap();
        assert_eq!(
            event,
            PageEvent::Control(PreferenceControl::new(ControlAction::Reject, "7"))
        );

        let event: PageEvent =
            serde_json::from_str(r#"{"type":"visibility","state":"hidden"}"#).unwrap();
        assert_eq!(event, PageEvent::hidden());

        let event: PageEvent = serde_json::from_str(r#"{"type":"unload"}"#).unwrap();
        assert_eq!(event, PageEvent::Unload);
    }
}
