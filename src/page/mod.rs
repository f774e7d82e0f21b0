//! Boundary with the host page.
//!
//! The page itself (markup, cookies, visibility, clicks) is owned by the host.
//! This module describes what the signal client reads from it and the events
//! the host feeds in.

pub mod bus;
pub mod context;
pub mod types;

pub use bus::PageEventBus;
pub use context::{PageContext, PageError, TrackedItem};
pub use types::{ControlAction, PageEvent, PreferenceControl, Visibility};

/// Traffic source label used when the page URL carries none.
pub const DEFAULT_SOURCE: &str = "direct";

/// Cookie holding the cross-site request forgery token.
pub const CSRF_COOKIE: &str = "csrftoken";
