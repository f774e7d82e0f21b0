//! Transparency module for the signal client.
//!
//! Counts what the client has reported so the user can see exactly which
//! signals left the page.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedSignalLog, SignalLog, SignalStats,
};
