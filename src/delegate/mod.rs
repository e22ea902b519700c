//! Delegate process coordination.
//!
//! When the previewed document targets a runtime the host cannot execute, the
//! preview is rendered by a helper process driven over a control channel.
//! Calls are synchronous and block the event thread for at most the
//! configured timeout; a hung helper therefore stalls the UI until then.

pub mod process;
pub mod protocol;

use serde::{Deserialize, Serialize};

use crate::error::PreviewResult;

pub use process::{ProcessDelegate, ProcessLauncher};

/// Host light/dark preference, mirrored to the delegate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    #[default]
    Default,
    ForceLight,
    PreferLight,
    PreferDark,
    ForceDark,
}

/// Notifications pushed from the delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateEvent {
    /// The delegate opened (`true`) or closed (`false`) its own preview window.
    WindowState { open: bool },
}

/// Control channel to a running delegate.
pub trait DelegateChannel {
    /// Render `markup`, previewing the object named `target_id`.
    fn update_ui(&mut self, markup: &str, target_id: &str) -> PreviewResult<()>;

    /// Install an (unscoped) stylesheet; the delegate scopes it itself.
    fn update_css(&mut self, css: &str) -> PreviewResult<()>;

    /// Close the delegate's preview window. The process keeps running.
    fn close_window(&mut self) -> PreviewResult<()>;

    fn set_color_scheme(&mut self, scheme: ColorScheme) -> PreviewResult<()>;

    /// Next queued notification, if any. Never blocks.
    fn poll_event(&mut self) -> Option<DelegateEvent>;

    /// Kill the delegate process. Safe to call more than once.
    fn terminate(&mut self);
}

/// Starts delegates.
pub trait DelegateLauncher {
    fn launch(&self) -> PreviewResult<Box<dyn DelegateChannel>>;
}
