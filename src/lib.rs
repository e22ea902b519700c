//! # Workbench live preview
//!
//! Turns the markup and stylesheet being edited into a live preview.
//!
//! ## Features
//! - Locates the object to preview and gives it a stable id
//! - Rejects documents containing non-buildable types before construction
//! - Scopes stylesheets to the preview surface
//! - Renders in-process through a host [`Toolkit`], or forwards to a delegate
//!   process for runtimes the host cannot execute
//!
//! ## Example
//! ```ignore
//! use workbench_preview::{
//!     PreviewConfig, PreviewContext, Previewer, ProcessLauncher, StaticTypeRegistry,
//! };
//!
//! let config = PreviewConfig::load("preview.yaml")?;
//! let mut previewer = Previewer::new(
//!     PreviewContext {
//!         toolkit: host_toolkit,
//!         registry: Box::new(StaticTypeRegistry::gtk()),
//!         editor: Box::new(editor),
//!         launcher: Box::new(ProcessLauncher::from_config(&config.delegate)),
//!     },
//!     config,
//! );
//! previewer.start();
//!
//! // on every editor notification
//! previewer.handle_change(subscription);
//! // on every event-loop iteration
//! previewer.dispatch_delegate_events();
//! ```
//!
//! ## Example: checking a document without a toolkit
//! ```ignore
//! use workbench_preview::{target_buildable, StaticTypeRegistry};
//!
//! let registry = StaticTypeRegistry::gtk();
//! let (target_id, markup) =
//!     target_buildable(r#"<object class="Gtk.Label"/>"#, &registry, "workbench_target");
//! assert_eq!(target_id.as_deref(), Some("workbench_target"));
//! ```

pub mod config;
pub mod delegate;
pub mod editor;
pub mod error;
pub mod previewer;
pub mod registry;
pub mod stylesheet;
pub mod target;
pub mod toolkit;
pub mod tree;
pub mod validator;

// --- Core types ---
pub use config::{DelegateConfig, PreviewConfig};
pub use error::{PreviewError, PreviewResult};
pub use previewer::{CycleOutcome, PreviewContext, Previewer, RenderMode};
pub use tree::{Element, Node};

// --- Collaborators ---
pub use delegate::{
    ColorScheme, DelegateChannel, DelegateEvent, DelegateLauncher, ProcessDelegate,
    ProcessLauncher,
};
pub use editor::{ChangeChannel, Editor, SubscriptionId};
pub use registry::{Capabilities, StaticTypeRegistry, TypeInfo, TypeRegistry};
pub use toolkit::{ObjectGraph, StylePriority, Surface, Toolkit};

// --- Pipeline steps ---
pub use stylesheet::scope_stylesheet;
pub use target::{resolve_target, target_buildable, Target};
pub use tree::parse_markup;
pub use validator::assert_buildable;
