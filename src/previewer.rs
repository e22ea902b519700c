//! The update cycle and the state it reconciles across edits.
//!
//! Every markup or stylesheet notification runs one full cycle on the calling
//! (event) thread: parse → validate → build or forward → stylesheet. A cycle
//! that stops early leaves whatever the previous cycle mounted in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::PreviewConfig;
use crate::delegate::{ColorScheme, DelegateChannel, DelegateEvent, DelegateLauncher};
use crate::editor::{ChangeChannel, Editor, SubscriptionId};
use crate::error::{PreviewError, PreviewResult};
use crate::registry::TypeRegistry;
use crate::stylesheet::scope_stylesheet;
use crate::target::{resolve_target, Target};
use crate::toolkit::{adopt_child, ObjectGraph, StylePriority, Surface, Toolkit};
use crate::validator::assert_buildable;

/// Which backend renders the preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Objects are constructed and shown by the host itself.
    #[default]
    InProcess,
    /// Markup is forwarded to a delegate process that renders it.
    OutOfProcess,
}

/// How an update cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Markup did not parse, or has no previewable top-level object.
    NoTarget,
    /// The document references a type that cannot be built.
    Invalid(PreviewError),
    /// The construction layer rejected the document.
    ConstructionFailed(PreviewError),
    /// Construction succeeded but produced no object with the target id.
    TargetMissing { target_id: String },
    Rendered { target_id: String },
}

impl CycleOutcome {
    /// True when the cycle stopped before touching the preview surface.
    pub fn is_abandoned(&self) -> bool {
        matches!(
            self,
            CycleOutcome::NoTarget
                | CycleOutcome::Invalid(_)
                | CycleOutcome::ConstructionFailed(_)
        )
    }
}

/// Collaborators the previewer works with, handed over at construction.
pub struct PreviewContext<T: Toolkit> {
    pub toolkit: T,
    pub registry: Box<dyn TypeRegistry>,
    pub editor: Box<dyn Editor>,
    pub launcher: Box<dyn DelegateLauncher>,
}

/// Live preview engine.
pub struct Previewer<T: Toolkit> {
    toolkit: T,
    registry: Box<dyn TypeRegistry>,
    editor: Box<dyn Editor>,
    launcher: Box<dyn DelegateLauncher>,
    config: PreviewConfig,

    markup_subscription: Option<SubscriptionId>,
    stylesheet_subscription: Option<SubscriptionId>,

    mode: RenderMode,
    /// Persistent top-level object, kept across cycles in IN_PROCESS mode.
    preview_root: Option<T::Object>,
    style_provider: Option<T::StyleProvider>,
    delegate: Option<Box<dyn DelegateChannel>>,
    color_scheme: ColorScheme,
}

impl<T: Toolkit> Previewer<T> {
    /// Create a stopped previewer in IN_PROCESS mode. Call [`Previewer::start`]
    /// to begin reacting to edits.
    pub fn new(context: PreviewContext<T>, config: PreviewConfig) -> Self {
        Self {
            toolkit: context.toolkit,
            registry: context.registry,
            editor: context.editor,
            launcher: context.launcher,
            config,
            markup_subscription: None,
            stylesheet_subscription: None,
            mode: RenderMode::InProcess,
            preview_root: None,
            style_provider: None,
            delegate: None,
            color_scheme: ColorScheme::Default,
        }
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn preview_root(&self) -> Option<&T::Object> {
        self.preview_root.as_ref()
    }

    pub fn has_style_provider(&self) -> bool {
        self.style_provider.is_some()
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    // ─── Subscriptions ───────────────────────────────────────────────────────

    /// Subscribe to markup and stylesheet changes. Restarts cleanly when
    /// already started, so exactly one subscription pair is ever active.
    pub fn start(&mut self) {
        self.stop();
        self.markup_subscription = Some(self.editor.subscribe(ChangeChannel::Markup));
        self.stylesheet_subscription = Some(self.editor.subscribe(ChangeChannel::Stylesheet));
    }

    /// Drop both subscriptions. No-op when already stopped.
    pub fn stop(&mut self) {
        if let Some(id) = self.markup_subscription.take() {
            self.editor.unsubscribe(id);
        }
        if let Some(id) = self.stylesheet_subscription.take() {
            self.editor.unsubscribe(id);
        }
    }

    pub fn is_started(&self) -> bool {
        self.markup_subscription.is_some() && self.stylesheet_subscription.is_some()
    }

    /// Deliver a change notification. Runs a cycle when `id` is one of the
    /// active subscriptions; stale or foreign ids are ignored.
    pub fn handle_change(&mut self, id: SubscriptionId) -> Option<CycleOutcome> {
        let active = self.markup_subscription == Some(id)
            || self.stylesheet_subscription == Some(id);
        active.then(|| self.update())
    }

    // ─── Update cycle ────────────────────────────────────────────────────────

    /// Run one update cycle against the current editor contents.
    pub fn update(&mut self) -> CycleOutcome {
        let outcome = self.render_markup();
        if outcome.is_abandoned() {
            return outcome;
        }
        self.apply_stylesheet();
        outcome
    }

    fn render_markup(&mut self) -> CycleOutcome {
        let markup = self.editor.markup();
        let target = match resolve_target(
            markup.trim(),
            self.registry.as_ref(),
            &self.config.target_id,
        ) {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!("no previewable object in markup");
                return CycleOutcome::NoTarget;
            }
            Err(err) => {
                debug!(error = %err, "markup did not parse");
                return CycleOutcome::NoTarget;
            }
        };

        if let Err(err) = assert_buildable(&target.document, self.registry.as_ref()) {
            error!(error = %err, "preview not updated");
            return CycleOutcome::Invalid(err);
        }

        let graph = match self.toolkit.build(&target.markup) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(error = %err, "construction failed, preview not updated");
                return CycleOutcome::ConstructionFailed(err);
            }
        };

        let Some(object) = graph.object(&target.id) else {
            warn!(target_id = %target.id, "constructed objects do not contain the target");
            return CycleOutcome::TargetMissing {
                target_id: target.id,
            };
        };

        if target.type_info.is_toplevel() {
            self.show_window(object, &target);
        } else {
            self.show_widget(object, &target);
        }

        CycleOutcome::Rendered {
            target_id: target.id,
        }
    }

    /// The target is a top-level container.
    fn show_window(&mut self, window: T::Object, target: &Target) {
        self.toolkit.mount(Surface::PreviewWindow);

        match self.mode {
            RenderMode::InProcess => match &self.preview_root {
                None => {
                    self.toolkit.set_hide_on_close(&window, true);
                    self.preview_root = Some(window);
                }
                Some(root) => {
                    // the persistent window stays; only its content moves over
                    adopt_child(&mut self.toolkit, &window, root);
                    self.toolkit.destroy(window);
                }
            },
            RenderMode::OutOfProcess => {
                self.toolkit.destroy(window);
                self.forward_ui(target);
            }
        }
    }

    /// The target is an embeddable widget.
    fn show_widget(&mut self, widget: T::Object, target: &Target) {
        self.toolkit.mount(Surface::Widget(&widget));
        if let Some(root) = self.preview_root.take() {
            self.toolkit.destroy(root);
        }
        if self.mode == RenderMode::OutOfProcess {
            self.forward_ui(target);
        }
    }

    fn forward_ui(&mut self, target: &Target) {
        let Some(delegate) = self.delegate.as_mut() else {
            debug!("no delegate, markup not forwarded");
            return;
        };
        if let Err(err) = delegate.update_ui(&target.markup, &target.id) {
            warn!(error = %err, "delegate did not take the markup");
        }
    }

    fn apply_stylesheet(&mut self) {
        if let Some(provider) = self.style_provider.take() {
            self.toolkit.remove_style_provider(provider);
        }

        let css = self.editor.stylesheet();
        if css.is_empty() {
            return;
        }

        match scope_stylesheet(&css, &self.config.scope_selector) {
            Ok(scoped) => {
                match self
                    .toolkit
                    .add_style_provider(&scoped, StylePriority::Application)
                {
                    Ok(provider) => self.style_provider = Some(provider),
                    Err(err) => warn!(error = %err, "stylesheet not installed"),
                }
            }
            Err(err) => debug!(error = %err, "stylesheet did not parse, leaving it uninstalled"),
        }

        if self.mode == RenderMode::OutOfProcess {
            if let Some(delegate) = self.delegate.as_mut() {
                if let Err(err) = delegate.update_css(&css) {
                    warn!(error = %err, "delegate did not take the stylesheet");
                }
            }
        }
    }

    // ─── Render mode & delegate ──────────────────────────────────────────────

    /// Switch render mode by runtime label (e.g. `"JavaScript"`, `"Vala"`).
    ///
    /// Unknown labels leave the current mode untouched.
    pub fn set_runtime(&mut self, label: &str) -> PreviewResult<()> {
        let mode = self.config.mode_for(label)?;
        self.set_mode(mode);
        Ok(())
    }

    /// Switch render mode.
    ///
    /// Entering OUT_OF_PROCESS releases the preview window and starts a
    /// delegate if none is running. Entering IN_PROCESS kills a running
    /// delegate and re-renders right away.
    pub fn set_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            info!(from = ?self.mode, to = ?mode, "render mode switched");
        }
        self.mode = mode;

        match mode {
            RenderMode::OutOfProcess => {
                if let Some(root) = self.preview_root.take() {
                    self.toolkit.destroy(root);
                }
                if self.delegate.is_none() {
                    self.spawn_delegate();
                }
            }
            RenderMode::InProcess => {
                if let Some(mut delegate) = self.delegate.take() {
                    delegate.terminate();
                    self.update();
                }
            }
        }
    }

    fn spawn_delegate(&mut self) {
        match self.launcher.launch() {
            Ok(mut delegate) => {
                if let Err(err) = delegate.set_color_scheme(self.color_scheme) {
                    warn!(error = %err, "delegate did not take the color scheme");
                }
                self.delegate = Some(delegate);
            }
            Err(err) => error!(error = %err, "delegate not started, out-of-process preview unavailable"),
        }
    }

    /// Apply notifications queued by the delegate. Returns how many were handled.
    pub fn dispatch_delegate_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.delegate.as_mut().and_then(|d| d.poll_event()) {
            handled += 1;
            match event {
                DelegateEvent::WindowState { open: true } => {
                    self.toolkit.mount(Surface::ExternalPreview);
                }
                DelegateEvent::WindowState { open: false } => {
                    self.update();
                }
            }
        }
        handled
    }

    /// Record the host's light/dark preference and mirror it to the delegate.
    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        self.color_scheme = scheme;
        if let Some(delegate) = self.delegate.as_mut() {
            if let Err(err) = delegate.set_color_scheme(scheme) {
                warn!(error = %err, "delegate did not take the color scheme");
            }
        }
    }

    /// Ask the delegate to close its preview window. The process keeps running.
    pub fn close_external_preview(&mut self) {
        if let Some(delegate) = self.delegate.as_mut() {
            if let Err(err) = delegate.close_window() {
                warn!(error = %err, "delegate did not close its window");
            }
        }
    }

    /// Raise the persistent preview window (IN_PROCESS mode only).
    pub fn present_preview_window(&mut self) {
        if self.mode != RenderMode::InProcess {
            return;
        }
        if let Some(root) = &self.preview_root {
            self.toolkit.present(root);
        }
    }
}
