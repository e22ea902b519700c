//! Widget-construction and display collaborators.
//!
//! The previewer never touches a real widget toolkit directly; hosts implement
//! [`Toolkit`] over theirs (and tests over a recording fake).

use std::fmt;

use crate::error::PreviewResult;

/// Objects produced by one construction pass, queryable by id.
pub trait ObjectGraph {
    type Object;

    fn object(&self, id: &str) -> Option<Self::Object>;
}

/// What the preview pane shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface<'a, O> {
    /// Placeholder shown while the preview lives in its own window.
    PreviewWindow,
    /// Placeholder shown while a delegate process owns the preview window.
    ExternalPreview,
    /// A constructed widget mounted directly.
    Widget(&'a O),
}

/// Style provider priorities, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StylePriority {
    Fallback = 1,
    Theme = 200,
    Settings = 400,
    Application = 600,
    User = 800,
}

impl StylePriority {
    pub fn value(self) -> u32 {
        self as u32
    }
}

/// Host toolkit operations used by the update cycle.
pub trait Toolkit {
    type Object: Clone + PartialEq + fmt::Debug;
    type StyleProvider;
    type Graph: ObjectGraph<Object = Self::Object>;

    /// Construct every object declared in `markup`. Fails as a whole; no
    /// partial graph is returned.
    fn build(&mut self, markup: &str) -> PreviewResult<Self::Graph>;

    /// Replace what the preview pane displays.
    fn mount(&mut self, surface: Surface<'_, Self::Object>);

    /// Current content child of a top-level object.
    fn content(&self, window: &Self::Object) -> Option<Self::Object>;

    /// Set (or clear) the content child of a top-level object.
    fn set_content(&mut self, window: &Self::Object, child: Option<&Self::Object>);

    /// Make the close action hide the window instead of destroying it.
    fn set_hide_on_close(&mut self, window: &Self::Object, hide: bool);

    /// Raise a top-level object to the user.
    fn present(&mut self, window: &Self::Object);

    fn destroy(&mut self, object: Self::Object);

    fn add_style_provider(
        &mut self,
        css: &str,
        priority: StylePriority,
    ) -> PreviewResult<Self::StyleProvider>;

    fn remove_style_provider(&mut self, provider: Self::StyleProvider);
}

/// Move the content child of `from` onto `to`, leaving `from` empty.
pub fn adopt_child<T: Toolkit + ?Sized>(toolkit: &mut T, from: &T::Object, to: &T::Object) {
    let child = toolkit.content(from);
    toolkit.set_content(from, None);
    toolkit.set_content(to, child.as_ref());
}
