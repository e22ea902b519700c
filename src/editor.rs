//! Source collaborator: the editor buffers holding markup and stylesheet text.

/// Which buffer a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeChannel {
    /// Fires when the serialized markup changes meaningfully.
    Markup,
    /// Fires at the end of every user edit of the stylesheet.
    Stylesheet,
}

/// Handle returned by [`Editor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Editor buffers and their change notifications.
///
/// Notifications carry no payload; the previewer re-reads the text through
/// [`Editor::markup`] / [`Editor::stylesheet`].
pub trait Editor {
    fn markup(&self) -> String;
    fn stylesheet(&self) -> String;
    fn subscribe(&mut self, channel: ChangeChannel) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
}
