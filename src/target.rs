//! Target resolution: pick the node to preview and make sure it carries an id.

use tracing::debug;

use crate::error::PreviewResult;
use crate::registry::{TypeInfo, TypeRegistry};
use crate::tree::{parse_markup, Element, Node};

/// Tag of nodes that declare an object.
pub const OBJECT_TAG: &str = "object";

/// The node chosen as preview root for one update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Id of the target node in `document`.
    pub id: String,
    /// Resolved type of the target node.
    pub type_info: TypeInfo,
    /// Normalized tree (target id guaranteed present).
    pub document: Element,
    /// Serialized form of `document`, handed to the construction layer.
    pub markup: String,
    /// Whether `id` was injected by normalization.
    pub injected: bool,
}

/// Position and type of the first previewable node among the root's direct children.
///
/// Only direct `object` children are scanned; nested objects are never
/// considered as alternative candidates.
pub fn find_previewable(
    root: &Element,
    registry: &dyn TypeRegistry,
) -> Option<(usize, TypeInfo)> {
    root.children.iter().enumerate().find_map(|(index, node)| {
        let Node::Element(child) = node else {
            return None;
        };
        if child.tag != OBJECT_TAG {
            return None;
        }
        let type_info = registry.resolve(child.attr("class")?)?;
        type_info.is_widget().then_some((index, type_info))
    })
}

/// Return a new tree where the child at `index` has an `id`, plus that id.
///
/// Children that already carry an id are left untouched.
pub fn normalize(root: &Element, index: usize, reserved_id: &str) -> (Element, String, bool) {
    let mut document = root.clone();

    let Some(Node::Element(child)) = document.children.get_mut(index) else {
        return (document, String::new(), false);
    };
    if let Some(existing) = child.attr("id") {
        let id = existing.to_string();
        return (document, id, false);
    }

    child.attrs.insert("id".to_string(), reserved_id.to_string());
    (document, reserved_id.to_string(), true)
}

/// Resolve the preview target in an already parsed tree.
pub fn resolve_tree(
    root: &Element,
    registry: &dyn TypeRegistry,
    reserved_id: &str,
) -> Option<Target> {
    let (index, type_info) = find_previewable(root, registry)?;
    let (document, id, injected) = normalize(root, index, reserved_id);
    let markup = document.to_markup();

    Some(Target {
        id,
        type_info,
        document,
        markup,
        injected,
    })
}

/// Parse markup and resolve its preview target.
///
/// `Ok(None)` means the document has no previewable top-level node.
pub fn resolve_target(
    markup: &str,
    registry: &dyn TypeRegistry,
    reserved_id: &str,
) -> PreviewResult<Option<Target>> {
    let root = parse_markup(markup)?;
    Ok(resolve_tree(&root, registry, reserved_id))
}

/// `(target_id, normalized_text)` form of [`resolve_target`].
///
/// Malformed markup and documents without a previewable node both yield
/// `(None, "")`; the parse failure is only logged at debug level.
pub fn target_buildable(
    markup: &str,
    registry: &dyn TypeRegistry,
    reserved_id: &str,
) -> (Option<String>, String) {
    match resolve_target(markup, registry, reserved_id) {
        Ok(Some(target)) => (Some(target.id), target.markup),
        Ok(None) => (None, String::new()),
        Err(err) => {
            debug!(error = %err, "markup did not parse");
            (None, String::new())
        }
    }
}
