//! Buildability check run before any construction is attempted.
//!
//! Construction aborts the host on a non-buildable type, so any document
//! proven invalid here never reaches it. Types the registry cannot classify
//! are skipped.

use crate::error::{PreviewError, PreviewResult};
use crate::registry::TypeRegistry;
use crate::target::OBJECT_TAG;
use crate::tree::Element;

/// Tag of the child relation followed during validation.
pub const CHILD_TAG: &str = "child";

/// Walk every `object` under `node` and its `child` relations.
///
/// Fails with [`PreviewError::NotBuildable`] on the first resolved type that
/// lacks the buildable capability.
pub fn assert_buildable(node: &Element, registry: &dyn TypeRegistry) -> PreviewResult<()> {
    for object in node.children_named(OBJECT_TAG) {
        let Some(class_name) = object.attr("class") else {
            continue;
        };
        let Some(type_info) = registry.resolve(class_name) else {
            continue;
        };
        if !type_info.is_buildable() {
            return Err(PreviewError::NotBuildable {
                type_name: class_name.to_string(),
            });
        }
        for child in object.children_named(CHILD_TAG) {
            assert_buildable(child, registry)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticTypeRegistry;
    use crate::tree::parse_markup;

    fn check(xml: &str) -> PreviewResult<()> {
        let registry = StaticTypeRegistry::gtk();
        assert_buildable(&parse_markup(xml).unwrap(), &registry)
    }

    #[test]
    fn plain_widgets_pass() {
        assert!(check(r#"<object class="Gtk.Label"/>"#).is_ok());
    }

    #[test]
    fn non_buildable_top_level_fails_with_type_name() {
        let err = check(r#"<object class="Gtk.EventControllerKey"/>"#).unwrap_err();
        assert_eq!(
            err,
            PreviewError::NotBuildable {
                type_name: "Gtk.EventControllerKey".to_string()
            }
        );
        assert_eq!(err.to_string(), "Gtk.EventControllerKey is not buildable");
    }

    #[test]
    fn non_buildable_nested_child_fails() {
        let xml = r#"<interface>
  <object class="GtkWindow">
    <child>
      <object class="GtkBox">
        <child><object class="GtkGestureClick"/></child>
      </object>
    </child>
  </object>
</interface>"#;
        let err = check(xml).unwrap_err();
        assert!(matches!(err, PreviewError::NotBuildable { ref type_name } if type_name == "GtkGestureClick"));
    }

    #[test]
    fn every_child_slot_is_walked() {
        let xml = r#"<object class="GtkHeaderBar">
  <child type="start"><object class="GtkButton"/></child>
  <child type="end"><object class="Gio.ListStore"/></child>
</object>"#;
        assert!(check(xml).is_err());
    }

    #[test]
    fn unresolvable_types_are_skipped() {
        assert!(check(r#"<object class="Foo.Widget"><child><object class="Bar.Thing"/></child></object>"#).is_ok());
        assert!(check(r#"<object id="no_class"/>"#).is_ok());
    }

    #[test]
    fn objects_outside_child_relations_are_not_walked() {
        let xml = r#"<object class="GtkLabel">
  <property name="model"><object class="Gio.ListStore"/></property>
</object>"#;
        assert!(check(xml).is_ok());
    }
}
