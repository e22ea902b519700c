//! Type registry: resolves markup class names to declared capabilities.
//!
//! Capabilities are static tags looked up per type; nothing is instantiated to
//! find out what a type can do.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::PreviewResult;

/// Capability tags a type declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Can be displayed as a widget (previewable).
    pub widget: bool,
    /// Can take part in declarative tree construction.
    pub buildable: bool,
    /// Is an independent top-level surface (a window).
    pub toplevel: bool,
}

impl Capabilities {
    pub const OBJECT: Capabilities = Capabilities {
        widget: false,
        buildable: false,
        toplevel: false,
    };
    pub const BUILDABLE: Capabilities = Capabilities {
        widget: false,
        buildable: true,
        toplevel: false,
    };
    pub const WIDGET: Capabilities = Capabilities {
        widget: true,
        buildable: true,
        toplevel: false,
    };
    pub const WINDOW: Capabilities = Capabilities {
        widget: true,
        buildable: true,
        toplevel: true,
    };
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Canonical name, namespace and class concatenated (`GtkLabel`).
    pub name: String,
    pub capabilities: Capabilities,
}

impl TypeInfo {
    pub fn is_widget(&self) -> bool {
        self.capabilities.widget
    }

    pub fn is_buildable(&self) -> bool {
        self.capabilities.buildable
    }

    pub fn is_toplevel(&self) -> bool {
        self.capabilities.toplevel
    }
}

/// Resolves class names from markup. `None` means "cannot classify", which is
/// never an error on its own.
pub trait TypeRegistry {
    fn resolve(&self, class_name: &str) -> Option<TypeInfo>;
}

// ─── Class names ─────────────────────────────────────────────────────────────

/// A class name split into namespace and class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub namespace: String,
    pub class: String,
}

impl TypeName {
    /// Split `Gtk.Label` or `GtkLabel` into (`Gtk`, `Label`).
    ///
    /// The concatenated form splits at the first upper-case letter after the
    /// leading namespace word, so `AdwApplicationWindow` is (`Adw`, `ApplicationWindow`).
    pub fn parse(class_name: &str) -> Option<TypeName> {
        static DOTTED: OnceLock<Regex> = OnceLock::new();
        static JOINED: OnceLock<Regex> = OnceLock::new();

        let dotted = DOTTED.get_or_init(|| {
            Regex::new(r"^([A-Za-z][A-Za-z0-9]*)\.([A-Za-z_][A-Za-z0-9_]*)$").unwrap()
        });
        let joined = JOINED.get_or_init(|| {
            Regex::new(r"^([A-Z][a-z0-9]*)([A-Z][A-Za-z0-9_]*)$").unwrap()
        });

        let caps = dotted
            .captures(class_name)
            .or_else(|| joined.captures(class_name))?;
        Some(TypeName {
            namespace: caps[1].to_string(),
            class: caps[2].to_string(),
        })
    }

    pub fn canonical(&self) -> String {
        format!("{}{}", self.namespace, self.class)
    }
}

// ─── Static registry ─────────────────────────────────────────────────────────

/// Catalog file format: namespace → class → capabilities.
pub type TypeCatalog = BTreeMap<String, BTreeMap<String, Capabilities>>;

/// Registry backed by a fixed table of known types.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeRegistry {
    namespaces: HashSet<String>,
    types: HashMap<String, Capabilities>,
}

impl StaticTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under `namespace` + `class`.
    pub fn register(&mut self, namespace: &str, class: &str, capabilities: Capabilities) {
        self.namespaces.insert(namespace.to_string());
        self.types
            .insert(format!("{}{}", namespace, class), capabilities);
    }

    /// Add every entry of a catalog.
    pub fn extend(&mut self, catalog: &TypeCatalog) {
        for (namespace, classes) in catalog {
            self.namespaces.insert(namespace.clone());
            for (class, capabilities) in classes {
                self.register(namespace, class, *capabilities);
            }
        }
    }

    /// Parse a YAML catalog and add its entries.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> PreviewResult<()> {
        let catalog: TypeCatalog = serde_yaml::from_str(yaml)?;
        self.extend(&catalog);
        Ok(())
    }

    /// Registry preloaded with the common GTK 4 / libadwaita types.
    pub fn gtk() -> Self {
        let mut registry = Self::new();

        for class in ["Window", "ApplicationWindow", "Dialog", "AboutDialog", "AssistantWindow"] {
            registry.register("Gtk", class, Capabilities::WINDOW);
        }
        for class in [
            "Box", "CenterBox", "Grid", "Stack", "StackSwitcher", "Notebook", "Paned",
            "ScrolledWindow", "Viewport", "Overlay", "Frame", "Expander", "Revealer",
            "HeaderBar", "ActionBar", "Label", "Button", "ToggleButton", "CheckButton",
            "LinkButton", "MenuButton", "Switch", "Entry", "PasswordEntry", "SearchEntry",
            "SpinButton", "Scale", "ProgressBar", "LevelBar", "Spinner", "Image", "Picture",
            "Separator", "TextView", "ListBox", "ListBoxRow", "FlowBox", "FlowBoxChild",
            "ListView", "GridView", "ColumnView", "DropDown", "Calendar", "DrawingArea",
            "GLArea", "Video", "Inscription", "EditableLabel", "ColorButton", "FontButton",
            "AspectFrame", "Fixed", "SearchBar", "PopoverMenu", "Popover", "InfoBar",
        ] {
            registry.register("Gtk", class, Capabilities::WIDGET);
        }
        for class in [
            "Adjustment", "SizeGroup", "StringList", "TextBuffer", "TextTag",
            "ShortcutController", "ConstraintLayout", "GridLayout", "BoxLayout",
            "SingleSelection", "NoSelection", "MultiSelection", "FileFilter", "EntryBuffer",
        ] {
            registry.register("Gtk", class, Capabilities::BUILDABLE);
        }
        for class in [
            "EventControllerKey", "EventControllerMotion", "GestureClick", "GestureDrag",
            "Settings", "IconTheme", "CssProvider", "StringObject",
        ] {
            registry.register("Gtk", class, Capabilities::OBJECT);
        }

        for class in ["Window", "ApplicationWindow", "PreferencesWindow", "AboutWindow"] {
            registry.register("Adw", class, Capabilities::WINDOW);
        }
        for class in [
            "Clamp", "ClampScrollable", "HeaderBar", "StatusPage", "ToastOverlay", "Avatar",
            "Bin", "ButtonContent", "Carousel", "CarouselIndicatorDots", "Flap", "Leaflet",
            "NavigationView", "NavigationPage", "PreferencesPage", "PreferencesGroup",
            "ActionRow", "EntryRow", "ExpanderRow", "ComboRow", "SwitchRow", "SplitButton",
            "TabBar", "TabView", "ToolbarView", "ViewStack", "ViewSwitcher", "WindowTitle",
            "Banner", "OverlaySplitView", "Spinner",
        ] {
            registry.register("Adw", class, Capabilities::WIDGET);
        }
        for class in ["Toast", "Animation", "StyleManager", "SpringParams"] {
            registry.register("Adw", class, Capabilities::OBJECT);
        }

        for class in ["Menu", "ListStore", "SimpleAction", "SimpleActionGroup"] {
            registry.register("Gio", class, Capabilities::OBJECT);
        }
        registry.register("GObject", "Object", Capabilities::OBJECT);

        registry
    }
}

impl TypeRegistry for StaticTypeRegistry {
    fn resolve(&self, class_name: &str) -> Option<TypeInfo> {
        let name = TypeName::parse(class_name)?;
        if !self.namespaces.contains(&name.namespace) {
            return None;
        }
        let canonical = name.canonical();
        let capabilities = *self.types.get(&canonical)?;
        Some(TypeInfo {
            name: canonical,
            capabilities,
        })
    }
}
