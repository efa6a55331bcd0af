//! Static graph schema: element kinds and their feature tables.
//!
//! The schema is immutable data. Every kind carries a `&'static [FeatureDef]`
//! describing the named slots an element of that kind may hold.

use crate::model::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type of an attribute feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Str,
    Bool,
    Int,
    /// Closed set of literals
    Enum(&'static [&'static str]),
}

impl ValueType {
    /// Whether `value` is a legal value for this type
    pub fn accepts(&self, value: &Scalar) -> bool {
        match (self, value) {
            (ValueType::Str, Scalar::Str(_)) => true,
            (ValueType::Bool, Scalar::Bool(_)) => true,
            (ValueType::Int, Scalar::Int(_)) => true,
            (ValueType::Enum(literals), Scalar::Enum(v)) => literals.contains(&v.as_str()),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Str => "string",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Enum(_) => "enum",
        }
    }
}

/// Declared default of an attribute, in static form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Bool(bool),
    Int(i64),
    Enum(&'static str),
}

impl DefaultValue {
    pub fn to_scalar(self) -> Scalar {
        match self {
            DefaultValue::Str(s) => Scalar::Str(s.to_string()),
            DefaultValue::Bool(b) => Scalar::Bool(b),
            DefaultValue::Int(i) => Scalar::Int(i),
            DefaultValue::Enum(e) => Scalar::Enum(e.to_string()),
        }
    }
}

/// Shape of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Attribute {
        value_type: ValueType,
        default: Option<DefaultValue>,
    },
    /// Single-valued pointer, no ownership
    Reference,
    /// Ordered children owned by the element
    ContainmentList,
    /// Ordered pointers to elements owned elsewhere
    ReferenceList,
}

impl FeatureType {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureType::Attribute { .. } => "attribute",
            FeatureType::Reference => "reference",
            FeatureType::ContainmentList => "containment list",
            FeatureType::ReferenceList => "reference list",
        }
    }
}

/// A named slot on an element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDef {
    pub name: &'static str,
    pub feature_type: FeatureType,
}

impl FeatureDef {
    /// Schema default for an attribute; `None` for non-attributes and
    /// attributes without a declared default
    pub fn default_value(&self) -> Option<Scalar> {
        match self.feature_type {
            FeatureType::Attribute {
                default: Some(d), ..
            } => Some(d.to_scalar()),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self.feature_type,
            FeatureType::ContainmentList | FeatureType::ReferenceList
        )
    }

    pub fn is_containment(&self) -> bool {
        self.feature_type == FeatureType::ContainmentList
    }

    /// `true` when `value` is the declared default of this attribute
    pub fn is_default(&self, value: &Scalar) -> bool {
        self.default_value().as_ref() == Some(value)
    }
}

const fn attr(name: &'static str, value_type: ValueType, default: Option<DefaultValue>) -> FeatureDef {
    FeatureDef {
        name,
        feature_type: FeatureType::Attribute {
            value_type,
            default,
        },
    }
}

const fn reference(name: &'static str) -> FeatureDef {
    FeatureDef {
        name,
        feature_type: FeatureType::Reference,
    }
}

const fn contains(name: &'static str) -> FeatureDef {
    FeatureDef {
        name,
        feature_type: FeatureType::ContainmentList,
    }
}

const fn ref_list(name: &'static str) -> FeatureDef {
    FeatureDef {
        name,
        feature_type: FeatureType::ReferenceList,
    }
}

/// Literals of `MenuItem.kind`
pub const ITEM_KINDS: &[&str] = &["Push", "Check", "Radio"];

const LABEL: FeatureDef = attr("label", ValueType::Str, None);
const TOOLTIP: FeatureDef = attr("tooltip", ValueType::Str, None);
const ICON_URI: FeatureDef = attr("icon_uri", ValueType::Str, None);
const VISIBLE: FeatureDef = attr("visible", ValueType::Bool, Some(DefaultValue::Bool(true)));
const TO_BE_RENDERED: FeatureDef =
    attr("to_be_rendered", ValueType::Bool, Some(DefaultValue::Bool(true)));
const CONTAINER_DATA: FeatureDef = attr("container_data", ValueType::Str, None);
const CONTRIBUTION_URI: FeatureDef = attr("contribution_uri", ValueType::Str, None);

const APPLICATION: &[FeatureDef] = &[
    reference("selected_element"),
    contains("children"),
    contains("commands"),
    contains("handlers"),
    contains("binding_tables"),
    contains("root_contexts"),
];

const WINDOW: &[FeatureDef] = &[
    LABEL,
    TOOLTIP,
    ICON_URI,
    VISIBLE,
    TO_BE_RENDERED,
    attr("x", ValueType::Int, Some(DefaultValue::Int(0))),
    attr("y", ValueType::Int, Some(DefaultValue::Int(0))),
    attr("width", ValueType::Int, Some(DefaultValue::Int(0))),
    attr("height", ValueType::Int, Some(DefaultValue::Int(0))),
    reference("selected_element"),
    contains("children"),
    contains("shared_elements"),
    contains("menus"),
    contains("handlers"),
];

const PART_SASH_CONTAINER: &[FeatureDef] = &[
    attr("horizontal", ValueType::Bool, Some(DefaultValue::Bool(false))),
    CONTAINER_DATA,
    VISIBLE,
    TO_BE_RENDERED,
    reference("selected_element"),
    contains("children"),
];

const PART_STACK: &[FeatureDef] = &[
    CONTAINER_DATA,
    VISIBLE,
    TO_BE_RENDERED,
    reference("selected_element"),
    contains("children"),
    ref_list("activation_order"),
];

const PART: &[FeatureDef] = &[
    LABEL,
    TOOLTIP,
    ICON_URI,
    CONTRIBUTION_URI,
    attr("closeable", ValueType::Bool, Some(DefaultValue::Bool(false))),
    CONTAINER_DATA,
    VISIBLE,
    TO_BE_RENDERED,
    contains("menus"),
    contains("handlers"),
];

const PLACEHOLDER: &[FeatureDef] = &[
    reference("ref"),
    attr("closeable", ValueType::Bool, Some(DefaultValue::Bool(false))),
    CONTAINER_DATA,
    VISIBLE,
    TO_BE_RENDERED,
];

const MENU: &[FeatureDef] = &[
    LABEL,
    attr("mnemonics", ValueType::Str, None),
    VISIBLE,
    attr("enabled", ValueType::Bool, Some(DefaultValue::Bool(true))),
    contains("children"),
];

const MENU_ITEM: &[FeatureDef] = &[
    LABEL,
    TOOLTIP,
    ICON_URI,
    attr("kind", ValueType::Enum(ITEM_KINDS), Some(DefaultValue::Enum("Push"))),
    attr("selected", ValueType::Bool, Some(DefaultValue::Bool(false))),
    attr("enabled", ValueType::Bool, Some(DefaultValue::Bool(true))),
    VISIBLE,
    reference("command"),
    contains("parameters"),
];

const TOOL_BAR: &[FeatureDef] = &[VISIBLE, TO_BE_RENDERED, contains("children")];

const COMMAND: &[FeatureDef] = &[
    attr("command_name", ValueType::Str, None),
    attr("description", ValueType::Str, None),
    attr("category", ValueType::Str, None),
    contains("parameters"),
];

const COMMAND_PARAMETER: &[FeatureDef] = &[
    attr("name", ValueType::Str, None),
    attr("type_id", ValueType::Str, None),
    attr("optional", ValueType::Bool, Some(DefaultValue::Bool(true))),
];

const HANDLER: &[FeatureDef] = &[CONTRIBUTION_URI, reference("command")];

const BINDING_CONTEXT: &[FeatureDef] = &[
    attr("name", ValueType::Str, None),
    attr("description", ValueType::Str, None),
    contains("children"),
];

const BINDING_TABLE: &[FeatureDef] = &[reference("binding_context"), contains("bindings")];

const KEY_BINDING: &[FeatureDef] = &[
    attr("key_sequence", ValueType::Str, None),
    reference("command"),
    contains("parameters"),
];

const PARAMETER: &[FeatureDef] = &[
    attr("name", ValueType::Str, None),
    attr("value", ValueType::Str, None),
];

/// Closed enumeration of element kinds in the application model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Application,
    Window,
    PartSashContainer,
    PartStack,
    Part,
    Placeholder,
    Menu,
    MenuItem,
    ToolBar,
    Command,
    CommandParameter,
    Handler,
    BindingContext,
    BindingTable,
    KeyBinding,
    Parameter,
}

impl ElementKind {
    pub const ALL: [ElementKind; 16] = [
        ElementKind::Application,
        ElementKind::Window,
        ElementKind::PartSashContainer,
        ElementKind::PartStack,
        ElementKind::Part,
        ElementKind::Placeholder,
        ElementKind::Menu,
        ElementKind::MenuItem,
        ElementKind::ToolBar,
        ElementKind::Command,
        ElementKind::CommandParameter,
        ElementKind::Handler,
        ElementKind::BindingContext,
        ElementKind::BindingTable,
        ElementKind::KeyBinding,
        ElementKind::Parameter,
    ];

    /// Feature table of this kind, in declaration order
    pub fn features(&self) -> &'static [FeatureDef] {
        match self {
            ElementKind::Application => APPLICATION,
            ElementKind::Window => WINDOW,
            ElementKind::PartSashContainer => PART_SASH_CONTAINER,
            ElementKind::PartStack => PART_STACK,
            ElementKind::Part => PART,
            ElementKind::Placeholder => PLACEHOLDER,
            ElementKind::Menu => MENU,
            ElementKind::MenuItem => MENU_ITEM,
            ElementKind::ToolBar => TOOL_BAR,
            ElementKind::Command => COMMAND,
            ElementKind::CommandParameter => COMMAND_PARAMETER,
            ElementKind::Handler => HANDLER,
            ElementKind::BindingContext => BINDING_CONTEXT,
            ElementKind::BindingTable => BINDING_TABLE,
            ElementKind::KeyBinding => KEY_BINDING,
            ElementKind::Parameter => PARAMETER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Application => "Application",
            ElementKind::Window => "Window",
            ElementKind::PartSashContainer => "PartSashContainer",
            ElementKind::PartStack => "PartStack",
            ElementKind::Part => "Part",
            ElementKind::Placeholder => "Placeholder",
            ElementKind::Menu => "Menu",
            ElementKind::MenuItem => "MenuItem",
            ElementKind::ToolBar => "ToolBar",
            ElementKind::Command => "Command",
            ElementKind::CommandParameter => "CommandParameter",
            ElementKind::Handler => "Handler",
            ElementKind::BindingContext => "BindingContext",
            ElementKind::BindingTable => "BindingTable",
            ElementKind::KeyBinding => "KeyBinding",
            ElementKind::Parameter => "Parameter",
        }
    }

    pub fn from_name(name: &str) -> Option<ElementKind> {
        ElementKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a feature by name; `None` means "no such feature"
pub fn lookup(kind: ElementKind, name: &str) -> Option<&'static FeatureDef> {
    kind.features().iter().find(|f| f.name == name)
}
