//! Core types for the layout engine

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::style::StyleSetter;

use super::constraint::Constraint;
use super::key::{is_valid_segment, LayoutKey};

/// A 2D point in the coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding box representing the spatial extent of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

/// Kind of a layout element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutType {
    /// Positioned box with a concrete size
    Node,
    /// Parent scope for nested element keys
    Group,
    /// Connection visual; takes no part in positioning
    Link,
}

impl LayoutType {
    pub const ALL: [LayoutType; 3] = [LayoutType::Node, LayoutType::Group, LayoutType::Link];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::Node => "Node",
            LayoutType::Group => "Group",
            LayoutType::Link => "Link",
        }
    }
}

impl FromStr for LayoutType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Coordinate axis a constraint acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

/// Which side of a node a terminal sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalRole {
    Inlet,
    Outlet,
}

/// Geometry override for a terminal; unset fields keep their defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalStyle {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// A named inlet or outlet declared by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalDecl {
    pub name: String,
    /// Free-form description carried through to the registry
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub style: TerminalStyle,
}

impl TerminalDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            style: TerminalStyle::default(),
        }
    }

    pub fn with_style(mut self, style: TerminalStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// Declared properties of a `Node` element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeProps {
    pub width: f64,
    pub height: f64,
    pub inlets: Vec<TerminalDecl>,
    pub outlets: Vec<TerminalDecl>,
    /// Extra constraints declared by the author, in absolute keys
    pub constraints: Vec<Constraint<LayoutKey>>,
}

impl NodeProps {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            inlets: Vec::new(),
            outlets: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_inlet(mut self, inlet: impl Into<TerminalDecl>) -> Self {
        self.inlets.push(inlet.into());
        self
    }

    pub fn with_outlet(mut self, outlet: impl Into<TerminalDecl>) -> Self {
        self.outlets.push(outlet.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint<LayoutKey>) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Check geometry and terminal declarations
    pub fn validate(&self, element: &str) -> Result<(), ConfigError> {
        if !is_positive(self.width) {
            return Err(ConfigError::InvalidWidth {
                element: element.to_string(),
                found: Some(self.width),
                span: None,
            });
        }
        if !is_positive(self.height) {
            return Err(ConfigError::InvalidHeight {
                element: element.to_string(),
                found: Some(self.height),
                span: None,
            });
        }

        let mut seen: Vec<&str> = Vec::new();
        for decl in self.inlets.iter().chain(&self.outlets) {
            if !is_valid_segment(&decl.name) {
                return Err(ConfigError::InvalidTerminalName {
                    element: element.to_string(),
                    name: decl.name.clone(),
                    span: None,
                });
            }
            if seen.contains(&decl.name.as_str()) {
                return Err(ConfigError::DuplicateTerminal {
                    element: element.to_string(),
                    name: decl.name.clone(),
                    span: None,
                });
            }
            seen.push(&decl.name);
            validate_terminal_style(element, decl)?;
        }
        Ok(())
    }
}

impl From<&str> for TerminalDecl {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_terminal_style(element: &str, decl: &TerminalDecl) -> Result<(), ConfigError> {
    let style = &decl.style;
    let fields = [
        ("left", style.left, false),
        ("top", style.top, false),
        ("width", style.width, true),
        ("height", style.height, true),
    ];
    for (field, value, positive) in fields {
        let Some(value) = value else { continue };
        let valid = if positive {
            is_positive(value)
        } else {
            value.is_finite()
        };
        if !valid {
            return Err(ConfigError::InvalidTerminalGeometry {
                element: element.to_string(),
                terminal: decl.name.clone(),
                field,
                value,
                span: None,
            });
        }
    }
    Ok(())
}

/// The declaration a component mounts into a layout scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagramProps {
    Node(NodeProps),
    Group,
    Link,
}

impl DiagramProps {
    pub fn node(width: f64, height: f64) -> Self {
        Self::Node(NodeProps::new(width, height))
    }

    pub fn layout_type(&self) -> LayoutType {
        match self {
            DiagramProps::Node(_) => LayoutType::Node,
            DiagramProps::Group => LayoutType::Group,
            DiagramProps::Link => LayoutType::Link,
        }
    }

    pub fn validate(&self, element: &str) -> Result<(), ConfigError> {
        match self {
            DiagramProps::Node(props) => props.validate(element),
            DiagramProps::Group | DiagramProps::Link => Ok(()),
        }
    }
}

impl From<NodeProps> for DiagramProps {
    fn from(props: NodeProps) -> Self {
        Self::Node(props)
    }
}

/// Untyped declaration as it arrives from outside the crate
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDiagramProps {
    #[serde(rename = "type")]
    pub layout_type: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub inlets: Vec<TerminalDecl>,
    #[serde(default)]
    pub outlets: Vec<TerminalDecl>,
    #[serde(default)]
    pub constraints: Vec<Constraint<LayoutKey>>,
}

impl RawDiagramProps {
    /// Check the declared type and geometry, producing typed props
    pub fn into_props(self, element: &str) -> Result<DiagramProps, ConfigError> {
        let name = self.layout_type.ok_or_else(|| ConfigError::MissingType {
            element: element.to_string(),
            span: None,
        })?;
        let layout_type = name
            .parse::<LayoutType>()
            .map_err(|found| ConfigError::InvalidType {
                element: element.to_string(),
                found,
                span: None,
            })?;

        let props = match layout_type {
            LayoutType::Node => {
                let width = self.width.ok_or_else(|| ConfigError::InvalidWidth {
                    element: element.to_string(),
                    found: None,
                    span: None,
                })?;
                let height = self.height.ok_or_else(|| ConfigError::InvalidHeight {
                    element: element.to_string(),
                    found: None,
                    span: None,
                })?;
                DiagramProps::Node(NodeProps {
                    width,
                    height,
                    inlets: self.inlets,
                    outlets: self.outlets,
                    constraints: self.constraints,
                })
            }
            LayoutType::Group => DiagramProps::Group,
            LayoutType::Link => DiagramProps::Link,
        };
        props.validate(element)?;
        Ok(props)
    }
}

/// A registered element as stored in the layout registry
#[derive(Debug, Clone)]
pub struct LayoutElement {
    pub key: LayoutKey,
    pub parent: Option<LayoutKey>,
    pub layout_type: LayoutType,
    pub width: f64,
    pub height: f64,
    /// Set when the element is a terminal synthesized for its parent node
    pub terminal: Option<TerminalRole>,
    pub metadata: Option<String>,
    pub constraints: Vec<Constraint<LayoutKey>>,
    pub set_style: StyleSetter,
}

impl LayoutElement {
    pub fn is_node(&self) -> bool {
        self.layout_type == LayoutType::Node
    }

    /// Whether this element is a node that takes part in phase ordering
    pub fn is_owner_node(&self) -> bool {
        self.is_node() && self.terminal.is_none()
    }

    pub fn spec(&self) -> NodeSpec {
        NodeSpec {
            key: self.key.clone(),
            parent: self.parent.clone(),
            layout_type: self.layout_type,
            width: self.width,
            height: self.height,
            terminal: self.terminal,
            constraints: self.constraints.clone(),
        }
    }
}

/// Serializable view of a node handed to the solver.
///
/// Two node lists compare equal only if every node also declares the same
/// symbolic constraints, so moving a terminal counts as a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    pub key: LayoutKey,
    pub parent: Option<LayoutKey>,
    pub layout_type: LayoutType,
    pub width: f64,
    pub height: f64,
    pub terminal: Option<TerminalRole>,
    pub constraints: Vec<Constraint<LayoutKey>>,
}

/// A resolved connection between two node positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
}

/// Nodes nested under a `Group` element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSpec {
    pub key: LayoutKey,
    pub leaves: Vec<usize>,
}

/// Everything the solver needs for one run; replaced wholesale on change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<Link>,
    pub groups: Vec<GroupSpec>,
    pub constraints: Vec<Constraint<usize>>,
}
