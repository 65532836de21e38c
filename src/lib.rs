//! Dataflow Layout - constraint-based layout for node/link diagrams
//!
//! Nodes with named inlets and outlets are mounted into a [`LayoutScope`].
//! Whenever the signal graph wiring their terminals changes, a [`Reconciler`]
//! derives alignment, ordering and separation constraints from the topology,
//! hands them to a [`LayoutSolver`] and writes the solved boxes back into the
//! scope's style buffer.
//!
//! # Example
//!
//! ```rust
//! use dataflow_layout::render;
//!
//! let svg = render(r#"
//! [[element]]
//! id = "a"
//! type = "Node"
//! width = 100
//! height = 50
//! outlets = [{ name = "out" }]
//!
//! [[element]]
//! id = "b"
//! type = "Node"
//! width = 100
//! height = 50
//! inlets = [{ name = "in" }]
//!
//! [[signal]]
//! id = "s"
//! writers = [{ element = "a", terminal = "out" }]
//! readers = [{ element = "b", terminal = "in" }]
//! "#).unwrap();
//! assert!(svg.contains("<svg"));
//! ```

pub mod document;
pub mod error;
pub mod layout;
pub mod reconcile;
pub mod registry;
pub mod renderer;
pub mod signal;
pub mod style;

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

pub use document::Document;
pub use error::ConfigError;
pub use layout::{
    KasuariSolver, LayoutConfig, LayoutError, LayoutKey, LayoutSnapshot, LayoutSolver,
    SolvedLayout,
};
pub use reconcile::{Reconciler, Reconciliation};
pub use registry::{LayoutScope, MountedElement};
pub use renderer::{render_svg, SvgConfig};
pub use signal::{Endpoint, Signal, SignalBus, SignalMap, SignalSource, Subscription};
pub use style::Style;

/// Errors that can occur during the render pipeline
#[derive(Debug, Error)]
pub enum RenderError {
    /// Invalid document or element declaration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error during layout
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl RenderError {
    /// Format the error with source context where a span is known
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            RenderError::Config(err) | RenderError::Layout(LayoutError::Config(err)) => {
                err.format(source, filename)
            }
            RenderError::Layout(err) => format!("Error: {}", err),
        }
    }
}

/// A solved document: the snapshot, the solver output and the styles written
/// back for every node
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagramLayout {
    #[serde(skip)]
    pub snapshot: LayoutSnapshot,
    #[serde(skip)]
    pub solved: SolvedLayout,
    pub styles: Vec<StyledNode>,
    pub links: Vec<(LayoutKey, LayoutKey)>,
}

/// A node key and the style written for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledNode {
    pub key: LayoutKey,
    pub style: Style,
}

/// Parse, mount and solve a TOML diagram document.
///
/// The signals are published on a [`SignalBus`] that the reconciler is
/// attached to, so the layout comes out of the same notification path a
/// long-lived host would use.
pub fn layout_document(source: &str) -> Result<DiagramLayout, RenderError> {
    let document = Document::parse(source)?;
    let scope = document.scope();
    let _mounted = document.mount(&scope)?;

    let bus = SignalBus::new();
    let reconciler = Rc::new(RefCell::new(Reconciler::new(scope.clone())));
    let _subscription = Reconciler::attach(&reconciler, &bus, KasuariSolver::new());
    bus.replace(document.signal_map())?;

    let reconciler = reconciler.borrow();
    let snapshot = reconciler.snapshot().cloned().unwrap_or_default();
    let solved = reconciler.solved().cloned().unwrap_or_default();

    let styles = scope
        .styles()
        .borrow()
        .iter()
        .map(|(key, style)| StyledNode {
            key: key.clone(),
            style: *style,
        })
        .collect();
    let links = solved
        .links
        .iter()
        .filter_map(|link| {
            let source = solved.nodes.get(link.source)?;
            let target = solved.nodes.get(link.target)?;
            Some((source.key.clone(), target.key.clone()))
        })
        .collect();

    Ok(DiagramLayout {
        snapshot,
        solved,
        styles,
        links,
    })
}

/// Render a TOML diagram document to SVG with default configuration
pub fn render(source: &str) -> Result<String, RenderError> {
    render_with_config(source, &SvgConfig::default())
}

/// Render a TOML diagram document to SVG
pub fn render_with_config(source: &str, config: &SvgConfig) -> Result<String, RenderError> {
    let layout = layout_document(source)?;
    Ok(render_svg(&layout.snapshot, &layout.solved, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = r#"
[[element]]
id = "a"
type = "Node"
width = 100
height = 50
outlets = [{ name = "out" }]

[[element]]
id = "b"
type = "Node"
width = 100
height = 50
inlets = [{ name = "in" }]

[[signal]]
id = "s"
writers = [{ element = "a", terminal = "out" }]
readers = [{ element = "b", terminal = "in" }]
"#;

    #[test]
    fn test_layout_document() {
        let layout = layout_document(TWO_NODES).unwrap();
        let keys: Vec<_> = layout.styles.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "a.out", "b", "b.in"]);
        assert_eq!(layout.links, vec![(LayoutKey::from("a.out"), LayoutKey::from("b.in"))]);

        let a = &layout.styles[0].style;
        let b = &layout.styles[2].style;
        assert!((b.x - a.x - 175.0).abs() < 0.001);
    }

    #[test]
    fn test_render_contains_link() {
        let svg = render(TWO_NODES).unwrap();
        assert!(svg.contains(r#"class="df-link""#));
        assert!(svg.contains(r#"id="b.in""#));
    }

    #[test]
    fn test_config_error_formats_with_source() {
        let source = "[[element]]\nid = \"a\"\ntype = \"Widget\"\n";
        let err = render(source).unwrap_err();
        assert!(matches!(err, RenderError::Config(ConfigError::InvalidType { .. })));
        assert!(err.format(source, "diagram.toml").contains("diagram.toml"));
    }

    #[test]
    fn test_topology_error() {
        let source = r#"
[[element]]
id = "a"
type = "Node"
width = 10
height = 10
outlets = [{ name = "out" }]

[[signal]]
id = "s"
writers = [{ element = "a", terminal = "out" }, { element = "a", terminal = "out" }]
"#;
        let err = layout_document(source).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Layout(LayoutError::MultipleWriters { .. })
        ));
    }

    #[test]
    fn test_json_output() {
        let layout = layout_document(TWO_NODES).unwrap();
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["styles"][0]["key"], "a");
        assert_eq!(json["styles"][0]["style"]["position"], "absolute");
        assert_eq!(json["links"][0][1], "b.in");
    }
}
