//! End-to-end tests from TOML documents to solved styles and SVG
//!
//! Constraint checks read coordinates from the solved layout rather than
//! comparing rendered markup, so they hold whatever the solver picks for
//! otherwise free variables.

use pretty_assertions::assert_eq;

use dataflow_layout::layout::SolverError;
use dataflow_layout::{layout_document, render, DiagramLayout, LayoutError, RenderError, Style};

const TOLERANCE: f64 = 0.001;

fn style(layout: &DiagramLayout, key: &str) -> Style {
    layout
        .styles
        .iter()
        .find(|s| s.key.as_str() == key)
        .map(|s| s.style)
        .unwrap_or_else(|| panic!("no style for '{}'", key))
}

const PIPELINE: &str = r#"
[[element]]
id = "source"
type = "Node"
width = 80
height = 40
outlets = [{ name = "out" }]

[[element]]
id = "filter"
type = "Node"
width = 120
height = 60
inlets = [{ name = "in" }]
outlets = [{ name = "pass" }, { name = "reject" }]

[[element]]
id = "keep"
type = "Node"
width = 80
height = 40
inlets = [{ name = "in" }]

[[element]]
id = "drop"
type = "Node"
width = 80
height = 40
inlets = [{ name = "in" }]

[[signal]]
id = "raw"
writers = [{ element = "source", terminal = "out" }]
readers = [{ element = "filter", terminal = "in" }]

[[signal]]
id = "passed"
writers = [{ element = "filter", terminal = "pass" }]
readers = [{ element = "keep", terminal = "in" }]

[[signal]]
id = "rejected"
writers = [{ element = "filter", terminal = "reject" }]
readers = [{ element = "drop", terminal = "in" }]
"#;

#[test]
fn test_pipeline_columns() {
    let layout = layout_document(PIPELINE).unwrap();
    let source = style(&layout, "source");
    let filter = style(&layout, "filter");
    let keep = style(&layout, "keep");
    let drop = style(&layout, "drop");

    assert!((filter.x - source.x - 155.0).abs() < TOLERANCE);
    assert!((keep.x - filter.x - 195.0).abs() < TOLERANCE);
    assert!((drop.x - keep.x).abs() < TOLERANCE);
    assert!((drop.y - keep.y - 55.0).abs() < TOLERANCE);

    // second outlet sits one terminal height below the first
    let pass = style(&layout, "filter.pass");
    let reject = style(&layout, "filter.reject");
    assert!((reject.y - pass.y - 20.0).abs() < 0.01);

    let links: Vec<String> = layout
        .links
        .iter()
        .map(|(from, to)| format!("{}->{}", from, to))
        .collect();
    insta::assert_snapshot!(
        links.join(" "),
        @"source.out->filter.in filter.pass->keep.in filter.reject->drop.in"
    );
}

#[test]
fn test_declared_constraints_are_satisfied() {
    let source = r#"
[[element]]
id = "a"
type = "Node"
width = 100
height = 40

[[element]]
id = "b"
type = "Node"
width = 100
height = 40
constraints = [
    { type = "separation", axis = "y", left = "a", right = "b", gap = 80, equality = true },
]
"#;
    let layout = layout_document(source).unwrap();
    let a = style(&layout, "a");
    let b = style(&layout, "b");
    // unconnected nodes share the first column
    assert!((a.x - b.x).abs() < TOLERANCE);
    assert!((b.y - a.y - 80.0).abs() < TOLERANCE);
}

#[test]
fn test_alignment_constraint() {
    let source = r#"
[[element]]
id = "a"
type = "Node"
width = 100
height = 40
outlets = [{ name = "out" }]

[[element]]
id = "b"
type = "Node"
width = 100
height = 40
inlets = [{ name = "in" }]
constraints = [
    { type = "alignment", axis = "y", offsets = [{ node = "a", offset = 0 }, { node = "b", offset = -30 }] },
]

[[signal]]
id = "s"
writers = [{ element = "a", terminal = "out" }]
readers = [{ element = "b", terminal = "in" }]
"#;
    let layout = layout_document(source).unwrap();
    let a = style(&layout, "a");
    let b = style(&layout, "b");
    assert!((b.y - a.y + 30.0).abs() < TOLERANCE, "a={:?} b={:?}", a, b);
}

#[test]
fn test_conflicting_constraints_are_unsatisfiable() {
    let source = r#"
[[element]]
id = "a"
type = "Node"
width = 100
height = 40

[[element]]
id = "b"
type = "Node"
width = 100
height = 40
constraints = [
    { type = "separation", axis = "x", left = "a", right = "b", gap = 10, equality = true },
]
"#;
    let err = layout_document(source).unwrap_err();
    assert!(
        matches!(
            err,
            RenderError::Layout(LayoutError::Solver(SolverError::Unsatisfiable { .. }))
        ),
        "{:?}",
        err
    );
}

#[test]
fn test_unresolved_constraint_key() {
    let source = r#"
[[element]]
id = "a"
type = "Node"
width = 100
height = 40
constraints = [
    { type = "separation", axis = "x", left = "a", right = "ghost", gap = 10 },
]
"#;
    match layout_document(source) {
        Err(RenderError::Layout(LayoutError::UnresolvedKey { key })) => {
            assert_eq!(key.as_str(), "ghost");
        }
        other => panic!("expected unresolved key, got {:?}", other),
    }
}

#[test]
fn test_render_svg_structure() {
    let svg = render(PIPELINE).unwrap();
    assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert_eq!(svg.matches(r#"class="df-node""#).count(), 4);
    assert_eq!(svg.matches(r#"class="df-inlet""#).count(), 3);
    assert_eq!(svg.matches(r#"class="df-outlet""#).count(), 3);
    assert_eq!(svg.matches(r#"class="df-link""#).count(), 3);
    assert!(svg.contains(">filter</text>"));
    assert!(svg.trim_end().ends_with("</svg>"));
}

#[test]
fn test_render_group_outline() {
    let source = r#"
[[element]]
id = "stage"
type = "Group"

[[element]]
id = "a"
parent = "stage"
type = "Node"
width = 100
height = 40
outlets = [{ name = "out" }]

[[element]]
id = "b"
parent = "stage"
type = "Node"
width = 100
height = 40
inlets = [{ name = "in" }]

[[signal]]
id = "s"
writers = [{ element = "stage.a", terminal = "out" }]
readers = [{ element = "stage.b", terminal = "in" }]
"#;
    let svg = render(source).unwrap();
    assert!(svg.contains(r#"<rect id="stage" class="df-group""#));
    assert!(svg.contains(r#"id="stage.a""#));
    assert_eq!(svg.matches(r#"class="df-link""#).count(), 1);
}

#[test]
fn test_link_elements_render_nothing() {
    let source = r#"
[[element]]
id = "wire"
type = "Link"
"#;
    let layout = layout_document(source).unwrap();
    assert!(layout.styles.is_empty());
    assert!(layout.solved.nodes.is_empty());
}

#[test]
fn test_error_report_names_file() {
    let source = "[[element]]\nid = \"a\"\ntype = \"Node\"\nwidth = -5\nheight = 10\n";
    let err = render(source).unwrap_err();
    let report = err.format(source, "broken.toml");
    assert!(report.contains("broken.toml"), "{}", report);
}
