//! Integration tests for mounting, reconciliation and solving
//!
//! These drive the public API the way a host does: mount nodes into a
//! scope, publish signals on a bus and read the styles written back.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use dataflow_layout::layout::{DiagramProps, NodeProps};
use dataflow_layout::{
    Endpoint, KasuariSolver, LayoutScope, Reconciler, Reconciliation, SignalBus, SignalMap, Style,
};

const TOLERANCE: f64 = 0.001;

fn pipe(width: f64, height: f64) -> DiagramProps {
    NodeProps::new(width, height)
        .with_inlet("in")
        .with_outlet("out")
        .into()
}

fn style(scope: &LayoutScope, key: &str) -> Style {
    scope
        .style(key)
        .unwrap_or_else(|| panic!("no style for '{}'", key))
}

fn attached(scope: &LayoutScope) -> (SignalBus, Rc<RefCell<Reconciler>>, dataflow_layout::Subscription) {
    let bus = SignalBus::new();
    let reconciler = Rc::new(RefCell::new(Reconciler::new(scope.clone())));
    let subscription = Reconciler::attach(&reconciler, &bus, KasuariSolver::new());
    (bus, reconciler, subscription)
}

/// A -> B -> C lands in three columns, each one widest-node-plus-gap to the
/// right of the previous one, with every link flowing left to right
#[test]
fn test_chain_is_ordered_left_to_right() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount("b", pipe(120.0, 50.0)).unwrap();
    let _c = scope.mount("c", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.update(|signals| {
        signals.insert(
            "ab",
            dataflow_layout::Signal::new(Endpoint::new("a", "out")).with_reader(Endpoint::new("b", "in")),
        );
        signals.insert(
            "bc",
            dataflow_layout::Signal::new(Endpoint::new("b", "out")).with_reader(Endpoint::new("c", "in")),
        );
    })
    .unwrap();

    let (a, b, c) = (style(&scope, "a"), style(&scope, "b"), style(&scope, "c"));
    assert!((b.x - a.x - 175.0).abs() < TOLERANCE, "a={:?} b={:?}", a, b);
    assert!((c.x - b.x - 195.0).abs() < TOLERANCE, "b={:?} c={:?}", b, c);

    let solved = reconciler.borrow().solved().cloned().unwrap();
    assert_eq!(solved.links.len(), 2);
    for link in &solved.links {
        let source = &solved.nodes[link.source].bounds;
        let target = &solved.nodes[link.target].bounds;
        assert!(target.x >= source.x + 75.0 - TOLERANCE);
    }
}

/// Readers of one writer share a column and are stacked top to bottom
#[test]
fn test_fan_out_stacks_readers() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount("b", pipe(100.0, 40.0)).unwrap();
    let _c = scope.mount("c", pipe(100.0, 40.0)).unwrap();

    let (bus, _reconciler, _subscription) = attached(&scope);
    bus.update(|signals| {
        signals.insert(
            "s",
            dataflow_layout::Signal::new(Endpoint::new("a", "out"))
                .with_reader(Endpoint::new("b", "in"))
                .with_reader(Endpoint::new("c", "in")),
        );
    })
    .unwrap();

    let (b, c) = (style(&scope, "b"), style(&scope, "c"));
    assert!((b.x - c.x).abs() < TOLERANCE);
    assert!((c.y - b.y - 55.0).abs() < TOLERANCE, "b={:?} c={:?}", b, c);
}

/// Terminals follow their owner: inlets on the left edge, outlets on the right
#[test]
fn test_terminals_follow_owner() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();

    let mut reconciler = Reconciler::new(scope.clone());
    reconciler
        .run(&SignalMap::new(), &mut KasuariSolver::new())
        .unwrap();

    let a = style(&scope, "a");
    let inlet = style(&scope, "a.in");
    let outlet = style(&scope, "a.out");
    assert!((inlet.x - a.x).abs() < 0.01);
    assert!((outlet.x + outlet.width - (a.x + a.width) - 50.0).abs() < 0.01);
    assert!((outlet.y - a.y).abs() < 0.01);
    assert!((inlet.y - a.y).abs() < 0.01);
    assert!(a.x >= -TOLERANCE && a.y >= -TOLERANCE);
}

/// A second writer on one signal is refused and nothing is published
#[test]
fn test_multiple_writers_rejected() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount("b", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.connect("s", Endpoint::new("a", "out"), Endpoint::new("b", "in"))
        .unwrap();
    let err = bus
        .connect("s", Endpoint::new("b", "out"), Endpoint::new("a", "in"))
        .unwrap_err();
    assert!(err.to_string().contains("a.out, b.out"), "{}", err);
    assert_eq!(reconciler.borrow().solved().unwrap().links.len(), 1);
}

/// Rewiring without touching the node list keeps the published layout
/// until the reconciler is invalidated
#[test]
fn test_rewiring_needs_invalidate() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount("b", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.notify().unwrap();
    assert!(reconciler.borrow().solved().unwrap().links.is_empty());

    bus.connect("s", Endpoint::new("a", "out"), Endpoint::new("b", "in"))
        .unwrap();
    assert!(reconciler.borrow().solved().unwrap().links.is_empty());

    reconciler.borrow_mut().invalidate();
    bus.notify().unwrap();
    assert_eq!(reconciler.borrow().solved().unwrap().links.len(), 1);
    let (a, b) = (style(&scope, "a"), style(&scope, "b"));
    assert!((b.x - a.x - 175.0).abs() < TOLERANCE);
}

/// Notifying twice with the same node list publishes once
#[test]
fn test_reconcile_is_idempotent() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount("b", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.connect("s", Endpoint::new("a", "out"), Endpoint::new("b", "in"))
        .unwrap();
    let first = reconciler.borrow().snapshot().cloned().unwrap();
    let revision = scope.styles().borrow().revision();

    bus.notify().unwrap();
    assert_eq!(reconciler.borrow().snapshot(), Some(&first));
    assert_eq!(scope.styles().borrow().revision(), revision);

    let signals = bus.signals();
    let outcome = reconciler.borrow_mut().reconcile(&signals).unwrap();
    assert_eq!(outcome, Reconciliation::Unchanged);
}

/// Dropping a mounted node removes it and its terminals from the next layout
#[test]
fn test_unmount_removes_node() {
    let scope = LayoutScope::default();
    let _a = scope.mount("a", pipe(100.0, 50.0)).unwrap();
    let b = scope.mount("b", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.notify().unwrap();
    assert_eq!(reconciler.borrow().snapshot().unwrap().nodes.len(), 6);

    b.unmount();
    assert!(scope.style("b").is_none());
    assert!(scope.style("b.in").is_none());

    bus.notify().unwrap();
    let keys: Vec<String> = reconciler
        .borrow()
        .snapshot()
        .unwrap()
        .nodes
        .iter()
        .map(|n| n.key.to_string())
        .collect();
    insta::assert_snapshot!(keys.join(","), @"a,a.in,a.out");
}

/// Updating props re-registers the node under the same key
#[test]
fn test_update_resizes_node() {
    let scope = LayoutScope::default();
    let mut a = scope.mount("a", pipe(100.0, 50.0)).unwrap();

    let (bus, _reconciler, _subscription) = attached(&scope);
    bus.notify().unwrap();
    assert_eq!(style(&scope, "a").width, 100.0);

    assert!(a.update(pipe(140.0, 50.0)).unwrap());
    assert!(!a.update(pipe(140.0, 50.0)).unwrap());
    bus.notify().unwrap();
    assert_eq!(style(&scope, "a").width, 140.0);
    assert_eq!(scope.registry().len(), 3);
}

/// Nodes mounted under a group are reported with the group's bounds
#[test]
fn test_group_bounds_cover_members() {
    let scope = LayoutScope::default();
    let group = scope.mount("g", DiagramProps::Group).unwrap();
    let _a = scope.mount_in(Some(group.key()), "a", pipe(100.0, 50.0)).unwrap();
    let _b = scope.mount_in(Some(group.key()), "b", pipe(100.0, 50.0)).unwrap();

    let (bus, reconciler, _subscription) = attached(&scope);
    bus.connect("s", Endpoint::new("g.a", "out"), Endpoint::new("g.b", "in"))
        .unwrap();

    let solved = reconciler.borrow().solved().cloned().unwrap();
    assert_eq!(solved.groups.len(), 1);
    let bounds = solved.groups[0].bounds;
    let (a, b) = (style(&scope, "g.a"), style(&scope, "g.b"));
    assert!((bounds.x - a.x).abs() < TOLERANCE);
    assert!((bounds.right() - (b.x + b.width)).abs() < TOLERANCE);
}
