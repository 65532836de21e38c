//! Reconciliation of the registry with the signal graph
//!
//! On every signal notification the registry is snapshotted and turned into
//! solver input. A snapshot is only published when its node list differs
//! from the last published one, so wiring churn that leaves the node set
//! alone never re-runs the solver.

use std::cell::RefCell;
use std::rc::Rc;

use crate::layout::{
    global_constraints, links_for, localize, GroupSpec, LayoutElement, LayoutError, LayoutKey,
    LayoutSnapshot, LayoutSolver, LayoutType, SolveRequest, SolvedLayout,
};
use crate::registry::LayoutScope;
use crate::signal::{SignalMap, SignalSource, Subscription};
use crate::style::{Style, StyleSetter};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The node list changed; the new snapshot replaced the published one
    Published,
    /// The node list is unchanged; the new snapshot was discarded
    Unchanged,
}

/// Builds layout snapshots from a [`LayoutScope`] and writes solved
/// geometry back into it
#[derive(Debug)]
pub struct Reconciler {
    scope: LayoutScope,
    previous: Option<serde_json::Value>,
    published: Option<LayoutSnapshot>,
    setters: Vec<StyleSetter>,
    solved: Option<SolvedLayout>,
}

impl Reconciler {
    pub fn new(scope: LayoutScope) -> Self {
        Self {
            scope,
            previous: None,
            published: None,
            setters: Vec::new(),
            solved: None,
        }
    }

    pub fn scope(&self) -> &LayoutScope {
        &self.scope
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> Option<&LayoutSnapshot> {
        self.published.as_ref()
    }

    /// Layout produced by the last [`Reconciler::run`] that published
    pub fn solved(&self) -> Option<&SolvedLayout> {
        self.solved.as_ref()
    }

    /// Forget the last published node list so the next pass publishes
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    /// Build a fresh snapshot without publishing it
    pub fn prepare(&self, signals: &SignalMap) -> Result<LayoutSnapshot, LayoutError> {
        self.collect(signals).map(|(snapshot, _)| snapshot)
    }

    fn collect(&self, signals: &SignalMap) -> Result<(LayoutSnapshot, Vec<StyleSetter>), LayoutError> {
        let elements = self.scope.registry().snapshot();
        let nodes: Vec<(LayoutKey, LayoutElement)> =
            elements.iter().filter(|(_, e)| e.is_node()).cloned().collect();

        let links = links_for(signals, &nodes)?;

        let mut constraints = Vec::new();
        for (_, element) in &nodes {
            constraints.extend(localize(&nodes, &element.constraints)?);
        }
        constraints.extend(global_constraints(signals, &nodes, self.scope.config().spacing())?);

        let groups = elements
            .iter()
            .filter(|(_, e)| e.layout_type == LayoutType::Group)
            .map(|(key, _)| GroupSpec {
                key: key.clone(),
                leaves: leaves(key, &nodes),
            })
            .collect();

        let snapshot = LayoutSnapshot {
            nodes: nodes.iter().map(|(_, e)| e.spec()).collect(),
            links,
            groups,
            constraints,
        };
        let setters = nodes.into_iter().map(|(_, e)| e.set_style).collect();
        Ok((snapshot, setters))
    }

    /// Rebuild the snapshot and publish it if the node list changed
    pub fn reconcile(&mut self, signals: &SignalMap) -> Result<Reconciliation, LayoutError> {
        let (snapshot, setters) = self.collect(signals)?;
        let value = serde_json::to_value(&snapshot.nodes)?;
        if self.previous.as_ref() == Some(&value) {
            tracing::debug!(nodes = snapshot.nodes.len(), "node list unchanged; discarding snapshot");
            return Ok(Reconciliation::Unchanged);
        }

        tracing::debug!(
            nodes = snapshot.nodes.len(),
            links = snapshot.links.len(),
            constraints = snapshot.constraints.len(),
            "publishing layout snapshot"
        );
        self.previous = Some(value);
        self.published = Some(snapshot);
        self.setters = setters;
        Ok(Reconciliation::Published)
    }

    /// Solve the published snapshot, if any
    pub fn solve(&self, solver: &mut dyn LayoutSolver) -> Result<Option<SolvedLayout>, LayoutError> {
        let Some(snapshot) = &self.published else {
            return Ok(None);
        };
        let config = self.scope.config();
        solver.configure(&config.solver_settings());
        let solved = solver.solve(&SolveRequest {
            snapshot,
            width: config.width,
            height: config.height,
        })?;
        Ok(Some(solved))
    }

    /// Write every solved node through its style setter; returns how many
    /// landed in a live buffer
    pub fn apply(&self, solved: &SolvedLayout) -> usize {
        self.setters
            .iter()
            .zip(&solved.nodes)
            .filter(|(setter, node)| setter.set(Style::from_bounds(&node.bounds)))
            .count()
    }

    /// Reconcile, and on publish solve and apply the result.
    ///
    /// A failed solve forgets the published node list, so the next pass
    /// publishes and solves again even if nothing changed.
    pub fn run(
        &mut self,
        signals: &SignalMap,
        solver: &mut dyn LayoutSolver,
    ) -> Result<Option<SolvedLayout>, LayoutError> {
        if self.reconcile(signals)? == Reconciliation::Unchanged {
            return Ok(None);
        }
        let solved = match self.solve(solver) {
            Ok(solved) => solved,
            Err(err) => {
                tracing::debug!(error = %err, "solve failed; next pass will republish");
                self.invalidate();
                return Err(err);
            }
        };
        if let Some(solved) = &solved {
            let written = self.apply(solved);
            tracing::debug!(written, "applied solved layout");
        }
        self.solved = solved.clone();
        Ok(solved)
    }

    /// Run `reconciler` with `solver` on every notification from `source`
    pub fn attach<S>(reconciler: &Rc<RefCell<Self>>, source: &impl SignalSource, mut solver: S) -> Subscription
    where
        S: LayoutSolver + 'static,
    {
        let reconciler = Rc::clone(reconciler);
        source.subscribe(Box::new(move |signals: &SignalMap| {
            reconciler.borrow_mut().run(signals, &mut solver).map(|_| ())
        }))
    }
}

/// Positions of the non-terminal nodes nested anywhere under `group`
fn leaves(group: &LayoutKey, nodes: &[(LayoutKey, LayoutElement)]) -> Vec<usize> {
    let prefix = format!("{}{}", group, crate::layout::key::SEPARATOR);
    nodes
        .iter()
        .enumerate()
        .filter(|(_, (key, element))| element.is_owner_node() && key.as_str().starts_with(&prefix))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{
        DiagramProps, KasuariSolver, NodeProps, SolveRequest, SolverError, SolverSettings,
        TerminalDecl, TerminalStyle,
    };
    use crate::signal::{Endpoint, Signal, SignalBus};

    fn pipe() -> DiagramProps {
        NodeProps::new(100.0, 50.0).with_inlet("in").with_outlet("out").into()
    }

    fn wired() -> SignalMap {
        SignalMap::new().with(
            "s",
            Signal::new(Endpoint::new("a", "out")).with_reader(Endpoint::new("b", "in")),
        )
    }

    #[test]
    fn test_snapshot_contents() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();
        let _wire = scope.mount("wire", DiagramProps::Link).unwrap();

        let snapshot = Reconciler::new(scope).prepare(&wired()).unwrap();
        let keys: Vec<_> = snapshot.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "a.in", "a.out", "b", "b.in", "b.out"]);
        assert_eq!(snapshot.links.len(), 1);
        // per node: one alignment and two gaps; plus one global x separation
        assert_eq!(snapshot.constraints.len(), 7);
    }

    #[test]
    fn test_unchanged_node_list_is_discarded() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();

        let mut reconciler = Reconciler::new(scope);
        assert_eq!(reconciler.reconcile(&SignalMap::new()).unwrap(), Reconciliation::Published);
        // constraints differ, nodes do not
        assert_eq!(reconciler.reconcile(&wired()).unwrap(), Reconciliation::Unchanged);
        assert!(reconciler.snapshot().unwrap().links.is_empty());

        reconciler.invalidate();
        assert_eq!(reconciler.reconcile(&wired()).unwrap(), Reconciliation::Published);
    }

    #[test]
    fn test_node_change_publishes() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let mut reconciler = Reconciler::new(scope.clone());
        reconciler.reconcile(&SignalMap::new()).unwrap();

        let b = scope.mount("b", pipe()).unwrap();
        assert_eq!(reconciler.reconcile(&SignalMap::new()).unwrap(), Reconciliation::Published);
        drop(b);
        assert_eq!(reconciler.reconcile(&SignalMap::new()).unwrap(), Reconciliation::Published);
        assert_eq!(reconciler.snapshot().unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_topology_errors_propagate() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let mut reconciler = Reconciler::new(scope);
        let err = reconciler.reconcile(&wired()).unwrap_err();
        assert!(matches!(err, LayoutError::UnresolvedKey { .. }));
        assert!(reconciler.snapshot().is_none());
    }

    #[test]
    fn test_groups_collect_owner_nodes() {
        let scope = LayoutScope::default();
        let group = scope.mount("g", DiagramProps::Group).unwrap();
        let _a = scope.mount_in(Some(group.key()), "a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();

        let snapshot = Reconciler::new(scope).prepare(&SignalMap::new()).unwrap();
        assert_eq!(snapshot.groups.len(), 1);
        assert_eq!(snapshot.groups[0].key.as_str(), "g");
        assert_eq!(snapshot.groups[0].leaves, vec![0]);
    }

    #[test]
    fn test_run_writes_styles() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();

        let mut reconciler = Reconciler::new(scope.clone());
        let solved = reconciler.run(&wired(), &mut KasuariSolver::new()).unwrap();
        assert!(solved.is_some());

        let a = scope.style("a").unwrap();
        let b = scope.style("b").unwrap();
        assert!((b.x - a.x - 175.0).abs() < 0.001);
        assert_eq!(b.width, 100.0);

        assert!(reconciler.run(&wired(), &mut KasuariSolver::new()).unwrap().is_none());
    }

    #[test]
    fn test_attach_runs_on_notification() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();

        let bus = SignalBus::new();
        let reconciler = Rc::new(RefCell::new(Reconciler::new(scope.clone())));
        let subscription = Reconciler::attach(&reconciler, &bus, KasuariSolver::new());

        bus.connect("s", Endpoint::new("a", "out"), Endpoint::new("b", "in"))
            .unwrap();
        assert!(reconciler.borrow().snapshot().is_some());
        assert_eq!(reconciler.borrow().solved().unwrap().links.len(), 1);
        assert!(scope.style("b").unwrap().x > 0.0);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_terminal_move_republishes() {
        let outlet = |top: f64| -> DiagramProps {
            let style = TerminalStyle {
                top: Some(top),
                ..TerminalStyle::default()
            };
            NodeProps::new(100.0, 60.0)
                .with_outlet(TerminalDecl::new("out").with_style(style))
                .into()
        };
        let scope = LayoutScope::default();
        let mut a = scope.mount("a", outlet(0.0)).unwrap();

        let mut reconciler = Reconciler::new(scope.clone());
        reconciler.run(&SignalMap::new(), &mut KasuariSolver::new()).unwrap();

        assert!(a.update(outlet(35.0)).unwrap());
        assert_eq!(reconciler.reconcile(&SignalMap::new()).unwrap(), Reconciliation::Published);

        let solved = reconciler.solve(&mut KasuariSolver::new()).unwrap().unwrap();
        assert_eq!(reconciler.apply(&solved), 2);
        let node = scope.style("a").unwrap();
        let out = scope.style("a.out").unwrap();
        assert!((out.y - node.y - 35.0).abs() < 0.001);
    }

    /// Fails its first run, then delegates to kasuari
    struct FailOnce {
        failed: bool,
        inner: KasuariSolver,
    }

    impl LayoutSolver for FailOnce {
        fn configure(&mut self, settings: &SolverSettings) {
            self.inner.configure(settings);
        }

        fn solve(&mut self, request: &SolveRequest<'_>) -> Result<SolvedLayout, SolverError> {
            if !self.failed {
                self.failed = true;
                return Err(SolverError::Internal("first run".to_string()));
            }
            self.inner.solve(request)
        }
    }

    #[test]
    fn test_failed_solve_is_retried() {
        let scope = LayoutScope::default();
        let _a = scope.mount("a", pipe()).unwrap();
        let _b = scope.mount("b", pipe()).unwrap();

        let mut solver = FailOnce {
            failed: false,
            inner: KasuariSolver::new(),
        };
        let mut reconciler = Reconciler::new(scope.clone());
        let err = reconciler.run(&wired(), &mut solver).unwrap_err();
        assert!(matches!(err, LayoutError::Solver(SolverError::Internal(_))));
        assert!(reconciler.solved().is_none());

        // same node list, but the failed pass was never applied
        let solved = reconciler.run(&wired(), &mut solver).unwrap();
        assert!(solved.is_some());
        let (a, b) = (scope.style("a").unwrap(), scope.style("b").unwrap());
        assert!((b.x - a.x - 175.0).abs() < 0.001);
    }
}
