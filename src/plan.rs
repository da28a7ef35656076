//! Execution plans and the nodes they own.
//!
//! A plan is assembled through a [`PlanBuilder`] and frozen into an
//! [`ExecutionPlan`] by [`PlanBuilder::finish`]. Only a frozen plan can be
//! queried or converted, which is what guarantees that conversion never
//! observes a graph that is still changing.
//!
//! Edges point from a node to the nodes it depends on (its successors).
//! Successors are always reported in the order their edges were declared.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::core::ArcStr;
use crate::error::{ConvertError, PlanError};
use crate::graph::PlannedGraph;
use crate::model::{NodeIdentity, NodeKind};
use crate::{ConverterRegistry, PlanLookup};

static NEXT_PLAN: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a plan instance.
///
/// Two plans built for the same path still get distinct ids, so a node handle
/// can never be mistaken for a node of another plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanId(u64);

impl PlanId {
    fn next() -> Self {
        PlanId(NEXT_PLAN.fetch_add(1, Ordering::Relaxed))
    }
}

/// A handle to a node, tied to the plan that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) plan: PlanId,
    pub(crate) index: NodeIndex,
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.plan.0, self.index.index())
    }
}

/// The relationship an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The source cannot run before the target has completed.
    DependsOn,
    /// If both run, the source runs after the target.
    MustRunAfter,
    /// Like `MustRunAfter`, but may be ignored to break cycles.
    ShouldRunAfter,
    /// The target runs after the source, whether it succeeded or not.
    FinalizedBy,
}

/// What a node represents, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload {
    Task {
        path: ArcStr,
        type_name: ArcStr,
    },
    TaskInAnotherPlan {
        plan: ArcStr,
        path: ArcStr,
    },
    TransformStep {
        seq: u64,
        transform: ArcStr,
        component: ArcStr,
    },
    Internal {
        kind: NodeKind,
        seq: u64,
        label: ArcStr,
    },
}

/// A vertex of an execution plan.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    plan: ArcStr,
    payload: NodePayload,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            NodePayload::Task { .. } => NodeKind::Task,
            NodePayload::TaskInAnotherPlan { .. } => NodeKind::TaskInAnotherPlan,
            NodePayload::TransformStep { .. } => NodeKind::TransformStep,
            NodePayload::Internal { kind, .. } => *kind,
        }
    }

    /// Path of the plan that owns this node.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Identity derived from the node alone.
    ///
    /// For a task in another plan, this names the target plan and task, so
    /// that every proxy of the same delegated task shares one identity.
    pub fn identity(&self) -> NodeIdentity {
        match &self.payload {
            NodePayload::Task { path, .. } => {
                NodeIdentity::new(NodeKind::Task, self.plan.clone(), path.clone())
            }
            NodePayload::TaskInAnotherPlan { plan, path } => {
                NodeIdentity::new(NodeKind::TaskInAnotherPlan, plan.clone(), path.clone())
            }
            NodePayload::TransformStep { seq, .. } => {
                NodeIdentity::new(NodeKind::TransformStep, self.plan.clone(), format!("#{seq}"))
            }
            NodePayload::Internal { kind, seq, .. } => {
                NodeIdentity::new(*kind, self.plan.clone(), format!("#{seq}"))
            }
        }
    }

    /// Human-readable description, used in diagrams.
    pub fn label(&self) -> String {
        match &self.payload {
            NodePayload::Task { path, .. } => path.to_string(),
            NodePayload::TaskInAnotherPlan { plan, path } => format!("{plan} {path}"),
            NodePayload::TransformStep {
                transform,
                component,
                ..
            } => format!("{transform} {component}"),
            NodePayload::Internal { label, .. } => label.to_string(),
        }
    }
}

/// Assembles an [`ExecutionPlan`].
///
/// # Example
///
/// ```rust
/// use plangraph::PlanBuilder;
///
/// let mut builder = PlanBuilder::new(":");
/// let jar = builder.add_task(":jar", "Jar").unwrap();
/// let compile = builder.add_task(":compileJava", "JavaCompile").unwrap();
/// builder.depends_on(jar, compile).unwrap();
///
/// let plan = builder.finish();
/// assert_eq!(plan.len(), 2);
/// ```
pub struct PlanBuilder {
    id: PlanId,
    path: ArcStr,
    graph: DiGraph<Node, EdgeKind>,
    tasks: HashMap<ArcStr, NodeIndex>,
    proxies: HashMap<(ArcStr, ArcStr), NodeIndex>,
    next_seq: u64,
}

impl PlanBuilder {
    /// Starts an empty plan for the build at `path`, e.g. `":"` for the root
    /// build or `":included"` for a nested one.
    pub fn new(path: impl Into<ArcStr>) -> Self {
        Self {
            id: PlanId::next(),
            path: path.into(),
            graph: DiGraph::new(),
            tasks: HashMap::new(),
            proxies: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn add_task(
        &mut self,
        path: impl Into<ArcStr>,
        type_name: impl Into<ArcStr>,
    ) -> Result<NodeId, PlanError> {
        let path = path.into();

        if self.tasks.contains_key(&path) {
            return Err(PlanError::DuplicateTask(path, self.path.clone()));
        }

        let id = self.push(NodePayload::Task {
            path: path.clone(),
            type_name: type_name.into(),
        });

        self.tasks.insert(path, id.index);
        Ok(id)
    }

    /// Adds a proxy for the task at `path` owned by the plan at `plan`.
    ///
    /// Asking twice for the same delegated task returns the same proxy.
    pub fn add_task_in_another_plan(
        &mut self,
        plan: impl Into<ArcStr>,
        path: impl Into<ArcStr>,
    ) -> NodeId {
        let key = (plan.into(), path.into());

        if let Some(&index) = self.proxies.get(&key) {
            return NodeId {
                plan: self.id,
                index,
            };
        }

        let id = self.push(NodePayload::TaskInAnotherPlan {
            plan: key.0.clone(),
            path: key.1.clone(),
        });

        self.proxies.insert(key, id.index);
        id
    }

    pub fn add_transform_step(
        &mut self,
        transform: impl Into<ArcStr>,
        component: impl Into<ArcStr>,
    ) -> NodeId {
        let seq = self.next_seq();
        self.push(NodePayload::TransformStep {
            seq,
            transform: transform.into(),
            component: component.into(),
        })
    }

    pub fn add_action(&mut self, label: impl Into<ArcStr>) -> NodeId {
        self.add_internal(NodeKind::Action, label.into())
    }

    pub fn add_ordinal(&mut self, label: impl Into<ArcStr>) -> NodeId {
        self.add_internal(NodeKind::Ordinal, label.into())
    }

    pub fn add_resolve_mutations(&mut self, label: impl Into<ArcStr>) -> NodeId {
        self.add_internal(NodeKind::ResolveMutations, label.into())
    }

    /// Declares that `node` depends on `dependency`.
    pub fn depends_on(&mut self, node: NodeId, dependency: NodeId) -> Result<(), PlanError> {
        self.add_edge(node, dependency, EdgeKind::DependsOn)
    }

    /// Adds an edge of the given kind. Repeating an existing edge is a no-op.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Result<(), PlanError> {
        self.check_owned(from)?;
        self.check_owned(to)?;

        if from == to {
            return Err(PlanError::SelfDependency(from));
        }

        let exists = self
            .graph
            .edges_connecting(from.index, to.index)
            .any(|edge| *edge.weight() == kind);

        if !exists {
            self.graph.add_edge(from.index, to.index, kind);
        }

        Ok(())
    }

    /// Freezes the graph. No node or edge can be added afterwards.
    pub fn finish(self) -> ExecutionPlan {
        tracing::debug!(
            plan = %self.path,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "execution plan finalized"
        );

        ExecutionPlan {
            id: self.id,
            path: self.path,
            graph: self.graph,
        }
    }

    fn add_internal(&mut self, kind: NodeKind, label: ArcStr) -> NodeId {
        let seq = self.next_seq();
        self.push(NodePayload::Internal { kind, seq, label })
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn push(&mut self, payload: NodePayload) -> NodeId {
        let id = NodeId {
            plan: self.id,
            index: NodeIndex::new(self.graph.node_count()),
        };

        let index = self.graph.add_node(Node {
            id,
            plan: self.path.clone(),
            payload,
        });

        debug_assert_eq!(index, id.index);
        id
    }

    fn check_owned(&self, node: NodeId) -> Result<(), PlanError> {
        if node.plan != self.id || node.index.index() >= self.graph.node_count() {
            return Err(PlanError::ForeignNode(node, self.path.clone()));
        }
        Ok(())
    }
}

/// A finalized, immutable execution plan.
///
/// All accessors take `&self`; a plan can be shared between threads and
/// converted by several listeners at once.
pub struct ExecutionPlan {
    id: PlanId,
    path: ArcStr,
    graph: DiGraph<Node, EdgeKind>,
}

impl ExecutionPlan {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether `node` was created by this plan.
    pub fn contains(&self, node: NodeId) -> bool {
        node.plan == self.id && self.graph.node_weight(node.index).is_some()
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        if node.plan != self.id {
            return None;
        }
        self.graph.node_weight(node.index)
    }

    /// All nodes, in the order they were added.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Direct successors of `node` through edges of `kind`, in declaration
    /// order. Returns nothing for nodes of other plans.
    pub fn successors(&self, node: NodeId, kind: EdgeKind) -> Vec<&Node> {
        if !self.contains(node) {
            return vec![];
        }

        self.successor_indices(node.index, kind)
            .into_iter()
            .map(|index| &self.graph[index])
            .collect()
    }

    /// Read-only dependency queries bound to this plan.
    pub fn lookup<'a>(&'a self, registry: &'a ConverterRegistry) -> PlanLookup<'a> {
        PlanLookup::new(self, registry)
    }

    /// Converts every reportable node of this plan into its exported record.
    pub fn to_planned_graph(&self, registry: &ConverterRegistry) -> Result<PlannedGraph, ConvertError> {
        crate::graph::convert(self, registry)
    }

    pub(crate) fn node_at(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }

    pub(crate) fn successor_indices(&self, index: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| *edge.weight() == kind)
            .map(|edge| (edge.id(), edge.target()))
            .collect();

        // Edge indices grow with insertion, which gives declaration order.
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }
}

/// Renders the raw plan, structural nodes included, as a Mermaid diagram.
impl Display for ExecutionPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let node = &self.graph[index];
            let label = crate::utils::mermaid_label(&node.label());
            writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), node.kind(), label)?;
        }

        for edge in self.graph.edge_references() {
            let arrow = match edge.weight() {
                EdgeKind::DependsOn => "-->".to_string(),
                other => format!("-. {other:?} .->"),
            };
            writeln!(
                f,
                "    {} {} {}",
                edge.source().index(),
                arrow,
                edge.target().index()
            )?;
        }

        Ok(())
    }
}
