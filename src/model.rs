//! The exported, consumer-facing half of the crate.
//!
//! Nothing in here refers back to the execution plan: a [`PlannedNode`] is a
//! plain value that outlives the graph it was produced from, and a
//! [`NodeIdentity`] is the only thing external tooling may use to correlate
//! records with each other.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::ArcStr;

/// The runtime kind of a node in the execution plan.
///
/// The set is closed; which kinds end up in the exported graph is decided by
/// the converters registered in a [`ConverterRegistry`](crate::ConverterRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// A task owned by the plan.
    Task,
    /// A local stand-in for a task owned by another, nested plan.
    TaskInAnotherPlan,
    /// An artifact transform applied to a single component.
    TransformStep,
    /// Arbitrary internal work scheduled alongside tasks.
    Action,
    /// Groups nodes that must run in the order they were requested.
    Ordinal,
    /// Applies project state mutations before a node is allowed to run.
    ResolveMutations,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Task,
        NodeKind::TaskInAnotherPlan,
        NodeKind::TransformStep,
        NodeKind::Action,
        NodeKind::Ordinal,
        NodeKind::ResolveMutations,
    ];

    /// The tag used for this kind in the exported schema.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Task => "TASK",
            NodeKind::TaskInAnotherPlan => "TASK_IN_ANOTHER_PLAN",
            NodeKind::TransformStep => "TRANSFORM_STEP",
            NodeKind::Action => "ACTION",
            NodeKind::Ordinal => "ORDINAL",
            NodeKind::ResolveMutations => "RESOLVE_MUTATIONS",
        }
    }

    /// Whether nodes of this kind are tasks, local or delegated.
    ///
    /// Older consumers only understand task identities, so this is the filter
    /// used by [`DependencyLookup::find_task_dependencies`](crate::DependencyLookup::find_task_dependencies).
    pub fn is_task(self) -> bool {
        matches!(self, NodeKind::Task | NodeKind::TaskInAnotherPlan)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A stable, opaque reference to a node, meaningful across plan boundaries.
///
/// The `plan` is the path of the plan that owns the referenced work, so the
/// identity of a delegated task names the nested plan rather than the plan
/// holding the proxy. The `path` is unique per kind within that plan. Since
/// the kind is part of the value, nodes of different kinds never compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub kind: NodeKind,
    pub plan: ArcStr,
    pub path: ArcStr,
}

impl NodeIdentity {
    pub fn new(kind: NodeKind, plan: impl Into<ArcStr>, path: impl Into<ArcStr>) -> Self {
        Self {
            kind,
            plan: plan.into(),
            path: path.into(),
        }
    }
}

impl Display for NodeIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}){}", self.kind, self.plan, self.path)
    }
}

/// Kind-specific metadata attached to an exported record.
///
/// Flattened into the record, so a task shows up as
/// `{"identity": .., "kind": "TASK", "dependencies": [..], "task": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeDetails {
    Task {
        /// Declared implementation type of the task.
        type_name: ArcStr,
        must_run_after: Vec<NodeIdentity>,
        should_run_after: Vec<NodeIdentity>,
        finalized_by: Vec<NodeIdentity>,
    },
    TransformStep {
        transform: ArcStr,
        component: ArcStr,
    },
    /// Label-only metadata for kinds reported by user-registered converters.
    Custom {
        label: ArcStr,
    },
}

/// The exported record for a single node of the execution plan.
///
/// `dependencies` is ordered by discovery, which is deterministic for a given
/// frozen graph. An identity in `dependencies` that has no record of its own
/// refers to work reported elsewhere, usually by the pass of another plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedNode {
    pub identity: NodeIdentity,
    pub kind: NodeKind,
    pub dependencies: Vec<NodeIdentity>,
    #[serde(flatten)]
    pub details: NodeDetails,
}

impl PlannedNode {
    pub fn new(identity: NodeIdentity, dependencies: Vec<NodeIdentity>, details: NodeDetails) -> Self {
        Self {
            kind: identity.kind,
            identity,
            dependencies,
            details,
        }
    }
}
