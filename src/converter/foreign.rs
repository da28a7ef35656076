use crate::converter::{PlannedNodeConverter, assert_convertible};
use crate::error::LookupError;
use crate::lookup::DependencyLookup;
use crate::model::{NodeIdentity, NodeKind, PlannedNode};
use crate::plan::Node;

/// Identifies tasks delegated to another plan.
///
/// Such a task is reported by the pass of the plan that owns it; here it only
/// ever shows up as a dependency identity, so [`convert`](Self::convert)
/// always rejects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskInAnotherPlanConverter;

impl PlannedNodeConverter for TaskInAnotherPlanConverter {
    fn name(&self) -> &'static str {
        "TaskInAnotherPlanConverter"
    }

    fn supported_kind(&self) -> NodeKind {
        NodeKind::TaskInAnotherPlan
    }

    fn node_identity(&self, node: &Node) -> NodeIdentity {
        debug_assert_eq!(node.kind(), NodeKind::TaskInAnotherPlan);
        node.identity()
    }

    fn is_in_same_plan(&self, _: &Node) -> bool {
        false
    }

    fn convert(&self, node: &Node, _: &dyn DependencyLookup) -> Result<PlannedNode, LookupError> {
        assert_convertible(self, node);
        unreachable!("tasks in another plan are never in the same plan")
    }
}
