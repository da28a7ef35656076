use crate::converter::{PlannedNodeConverter, assert_convertible};
use crate::error::LookupError;
use crate::lookup::DependencyLookup;
use crate::model::{NodeDetails, NodeIdentity, NodeKind, PlannedNode};
use crate::plan::{EdgeKind, Node, NodePayload};

/// Converts tasks owned by the plan.
///
/// Dependencies are reported through
/// [`DependencyLookup::find_task_dependencies`], so consumers of task records
/// only ever see other tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskConverter;

impl PlannedNodeConverter for TaskConverter {
    fn name(&self) -> &'static str {
        "TaskConverter"
    }

    fn supported_kind(&self) -> NodeKind {
        NodeKind::Task
    }

    fn node_identity(&self, node: &Node) -> NodeIdentity {
        debug_assert_eq!(node.kind(), NodeKind::Task);
        node.identity()
    }

    fn is_in_same_plan(&self, node: &Node) -> bool {
        node.kind() == NodeKind::Task
    }

    fn convert(&self, node: &Node, lookup: &dyn DependencyLookup) -> Result<PlannedNode, LookupError> {
        assert_convertible(self, node);

        let NodePayload::Task { type_name, .. } = node.payload() else {
            unreachable!("task node without task payload");
        };

        let details = NodeDetails::Task {
            type_name: type_name.clone(),
            must_run_after: lookup.find_successors(node, EdgeKind::MustRunAfter)?,
            should_run_after: lookup.find_successors(node, EdgeKind::ShouldRunAfter)?,
            finalized_by: lookup.find_successors(node, EdgeKind::FinalizedBy)?,
        };

        Ok(PlannedNode::new(
            self.node_identity(node),
            lookup.find_task_dependencies(node)?,
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConverterRegistry;
    use crate::plan::PlanBuilder;

    #[test]
    fn test_convert_task() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let group = builder.add_ordinal("group");
        let b = builder.add_task(":b", "Zip").unwrap();
        let c = builder.add_task(":c", "Delete").unwrap();
        let lib = builder.add_task_in_another_plan(":lib", ":jar");
        builder.depends_on(a, group).unwrap();
        builder.depends_on(group, b).unwrap();
        builder.depends_on(a, lib).unwrap();
        builder.add_edge(a, c, EdgeKind::MustRunAfter).unwrap();
        builder.add_edge(a, b, EdgeKind::FinalizedBy).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let node = TaskConverter
            .convert(plan.node(a).unwrap(), &plan.lookup(&registry))
            .unwrap();

        assert_eq!(node.identity, NodeIdentity::new(NodeKind::Task, ":", ":a"));
        assert_eq!(node.kind, NodeKind::Task);
        assert_eq!(
            node.dependencies,
            vec![
                NodeIdentity::new(NodeKind::Task, ":", ":b"),
                NodeIdentity::new(NodeKind::TaskInAnotherPlan, ":lib", ":jar"),
            ]
        );
        assert_eq!(
            node.details,
            NodeDetails::Task {
                type_name: "Copy".into(),
                must_run_after: vec![NodeIdentity::new(NodeKind::Task, ":", ":c")],
                should_run_after: vec![],
                finalized_by: vec![NodeIdentity::new(NodeKind::Task, ":", ":b")],
            }
        );
    }

    #[test]
    fn test_task_is_local() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let plan = builder.finish();

        assert!(TaskConverter.is_in_same_plan(plan.node(a).unwrap()));
    }
}
