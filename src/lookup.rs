use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::ConverterRegistry;
use crate::error::LookupError;
use crate::model::NodeIdentity;
use crate::plan::{EdgeKind, ExecutionPlan, Node};

/// Read-only dependency queries handed to converters.
///
/// Every query fails with [`LookupError::OutOfScope`] when `node` does not
/// belong to the plan the lookup is bound to.
pub trait DependencyLookup {
    /// Identities of the direct dependencies of `node`, whatever their kind,
    /// in declaration order.
    fn find_node_dependencies(&self, node: &Node) -> Result<Vec<NodeIdentity>, LookupError>;

    /// Identities of the tasks `node` depends on, skipping over every node
    /// that is not a task.
    ///
    /// A task dependency ends the walk along its path; any other dependency is
    /// left out and its own dependencies are examined instead. A node whose
    /// converter places it in another plan also ends the walk, and is listed
    /// only if it is a task. Tasks reachable through several paths are listed
    /// once, at their first discovery.
    fn find_task_dependencies(&self, node: &Node) -> Result<Vec<NodeIdentity>, LookupError>;

    /// Identities of the direct targets of `node` through edges of `kind`.
    fn find_successors(&self, node: &Node, kind: EdgeKind) -> Result<Vec<NodeIdentity>, LookupError>;
}

/// A [`DependencyLookup`] over one frozen plan.
///
/// Holds only shared references, so any number of lookups may run over the
/// same plan at once.
#[derive(Clone, Copy)]
pub struct PlanLookup<'a> {
    plan: &'a ExecutionPlan,
    registry: &'a ConverterRegistry,
}

impl<'a> PlanLookup<'a> {
    pub fn new(plan: &'a ExecutionPlan, registry: &'a ConverterRegistry) -> Self {
        Self { plan, registry }
    }

    pub fn plan(&self) -> &'a ExecutionPlan {
        self.plan
    }

    fn scoped(&self, node: &Node) -> Result<NodeIndex, LookupError> {
        let id = node.id();

        if !self.plan.contains(id) {
            return Err(LookupError::OutOfScope {
                node: id,
                plan: self.plan.path().into(),
            });
        }

        Ok(id.index)
    }

    fn identities(&self, indices: Vec<NodeIndex>) -> Vec<NodeIdentity> {
        let mut seen = HashSet::new();

        indices
            .into_iter()
            .map(|index| self.registry.identify(self.plan.node_at(index)))
            .filter(|identity| seen.insert(identity.clone()))
            .collect()
    }
}

impl DependencyLookup for PlanLookup<'_> {
    fn find_node_dependencies(&self, node: &Node) -> Result<Vec<NodeIdentity>, LookupError> {
        self.find_successors(node, EdgeKind::DependsOn)
    }

    fn find_task_dependencies(&self, node: &Node) -> Result<Vec<NodeIdentity>, LookupError> {
        let start = self.scoped(node)?;

        let mut visited = HashSet::from([start]);
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        // Successors are pushed in reverse so that they pop in declaration
        // order, which keeps the result identical to a recursive walk.
        let mut stack = self.plan.successor_indices(start, EdgeKind::DependsOn);
        stack.reverse();

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }

            let next = self.plan.node_at(index);

            if next.kind().is_task() {
                let identity = self.registry.identify(next);
                if seen.insert(identity.clone()) {
                    found.push(identity);
                }
                continue;
            }

            // Nodes of another plan are leaves here: their dependencies are
            // reported by the pass of the plan that owns them.
            let foreign = self
                .registry
                .converter(next.kind())
                .is_some_and(|converter| !converter.is_in_same_plan(next));

            if foreign {
                tracing::trace!(node = %next.id(), kind = %next.kind(), "delegated to another plan");
                continue;
            }

            tracing::trace!(node = %next.id(), kind = %next.kind(), "skipping over");

            let successors = self.plan.successor_indices(index, EdgeKind::DependsOn);
            stack.extend(successors.into_iter().rev());
        }

        Ok(found)
    }

    fn find_successors(&self, node: &Node, kind: EdgeKind) -> Result<Vec<NodeIdentity>, LookupError> {
        let index = self.scoped(node)?;
        Ok(self.identities(self.plan.successor_indices(index, kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{PlannedNodeConverter, RegistryBuilder, assert_convertible};
    use crate::model::{NodeKind, PlannedNode};
    use crate::plan::PlanBuilder;

    /// Declares every action to be work of another plan.
    struct DelegatedActionConverter;

    impl PlannedNodeConverter for DelegatedActionConverter {
        fn supported_kind(&self) -> NodeKind {
            NodeKind::Action
        }

        fn node_identity(&self, node: &Node) -> NodeIdentity {
            node.identity()
        }

        fn is_in_same_plan(&self, _: &Node) -> bool {
            false
        }

        fn convert(&self, node: &Node, _: &dyn DependencyLookup) -> Result<PlannedNode, LookupError> {
            assert_convertible(self, node);
            unreachable!()
        }
    }

    fn task(path: &str) -> NodeIdentity {
        NodeIdentity::new(NodeKind::Task, ":", path)
    }

    #[test]
    fn test_skips_structural_node() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let b = builder.add_ordinal("ordinal 0");
        let c = builder.add_task(":c", "Copy").unwrap();
        builder.depends_on(a, b).unwrap();
        builder.depends_on(b, c).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);
        let a = plan.node(a).unwrap();

        assert_eq!(lookup.find_task_dependencies(a).unwrap(), vec![task(":c")]);
        assert_eq!(
            lookup.find_node_dependencies(a).unwrap(),
            vec![NodeIdentity::new(NodeKind::Ordinal, ":", "#0")]
        );
    }

    #[test]
    fn test_stops_at_first_task() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let b = builder.add_task(":b", "Copy").unwrap();
        let c = builder.add_task(":c", "Copy").unwrap();
        builder.depends_on(a, b).unwrap();
        builder.depends_on(b, c).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);

        assert_eq!(
            lookup.find_task_dependencies(plan.node(a).unwrap()).unwrap(),
            vec![task(":b")]
        );
    }

    #[test]
    fn test_diamond_deduplicated_in_discovery_order() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let left = builder.add_action("left");
        let right = builder.add_resolve_mutations("right");
        let d = builder.add_task(":d", "Copy").unwrap();
        let e = builder.add_task(":e", "Copy").unwrap();
        builder.depends_on(a, left).unwrap();
        builder.depends_on(a, right).unwrap();
        builder.depends_on(left, d).unwrap();
        builder.depends_on(right, e).unwrap();
        builder.depends_on(right, d).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);

        assert_eq!(
            lookup.find_task_dependencies(plan.node(a).unwrap()).unwrap(),
            vec![task(":d"), task(":e")]
        );
    }

    #[test]
    fn test_nested_structural_nodes_follow_depth_first_order() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let outer = builder.add_ordinal("outer");
        let inner = builder.add_ordinal("inner");
        let b = builder.add_task(":b", "Copy").unwrap();
        let c = builder.add_task(":c", "Copy").unwrap();
        builder.depends_on(a, outer).unwrap();
        builder.depends_on(a, c).unwrap();
        builder.depends_on(outer, inner).unwrap();
        builder.depends_on(inner, b).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);

        assert_eq!(
            lookup.find_task_dependencies(plan.node(a).unwrap()).unwrap(),
            vec![task(":b"), task(":c")]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let x = builder.add_action("x");
        let y = builder.add_action("y");
        let b = builder.add_task(":b", "Copy").unwrap();
        builder.depends_on(a, x).unwrap();
        builder.depends_on(x, y).unwrap();
        builder.depends_on(y, x).unwrap();
        builder.depends_on(y, a).unwrap();
        builder.depends_on(y, b).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);

        assert_eq!(
            lookup.find_task_dependencies(plan.node(a).unwrap()).unwrap(),
            vec![task(":b")]
        );
    }

    #[test]
    fn test_foreign_proxy_is_an_opaque_leaf() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let group = builder.add_ordinal("group");
        let first = builder.add_task_in_another_plan(":lib", ":jar");
        let hidden = builder.add_task(":hidden", "Copy").unwrap();
        builder.depends_on(a, group).unwrap();
        builder.depends_on(group, first).unwrap();
        // Never traversed: a proxy stands for work the other plan reports.
        builder.depends_on(first, hidden).unwrap();

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);

        assert_eq!(
            lookup.find_task_dependencies(plan.node(a).unwrap()).unwrap(),
            vec![NodeIdentity::new(NodeKind::TaskInAnotherPlan, ":lib", ":jar")]
        );
    }

    #[test]
    fn test_delegated_kind_is_not_traversed() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let action = builder.add_action("delegated");
        let c = builder.add_task(":c", "Copy").unwrap();
        let d = builder.add_task(":d", "Copy").unwrap();
        builder.depends_on(a, action).unwrap();
        builder.depends_on(action, c).unwrap();
        builder.depends_on(a, d).unwrap();

        let plan = builder.finish();
        let registry = RegistryBuilder::builtin()
            .register(DelegatedActionConverter)
            .build()
            .unwrap();
        let lookup = plan.lookup(&registry);
        let a = plan.node(a).unwrap();

        assert_eq!(lookup.find_task_dependencies(a).unwrap(), vec![task(":d")]);

        // Without the converter the same action is skipped over.
        let builtin = ConverterRegistry::builtin();
        assert_eq!(
            plan.lookup(&builtin).find_task_dependencies(a).unwrap(),
            vec![task(":c"), task(":d")]
        );
    }

    #[test]
    fn test_leaf_has_no_dependencies() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);
        let a = plan.node(a).unwrap();

        assert!(lookup.find_task_dependencies(a).unwrap().is_empty());
        assert!(lookup.find_node_dependencies(a).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_scope() {
        let mut one = PlanBuilder::new(":");
        one.add_task(":a", "Copy").unwrap();
        let mut two = PlanBuilder::new(":other");
        let b = two.add_task(":b", "Copy").unwrap();

        let one = one.finish();
        let two = two.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = one.lookup(&registry);
        let b = two.node(b).unwrap();

        let expected = LookupError::OutOfScope {
            node: b.id(),
            plan: ":".into(),
        };
        assert_eq!(lookup.find_task_dependencies(b).unwrap_err(), expected);
        assert_eq!(lookup.find_node_dependencies(b).unwrap_err(), expected);
    }

    #[test]
    fn test_repeated_lookup_is_stable() {
        let mut builder = PlanBuilder::new(":");
        let a = builder.add_task(":a", "Copy").unwrap();
        let mut previous = a;
        for i in 0..20 {
            let step = if i % 3 == 0 {
                builder.add_task(format!(":t{i}"), "Copy").unwrap()
            } else {
                builder.add_action(format!("action {i}"))
            };
            builder.depends_on(previous, step).unwrap();
            builder.depends_on(a, step).unwrap();
            previous = step;
        }

        let plan = builder.finish();
        let registry = ConverterRegistry::builtin();
        let lookup = plan.lookup(&registry);
        let a = plan.node(a).unwrap();

        let first = lookup.find_task_dependencies(a).unwrap();
        let second = lookup.find_task_dependencies(a).unwrap();
        assert_eq!(first, second);

        let unique: HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
    }
}
