use crate::converter::{PlannedNodeConverter, assert_convertible};
use crate::error::LookupError;
use crate::lookup::DependencyLookup;
use crate::model::{NodeDetails, NodeIdentity, NodeKind, PlannedNode};
use crate::plan::{Node, NodePayload};

/// Converts artifact transform steps.
///
/// Unlike tasks, transform steps report their direct dependencies as they
/// are, structural nodes included.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformStepConverter;

impl PlannedNodeConverter for TransformStepConverter {
    fn name(&self) -> &'static str {
        "TransformStepConverter"
    }

    fn supported_kind(&self) -> NodeKind {
        NodeKind::TransformStep
    }

    fn node_identity(&self, node: &Node) -> NodeIdentity {
        debug_assert_eq!(node.kind(), NodeKind::TransformStep);
        node.identity()
    }

    fn is_in_same_plan(&self, node: &Node) -> bool {
        node.kind() == NodeKind::TransformStep
    }

    fn convert(&self, node: &Node, lookup: &dyn DependencyLookup) -> Result<PlannedNode, LookupError> {
        assert_convertible(self, node);

        let NodePayload::TransformStep {
            transform,
            component,
            ..
        } = node.payload()
        else {
            unreachable!("transform step node without transform payload");
        };

        Ok(PlannedNode::new(
            self.node_identity(node),
            lookup.find_node_dependencies(node)?,
            NodeDetails::TransformStep {
                transform: transform.clone(),
                component: component.clone(),
            },
        ))
    }
}
