use thiserror::Error;

use crate::core::ArcStr;
use crate::model::NodeKind;
use crate::plan::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Converters '{first}' and '{second}' both claim node kind {kind}")]
    Ambiguous {
        kind: NodeKind,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Node {node} is not part of plan '{plan}'")]
    OutOfScope { node: NodeId, plan: ArcStr },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Task '{0}' is already part of plan '{1}'")]
    DuplicateTask(ArcStr, ArcStr),

    #[error("Node {0} was not created by plan '{1}'")]
    ForeignNode(NodeId, ArcStr),

    #[error("Node {0} cannot depend on itself")]
    SelfDependency(NodeId),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Dependency lookup failed.\n{0}")]
    Lookup(#[from] LookupError),

    #[error("Couldn't serialize planned nodes.\n{0}")]
    Serialize(#[from] serde_json::Error),
}
