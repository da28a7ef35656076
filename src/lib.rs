#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod boundary;
mod converter;
mod core;
mod error;
mod graph;
mod lookup;
mod model;
mod plan;
mod utils;

pub use crate::boundary::{Boundary, route};
pub use crate::converter::{
    ConverterRegistry, PlannedNodeConverter, RegistryBuilder, TaskConverter,
    TaskInAnotherPlanConverter, TransformStepConverter, assert_convertible,
};
pub use crate::error::*;
pub use crate::graph::PlannedGraph;
pub use crate::lookup::{DependencyLookup, PlanLookup};
pub use crate::model::{NodeDetails, NodeIdentity, NodeKind, PlannedNode};
pub use crate::plan::{EdgeKind, ExecutionPlan, Node, NodeId, NodePayload, PlanBuilder, PlanId};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
