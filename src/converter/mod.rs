//! Conversion of plan nodes into exported records.
//!
//! Each [`PlannedNodeConverter`] handles exactly one [`NodeKind`]. The
//! [`ConverterRegistry`] is a lookup table from kind to converter, fixed once
//! it has been built. A kind without a converter is not an error: its nodes
//! simply never get a record of their own.

mod foreign;
mod task;
mod transform;

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

pub use crate::converter::foreign::TaskInAnotherPlanConverter;
pub use crate::converter::task::TaskConverter;
pub use crate::converter::transform::TransformStepConverter;

use crate::error::{LookupError, RegistryError};
use crate::lookup::DependencyLookup;
use crate::model::{NodeIdentity, NodeKind, PlannedNode};
use crate::plan::Node;

/// Identifies and converts nodes of a single [`NodeKind`].
pub trait PlannedNodeConverter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The kind of node this converter can identify and convert.
    fn supported_kind(&self) -> NodeKind;

    /// A unique identity for a node of the supported kind.
    ///
    /// Must work for every node of the supported kind, including ones that
    /// stand for work in another plan.
    fn node_identity(&self, node: &Node) -> NodeIdentity;

    /// Whether `node` is work of the plan being converted, as opposed to work
    /// delegated to another plan.
    fn is_in_same_plan(&self, node: &Node) -> bool;

    /// Converts a node into its exported record.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not of the supported kind or is not in the same
    /// plan. See [`assert_convertible`].
    fn convert(&self, node: &Node, lookup: &dyn DependencyLookup) -> Result<PlannedNode, LookupError>;
}

/// Enforces the calling contract of [`PlannedNodeConverter::convert`].
///
/// # Panics
///
/// Panics if the node's kind differs from the converter's supported kind, or
/// if the converter does not consider the node part of the same plan.
pub fn assert_convertible<C>(converter: &C, node: &Node)
where
    C: PlannedNodeConverter + ?Sized,
{
    assert_eq!(
        node.kind(),
        converter.supported_kind(),
        "{} cannot convert node {} of kind {}",
        converter.name(),
        node.id(),
        node.kind(),
    );
    assert!(
        converter.is_in_same_plan(node),
        "{} cannot convert node {}: it belongs to another plan",
        converter.name(),
        node.id(),
    );
}

static BUILTIN: LazyLock<ConverterRegistry> = LazyLock::new(ConverterRegistry::builtin);

/// The set of converters, one per kind, used for a conversion pass.
///
/// Immutable after construction, so a single registry can be shared by every
/// pass in the process.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: BTreeMap<NodeKind, Arc<dyn PlannedNodeConverter>>,
}

impl ConverterRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry with the converters for tasks, tasks in another plan and
    /// transform steps. Structural kinds stay unreportable.
    pub fn builtin() -> Self {
        let converters: [Arc<dyn PlannedNodeConverter>; 3] = [
            Arc::new(TaskConverter),
            Arc::new(TaskInAnotherPlanConverter),
            Arc::new(TransformStepConverter),
        ];

        Self {
            converters: converters
                .into_iter()
                .map(|converter| (converter.supported_kind(), converter))
                .collect(),
        }
    }

    /// A process-wide instance of [`ConverterRegistry::builtin`].
    pub fn shared() -> &'static ConverterRegistry {
        &BUILTIN
    }

    pub fn converter(&self, kind: NodeKind) -> Option<&dyn PlannedNodeConverter> {
        self.converters.get(&kind).map(|converter| converter.as_ref())
    }

    /// Kinds that have a converter, in [`NodeKind`] order.
    pub fn kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.converters.keys().copied()
    }

    /// The identity of any node, reportable or not.
    ///
    /// Nodes with a converter are identified by it; the rest fall back to the
    /// identity derived from the node itself, which keeps them referencable as
    /// dependencies even though they never get a record.
    pub fn identify(&self, node: &Node) -> NodeIdentity {
        match self.converter(node.kind()) {
            Some(converter) => converter.node_identity(node),
            None => node.identity(),
        }
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.converters.iter().map(|(kind, c)| (kind, c.name())))
            .finish()
    }
}

/// Collects converters for a [`ConverterRegistry`].
///
/// Ambiguity is only checked in [`RegistryBuilder::build`], before any node
/// is ever dispatched.
#[derive(Default)]
pub struct RegistryBuilder {
    converters: Vec<Arc<dyn PlannedNodeConverter>>,
}

impl RegistryBuilder {
    /// Starts from the built-in converters.
    pub fn builtin() -> Self {
        Self::default()
            .register(TaskConverter)
            .register(TaskInAnotherPlanConverter)
            .register(TransformStepConverter)
    }

    pub fn register(mut self, converter: impl PlannedNodeConverter + 'static) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn build(self) -> Result<ConverterRegistry, RegistryError> {
        let mut converters: BTreeMap<NodeKind, Arc<dyn PlannedNodeConverter>> = BTreeMap::new();

        for converter in self.converters {
            let kind = converter.supported_kind();

            if let Some(first) = converters.get(&kind) {
                return Err(RegistryError::Ambiguous {
                    kind,
                    first: first.name(),
                    second: converter.name(),
                });
            }

            converters.insert(kind, converter);
        }

        Ok(ConverterRegistry { converters })
    }
}
