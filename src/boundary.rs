use crate::converter::{ConverterRegistry, PlannedNodeConverter};
use crate::plan::{ExecutionPlan, Node};

/// Where a node ends up when its plan is converted.
#[derive(Clone, Copy)]
pub enum Boundary<'r> {
    /// Local work: converted into a record by this converter.
    Convert(&'r dyn PlannedNodeConverter),
    /// Work owned by another plan. Exported only as a dependency identity,
    /// never opened or traversed.
    Foreign,
    /// No converter for the kind. Left out of the records.
    Unreportable,
}

impl std::fmt::Debug for Boundary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Boundary::Convert(converter) => write!(f, "Boundary::Convert({})", converter.name()),
            Boundary::Foreign => write!(f, "Boundary::Foreign"),
            Boundary::Unreportable => write!(f, "Boundary::Unreportable"),
        }
    }
}

/// Decides how `node` is treated by a conversion pass over `plan`.
///
/// A node is only converted when it was created by `plan`, its kind has a
/// converter, and that converter considers it part of the same plan.
pub fn route<'r>(plan: &ExecutionPlan, registry: &'r ConverterRegistry, node: &Node) -> Boundary<'r> {
    if !plan.contains(node.id()) {
        return Boundary::Foreign;
    }

    match registry.converter(node.kind()) {
        None => Boundary::Unreportable,
        Some(converter) if converter.is_in_same_plan(node) => Boundary::Convert(converter),
        Some(_) => Boundary::Foreign,
    }
}
