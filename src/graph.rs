//! The conversion pass and its result.
//!
//! A pass walks every node of a frozen [`ExecutionPlan`] once, routes it
//! through the plan boundary and converts the local, reportable ones. Nodes
//! are converted in parallel, but records come out in plan order, so two
//! passes over the same plan always produce the same [`PlannedGraph`].

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::boundary::{self, Boundary};
use crate::converter::{ConverterRegistry, PlannedNodeConverter};
use crate::core::{ArcStr, Hash32};
use crate::error::ConvertError;
use crate::lookup::PlanLookup;
use crate::model::{NodeIdentity, NodeKind, PlannedNode};
use crate::plan::{ExecutionPlan, Node};
use crate::utils::mermaid_label;

/// The exported form of one execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedGraph {
    plan: ArcStr,
    nodes: Vec<PlannedNode>,
}

pub(crate) fn convert(
    plan: &ExecutionPlan,
    registry: &ConverterRegistry,
) -> Result<PlannedGraph, ConvertError> {
    let span = tracing::info_span!("planned_graph", plan = %plan.path());
    let _enter = span.enter();

    let lookup = PlanLookup::new(plan, registry);

    let pending: Vec<(&Node, &dyn PlannedNodeConverter)> = plan
        .nodes()
        .filter_map(|node| match boundary::route(plan, registry, node) {
            Boundary::Convert(converter) => Some((node, converter)),
            Boundary::Foreign => {
                tracing::debug!(node = %node.id(), kind = %node.kind(), "delegated to another plan");
                None
            }
            Boundary::Unreportable => {
                tracing::debug!(node = %node.id(), kind = %node.kind(), "no converter, not reported");
                None
            }
        })
        .collect();

    let nodes = pending
        .par_iter()
        .map(|(node, converter)| converter.convert(node, &lookup))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("converted {} of {} nodes", nodes.len(), plan.len());

    Ok(PlannedGraph {
        plan: plan.path().into(),
        nodes,
    })
}

impl PlannedGraph {
    /// Path of the plan these records were produced from.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// All records, in plan order.
    pub fn nodes(&self) -> &[PlannedNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<PlannedNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, identity: &NodeIdentity) -> Option<&PlannedNode> {
        self.nodes.iter().find(|node| &node.identity == identity)
    }

    /// Records of the requested kinds only.
    pub fn of_kinds<'a>(&'a self, kinds: &'a [NodeKind]) -> impl Iterator<Item = &'a PlannedNode> {
        self.nodes.iter().filter(|node| kinds.contains(&node.kind))
    }

    /// Dependency identities that have no record in this graph.
    ///
    /// These are defined by another pass: tasks of other plans, or nodes of
    /// kinds that are not reported.
    pub fn external(&self) -> Vec<&NodeIdentity> {
        let known: HashSet<_> = self.nodes.iter().map(|node| &node.identity).collect();
        let mut seen = HashSet::new();

        self.nodes
            .iter()
            .flat_map(|node| &node.dependencies)
            .filter(|identity| !known.contains(identity) && seen.insert(*identity))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ConvertError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConvertError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// BLAKE3 digest of the serialized records, as lowercase hex.
    ///
    /// Equal for every pass over an unchanged plan.
    pub fn fingerprint(&self) -> Result<String, ConvertError> {
        let json = serde_json::to_vec(self)?;
        Ok(Hash32::hash(json).to_hex())
    }

    /// Renders the records as a Mermaid diagram. See the [`Display`] impl.
    pub fn render_mermaid(&self) -> String {
        self.to_string()
    }
}

/// Mermaid `graph LR` diagram of the records. Identities without a record
/// are drawn with a dashed border.
impl Display for PlannedGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        let mut ids: HashMap<&NodeIdentity, String> = HashMap::new();

        for (i, node) in self.nodes.iter().enumerate() {
            let id = format!("n{i}");
            let name = mermaid_label(&node.identity.path);
            writeln!(f, "    {id}[\"{}\\n{}\"]", node.kind, name)?;
            ids.insert(&node.identity, id);
        }

        for (i, identity) in self.external().into_iter().enumerate() {
            let id = format!("x{i}");
            let name = mermaid_label(&identity.to_string());
            writeln!(f, "    {id}[\"{name}\"]")?;
            writeln!(f, "    style {id} stroke-dasharray: 5 5")?;
            ids.insert(identity, id);
        }

        for node in &self.nodes {
            for dependency in &node.dependencies {
                writeln!(f, "    {} --> {}", ids[&node.identity], ids[dependency])?;
            }
        }

        Ok(())
    }
}
