use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{TexflowError, TexflowResult};
use crate::graph::model::{Graph, NodeId};
use crate::graph::ports::PortRef;
use crate::graph::settings::{OutputShape, SettingsEdit};
use crate::nodes::NodeKind;

/// Serialized graph document.
///
/// ```json
/// {
///   "output": { "width": 64, "height": 64, "format": "rgba8_unorm", "dimension": "texture_2d" },
///   "nodes": [
///     { "id": "dot", "node": { "kind": "dot", "params": { "radius": 0.05 } } },
///     { "id": "sdf", "node": { "kind": "distance", "params": {} } }
///   ],
///   "edges": [ { "from": "dot.output", "to": "sdf.input" } ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
    /// Root output shape.
    pub output: OutputShape,
    /// Realtime graphs advance the frame clock on every run.
    #[serde(default)]
    pub realtime: bool,
    /// Nodes, added in this order.
    pub nodes: Vec<NodeDef>,
    /// Connections.
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

/// One node of a [`GraphDef`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique name, referenced by edges.
    pub id: String,
    /// Kind and parameters.
    pub node: NodeKind,
    /// Settings edits applied over the kind's defaults, subject to its edit mask.
    #[serde(default)]
    pub settings: Vec<SettingsEdit>,
    /// Disabled nodes are kept but never processed.
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

/// Connection written as `"node.port"` endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
    /// Producing endpoint.
    pub from: String,
    /// Consuming endpoint.
    pub to: String,
}

/// A graph built from a [`GraphDef`] plus the name of every node.
#[derive(Clone, Debug)]
pub struct LoadedGraph {
    /// Built graph.
    pub graph: Graph,
    /// Document ids to node ids.
    pub names: BTreeMap<String, NodeId>,
}

impl LoadedGraph {
    /// Node id for a document id.
    pub fn id(&self, name: &str) -> TexflowResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| TexflowError::graph(format!("unknown node '{name}'")))
    }
}

fn split_endpoint(s: &str) -> TexflowResult<(&str, &str)> {
    match s.rsplit_once('.') {
        Some((node, port)) if !node.is_empty() && !port.is_empty() => Ok((node, port)),
        _ => Err(TexflowError::validation(format!(
            "endpoint '{s}' must be written as node.port"
        ))),
    }
}

impl GraphDef {
    /// Parse a JSON document.
    pub fn from_json(s: &str) -> TexflowResult<Self> {
        serde_json::from_str(s).map_err(|e| TexflowError::serde(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> TexflowResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TexflowError::serde(e.to_string()))
    }

    /// Check document-level consistency without building anything.
    pub fn validate(&self) -> TexflowResult<()> {
        if self.output.width == 0 || self.output.height == 0 || self.output.depth == 0 {
            return Err(TexflowError::validation(
                "output width/height/depth must be > 0",
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for n in &self.nodes {
            if n.id.trim().is_empty() {
                return Err(TexflowError::validation("node id must be non-empty"));
            }
            if !seen.insert(n.id.as_str()) {
                return Err(TexflowError::validation(format!(
                    "duplicate node id '{}'",
                    n.id
                )));
            }
        }
        for e in &self.edges {
            for endpoint in [&e.from, &e.to] {
                let (node, _) = split_endpoint(endpoint)?;
                if !seen.contains(node) {
                    return Err(TexflowError::validation(format!(
                        "edge endpoint '{endpoint}' references missing node '{node}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the graph: nodes in document order, then settings edits, then edges.
    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(nodes = self.nodes.len(), edges = self.edges.len())
    )]
    pub fn build(&self) -> TexflowResult<LoadedGraph> {
        self.validate()?;
        let mut graph = Graph::new(self.output);
        graph.set_realtime(self.realtime);
        let mut names = BTreeMap::new();
        for n in &self.nodes {
            let id = graph.add_node(n.id.clone(), n.node.clone());
            for edit in &n.settings {
                graph.update_settings(id, *edit).map_err(|e| {
                    TexflowError::validation(format!("node '{}': {e}", n.id))
                })?;
            }
            if !n.enabled {
                graph.set_enabled(id, false)?;
            }
            names.insert(n.id.clone(), id);
        }
        // Settings edits were applied while building; callers only see later changes.
        graph.drain_events();

        let lookup = |name: &str| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| TexflowError::graph(format!("unknown node '{name}'")))
        };
        for e in &self.edges {
            let (from_node, from_port) = split_endpoint(&e.from)?;
            let (to_node, to_port) = split_endpoint(&e.to)?;
            graph.connect(
                PortRef::new(lookup(from_node)?, from_port),
                PortRef::new(lookup(to_node)?, to_port),
            )?;
        }
        Ok(LoadedGraph { graph, names })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/def.rs"]
mod tests;
