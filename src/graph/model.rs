use std::collections::BTreeMap;

use tracing::debug;

use crate::foundation::error::{TexflowError, TexflowResult};
use crate::graph::order;
use crate::graph::ports::{NodePorts, PortRef, PortValue};
use crate::graph::settings::{OutputShape, ResourceSettings, SettingsEdit};
use crate::graph::shape;
use crate::nodes::{NodeKind, PortContext};
use crate::process::events::GraphEvent;

/// Stable identity of a node inside its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Severity of a node annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Node was skipped or partially processed.
    Warning,
    /// Node processing failed.
    Error,
}

/// One annotation attached to a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeMessage {
    /// Severity.
    pub kind: MessageKind,
    /// Text, also the de-duplication key.
    pub text: String,
}

/// De-duplicated per-node annotations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeMessages(Vec<NodeMessage>);

impl NodeMessages {
    /// Add a message unless one with the same text exists. Returns `true` when added.
    pub fn add(&mut self, kind: MessageKind, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.contains(&text) {
            return false;
        }
        self.0.push(NodeMessage { kind, text });
        true
    }

    /// Remove the message with this text. Returns `true` when one was removed.
    pub fn remove(&mut self, text: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.text != text);
        self.0.len() != before
    }

    /// Remove every message of the given severity.
    pub fn clear_kind(&mut self, kind: MessageKind) {
        self.0.retain(|m| m.kind != kind);
    }

    /// Return `true` when a message with this text exists.
    pub fn contains(&self, text: &str) -> bool {
        self.0.iter().any(|m| m.text == text)
    }

    /// Messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeMessage> {
        self.0.iter()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when there are no messages.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A graph node: kind-specific parameters plus the state the scheduler maintains for it.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    settings: ResourceSettings,
    enabled: bool,
    compute_order: u32,
    ports: NodePorts,
    pub(crate) inputs: BTreeMap<&'static str, PortValue>,
    pub(crate) outputs: BTreeMap<&'static str, PortValue>,
    pub(crate) messages: NodeMessages,
}

impl Node {
    /// Identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and parameters.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Render target settings.
    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// Return `false` when the node is skipped by graph runs.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Topological rank: greater than the rank of every upstream node.
    pub fn compute_order(&self) -> u32 {
        self.compute_order
    }

    /// Ports for the current settings.
    pub fn ports(&self) -> &NodePorts {
        &self.ports
    }

    /// Return `true` for time-driven nodes excluded from dependency chains.
    pub fn is_continuous(&self) -> bool {
        self.kind.is_continuous()
    }

    /// Value of an output port after the last successful process.
    pub fn output(&self, port: &str) -> Option<PortValue> {
        self.outputs.get(port).copied()
    }

    /// Value pulled into an input port by the last run.
    pub fn input(&self, port: &str) -> Option<PortValue> {
        self.inputs.get(port).copied()
    }

    /// Annotations.
    pub fn messages(&self) -> &NodeMessages {
        &self.messages
    }
}

/// Directed connection from an output port to an input port.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    /// Producing endpoint.
    pub from: PortRef,
    /// Consuming endpoint.
    pub to: PortRef,
    /// Value pushed by the producer during the last run.
    pub value: Option<PortValue>,
}

/// Texture dataflow graph.
///
/// Every structural edit re-runs the topological sort, so `compute_order` is always valid and an
/// edit that would introduce a cycle is rejected.
#[derive(Clone, Debug)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    next_id: u32,
    output: OutputShape,
    realtime: bool,
    order: Vec<NodeId>,
    events: Vec<GraphEvent>,
    released: Vec<NodeId>,
}

impl Graph {
    /// Empty graph with the given root output shape.
    pub fn new(output: OutputShape) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            next_id: 0,
            output,
            realtime: false,
            order: Vec::new(),
            events: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Root output shape.
    pub fn output_shape(&self) -> &OutputShape {
        &self.output
    }

    /// Change the root output shape. Ports are re-described for the new root dimension.
    pub fn set_output_shape(&mut self, output: OutputShape) {
        if self.output == output {
            return;
        }
        self.output = output;
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.refresh_ports(id);
        }
    }

    /// Realtime graphs run once per frame and feed the frame clock to time nodes.
    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    /// Switch between realtime and static mode.
    pub fn set_realtime(&mut self, realtime: bool) {
        self.realtime = realtime;
    }

    /// Add a node with its kind's default settings.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let settings = kind.default_settings();
        self.add_node_with_settings(name, kind, settings)
    }

    /// Add a node with explicit settings. The kind's edit mask still applies to later edits.
    pub fn add_node_with_settings(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        settings: ResourceSettings,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let ports = kind.describe_ports(&self.port_context(&settings));
        let name = name.into();
        debug!(%id, name = %name, kind = kind.label(), "node added");
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                kind,
                settings,
                enabled: true,
                compute_order: 0,
                ports,
                inputs: BTreeMap::new(),
                outputs: BTreeMap::new(),
                messages: NodeMessages::default(),
            },
        );
        self.reorder_infallible();
        id
    }

    /// Remove a node and every edge touching it. Its resources are released on the next run.
    pub fn remove_node(&mut self, id: NodeId) -> TexflowResult<Node> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| TexflowError::graph(format!("unknown node {id}")))?;
        let downstream: Vec<PortRef> = self
            .edges
            .iter()
            .filter(|e| e.from.node == id)
            .map(|e| e.to.clone())
            .collect();
        self.edges.retain(|e| e.from.node != id && e.to.node != id);
        for to in downstream {
            self.clear_input(&to);
        }
        self.released.push(id);
        self.reorder_infallible();
        Ok(node)
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look a node up by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.values().find(|n| n.name == name).map(|n| n.id)
    }

    /// All nodes, by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges feeding `node`.
    pub fn edges_into(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to.node == node)
    }

    /// Node ids in ascending compute order.
    pub fn compute_order(&self) -> &[NodeId] {
        &self.order
    }

    fn port_context(&self, settings: &ResourceSettings) -> PortContext {
        PortContext {
            dimension: shape::resolve_dimension(settings.dimension, self.output.dimension),
        }
    }

    fn require(&self, id: NodeId) -> TexflowResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| TexflowError::graph(format!("unknown node {id}")))
    }

    /// Connect an output port to an input port.
    ///
    /// An input accepts a single edge: an existing connection into `to` is replaced. Fails when a
    /// port is unknown, the types are incompatible, or the edge would close a cycle.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> TexflowResult<()> {
        let from_ty = self
            .require(from.node)?
            .ports
            .output(&from.port)
            .ok_or_else(|| TexflowError::graph(format!("unknown output port {from}")))?
            .ty;
        let to_ty = self
            .require(to.node)?
            .ports
            .input(&to.port)
            .ok_or_else(|| TexflowError::graph(format!("unknown input port {to}")))?
            .ty;
        if !to_ty.accepts(from_ty) {
            return Err(TexflowError::graph(format!(
                "cannot connect {from} ({from_ty}) to {to} ({to_ty})"
            )));
        }
        if from.node == to.node {
            return Err(TexflowError::graph(format!(
                "connecting {from} to {to} would create a cycle"
            )));
        }

        let replaced = self
            .edges
            .iter()
            .position(|e| e.to == to)
            .map(|i| self.edges.remove(i));
        self.edges.push(Edge {
            from: from.clone(),
            to: to.clone(),
            value: None,
        });
        if let Err(e) = self.reorder() {
            self.edges.pop();
            if let Some(old) = replaced {
                self.edges.push(old);
            }
            self.reorder_infallible();
            return Err(e);
        }
        self.clear_input(&to);
        debug!(%from, %to, "connected");
        Ok(())
    }

    /// Remove the edge feeding `to`. Returns `true` when one existed.
    pub fn disconnect(&mut self, to: &PortRef) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.to != *to);
        if self.edges.len() == before {
            return false;
        }
        self.clear_input(to);
        self.reorder_infallible();
        true
    }

    fn clear_input(&mut self, to: &PortRef) {
        if let Some(n) = self.nodes.get_mut(&to.node) {
            n.inputs.retain(|k, _| *k != to.port);
        }
    }

    /// Enable or disable a node. Disabling releases its resources on the next run and clears its
    /// outputs.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> TexflowResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| TexflowError::graph(format!("unknown node {id}")))?;
        if node.enabled == enabled {
            return Ok(());
        }
        node.enabled = enabled;
        if !enabled {
            node.outputs.clear();
            for e in self.edges.iter_mut().filter(|e| e.from.node == id) {
                e.value = None;
            }
            self.released.push(id);
        }
        Ok(())
    }

    /// Apply an inspector edit to a node's settings.
    ///
    /// Returns whether the settings changed; changes queue a [`GraphEvent::SettingsChanged`] and
    /// re-describe the node's ports.
    pub fn update_settings(&mut self, id: NodeId, edit: SettingsEdit) -> TexflowResult<bool> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| TexflowError::graph(format!("unknown node {id}")))?;
        let changed = node.settings.apply(edit)?;
        if changed {
            self.events.push(GraphEvent::SettingsChanged { node: id });
            self.refresh_ports(id);
        }
        Ok(changed)
    }

    /// Replace a node's parameters. The kind itself cannot change.
    pub fn update_kind(&mut self, id: NodeId, kind: NodeKind) -> TexflowResult<bool> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| TexflowError::graph(format!("unknown node {id}")))?;
        if std::mem::discriminant(&node.kind) != std::mem::discriminant(&kind) {
            return Err(TexflowError::validation(format!(
                "cannot turn {} node {id} into {}",
                node.kind.label(),
                kind.label()
            )));
        }
        if node.kind == kind {
            return Ok(false);
        }
        node.kind = kind;
        self.events.push(GraphEvent::SettingsChanged { node: id });
        self.refresh_ports(id);
        Ok(true)
    }

    /// Re-describe a node's ports and drop edges whose types no longer match.
    fn refresh_ports(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let ports = node.kind.describe_ports(&self.port_context(&node.settings));
        if let Some(node) = self.nodes.get_mut(&id) {
            node.ports = ports;
        }

        let mut dropped = Vec::new();
        self.edges.retain(|e| {
            if e.from.node != id && e.to.node != id {
                return true;
            }
            let from = self
                .nodes
                .get(&e.from.node)
                .and_then(|n| n.ports.output(&e.from.port));
            let to = self
                .nodes
                .get(&e.to.node)
                .and_then(|n| n.ports.input(&e.to.port));
            let keep = matches!((from, to), (Some(f), Some(t)) if t.ty.accepts(f.ty));
            if !keep {
                dropped.push((e.from.clone(), e.to.clone()));
            }
            keep
        });
        if dropped.is_empty() {
            return;
        }
        for (from, to) in dropped {
            debug!(%from, %to, "edge dropped after port change");
            self.clear_input(&to);
            self.events.push(GraphEvent::EdgeDropped { from, to });
        }
        self.reorder_infallible();
    }

    fn reorder(&mut self) -> TexflowResult<()> {
        let order = order::topological_order(self.nodes.keys().copied(), &self.edges)?;
        for (rank, id) in order.iter().enumerate() {
            if let Some(n) = self.nodes.get_mut(id) {
                n.compute_order = rank as u32;
            }
        }
        self.order = order;
        Ok(())
    }

    // Removing nodes or edges cannot introduce a cycle.
    fn reorder_infallible(&mut self) {
        if let Err(e) = self.reorder() {
            tracing::error!(error = %e, "graph order invalid after edit");
        }
    }

    /// Ordered upstream chain of `node`, see [`order::dependencies`].
    pub fn dependencies(&self, node: NodeId) -> TexflowResult<Vec<NodeId>> {
        order::dependencies(self, node)
    }

    /// Take the events queued by edits since the last call.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn take_released(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.released)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
