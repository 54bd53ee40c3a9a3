use crate::graph::model::NodeId;
use crate::graph::ports::PortRef;
use crate::render::resources::ResourceEvent;
use crate::texture::format::ExportFormat;

/// Notification produced by graph edits and runs, consumed synchronously by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A node's settings or parameters changed.
    SettingsChanged {
        /// Node whose settings or kind were replaced; its targets are re-ensured on the next run.
        node: NodeId,
    },
    /// An edge was removed because its port types stopped matching.
    EdgeDropped {
        /// Output port that used to feed the edge.
        from: PortRef,
        /// Input port left unconnected; [`GraphEvent::node`] reports its node.
        to: PortRef,
    },
    /// A node is about to record its work.
    BeforeProcess {
        /// Node whose target is about to be ensured.
        node: NodeId,
    },
    /// A node finished recording.
    AfterProcess {
        /// Node whose commands were recorded (and submitted on success).
        node: NodeId,
    },
    /// Result of a node's processing step.
    Processed {
        /// Node that ran; its outputs were republished only when `success` is set.
        node: NodeId,
        /// `false` when outputs were left stale.
        success: bool,
    },
    /// A node was skipped because its configuration is unsupported.
    Skipped {
        /// Node that recorded nothing and kept its previous outputs.
        node: NodeId,
    },
    /// First occurrence of a de-duplicated warning.
    Warning {
        /// Node whose message list gained the warning.
        node: NodeId,
        /// Text as stored in the node's messages; re-raising the same text emits no event.
        message: String,
    },
    /// A node's processing step or its submission failed.
    Failed {
        /// Node that keeps its previous outputs.
        node: NodeId,
        /// Display form of the [`TexflowError`](crate::TexflowError), also stored as an error
        /// message on the node.
        error: String,
    },
    /// Allocation decision of the resource manager.
    Resource(ResourceEvent),
    /// A disabled or removed node's textures were released.
    Released {
        /// Node that no longer owns any target.
        node: NodeId,
        /// Textures freed, counting both instances of double-buffered targets.
        textures: usize,
    },
    /// An output node decided its export format.
    ExportDecided {
        /// Output node that produced the texture.
        node: NodeId,
        /// Requested compression when the device supports it, otherwise the fallback.
        format: ExportFormat,
    },
}

/// Outcome of one graph run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Frame index of the run (1-based).
    pub frame: u64,
    /// Nodes visited, in compute order.
    pub order: Vec<NodeId>,
    /// Nodes whose processing succeeded.
    pub processed: Vec<NodeId>,
    /// Nodes whose processing returned `false` or failed.
    pub failed: Vec<NodeId>,
    /// Nodes skipped for unsupported configurations.
    pub skipped: Vec<NodeId>,
    /// Commands submitted to the backend.
    pub commands: usize,
    /// Everything that happened, in order.
    pub events: Vec<GraphEvent>,
}

impl RunReport {
    /// Return `true` when the node processed successfully.
    pub fn succeeded(&self, node: NodeId) -> bool {
        self.processed.contains(&node)
    }

    /// Events concerning one node.
    pub fn events_for(&self, node: NodeId) -> impl Iterator<Item = &GraphEvent> {
        self.events.iter().filter(move |e| e.node() == Some(node))
    }

    /// Warning texts raised during the run.
    pub fn warnings(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.events.iter().filter_map(|e| match e {
            GraphEvent::Warning { node, message } => Some((*node, message.as_str())),
            _ => None,
        })
    }
}

impl GraphEvent {
    /// Node the event concerns, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::SettingsChanged { node }
            | Self::BeforeProcess { node }
            | Self::AfterProcess { node }
            | Self::Processed { node, .. }
            | Self::Skipped { node }
            | Self::Warning { node, .. }
            | Self::Failed { node, .. }
            | Self::Released { node, .. }
            | Self::ExportDecided { node, .. } => Some(*node),
            Self::EdgeDropped { to, .. } => Some(to.node),
            Self::Resource(r) => Some(match r {
                ResourceEvent::Created { key, .. }
                | ResourceEvent::Recreated { key, .. }
                | ResourceEvent::Resized { key, .. }
                | ResourceEvent::FormatFallback { key, .. } => key.node,
            }),
        }
    }
}
