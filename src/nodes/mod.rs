//! Node kinds: a closed set of tagged variants sharing one capability surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use tracing::warn;

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::graph::model::{MessageKind, NodeId, NodeMessages};
use crate::graph::ports::{NodePorts, PortSpec, PortType, PortValue};
use crate::graph::settings::ResourceSettings;
use crate::graph::shape::ResolvedShape;
use crate::process::events::GraphEvent;
use crate::process::scheduler::FrameClock;
use crate::render::arena::TextureHandle;
use crate::render::kernel::{CommandBuffer, ComputeProgram, ProgramRegistry};
use crate::render::resources::{RenderTarget, ResourceKey, ResourceManager, TargetOptions};
use crate::texture::format::TextureDimension;
use crate::texture::storage::MipOptions;

pub(crate) mod blur;
pub(crate) mod color;
pub(crate) mod distance;
pub(crate) mod output;
pub(crate) mod simulation;
pub(crate) mod sources;

pub use blur::BlurNode;
pub use color::{HsvNode, MaskCombineNode, NormalFromHeightNode};
pub use distance::DistanceNode;
pub use output::OutputNode;
pub use simulation::Fire2DNode;
pub use sources::{CheckerNode, DotNode, NoiseNode, TimeNode, UniformNode};

const ALL_DIMENSIONS: &[TextureDimension] = &[
    TextureDimension::Texture2D,
    TextureDimension::Texture3D,
    TextureDimension::Cube,
];
const FLAT_AND_VOLUME: &[TextureDimension] =
    &[TextureDimension::Texture2D, TextureDimension::Texture3D];
const FLAT_ONLY: &[TextureDimension] = &[TextureDimension::Texture2D];

/// Every node kind with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum NodeKind {
    /// Constant color.
    Uniform(UniformNode),
    /// Two-color checkerboard.
    Checker(CheckerNode),
    /// Single dot on a background.
    Dot(DotNode),
    /// Seeded value noise.
    Noise(NoiseNode),
    /// Frame clock source.
    Time(TimeNode),
    /// Hue/saturation/value adjustment.
    Hsv(HsvNode),
    /// Normal map from a height map.
    NormalFromHeight(NormalFromHeightNode),
    /// Four grayscale masks packed into RGBA.
    MaskCombine(MaskCombineNode),
    /// Separable gaussian blur.
    Blur(BlurNode),
    /// Jump-flood distance transform.
    Distance(DistanceNode),
    /// Graph sink.
    Output(OutputNode),
    /// Realtime fire simulation.
    #[serde(rename = "fire_2d")]
    Fire2D(Fire2DNode),
}

/// Inputs to port description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortContext {
    /// Resolved dimension of the node's target; texture ports carry it.
    pub dimension: TextureDimension,
}

impl NodeKind {
    /// Short kind name, used for default profiling scope names and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uniform(_) => "Uniform",
            Self::Checker(_) => "Checker",
            Self::Dot(_) => "Dot",
            Self::Noise(_) => "Noise",
            Self::Time(_) => "Time",
            Self::Hsv(_) => "Hsv",
            Self::NormalFromHeight(_) => "NormalFromHeight",
            Self::MaskCombine(_) => "MaskCombine",
            Self::Blur(_) => "Blur",
            Self::Distance(_) => "Distance",
            Self::Output(_) => "Output",
            Self::Fire2D(_) => "Fire2D",
        }
    }

    /// Dimensions the node can process.
    pub fn supported_dimensions(&self) -> &'static [TextureDimension] {
        match self {
            Self::NormalFromHeight(_) | Self::MaskCombine(_) | Self::Fire2D(_) => FLAT_ONLY,
            Self::Blur(_) | Self::Distance(_) => FLAT_AND_VOLUME,
            Self::Uniform(_)
            | Self::Checker(_)
            | Self::Dot(_)
            | Self::Noise(_)
            | Self::Time(_)
            | Self::Hsv(_)
            | Self::Output(_) => ALL_DIMENSIONS,
        }
    }

    /// Ports for the given context.
    pub fn describe_ports(&self, ctx: &PortContext) -> NodePorts {
        let tex = PortType::Texture(ctx.dimension);
        let output = || smallvec![PortSpec::new("output", tex)];
        match self {
            Self::Uniform(_) | Self::Checker(_) | Self::Dot(_) | Self::Noise(_) => NodePorts {
                inputs: smallvec![],
                outputs: output(),
            },
            Self::Time(_) => NodePorts {
                inputs: smallvec![],
                outputs: sources::TIME_PORTS
                    .iter()
                    .map(|p| PortSpec::new(*p, PortType::Float))
                    .collect(),
            },
            Self::Hsv(_) => NodePorts {
                inputs: smallvec![
                    PortSpec::new("input", tex),
                    PortSpec::optional("hue", PortType::Float),
                ],
                outputs: output(),
            },
            Self::MaskCombine(_) => NodePorts {
                inputs: color::MASK_PORTS
                    .iter()
                    .map(|(port, _)| PortSpec::optional(*port, tex))
                    .collect(),
                outputs: output(),
            },
            Self::NormalFromHeight(_) | Self::Blur(_) | Self::Distance(_) | Self::Output(_) => {
                NodePorts {
                    inputs: smallvec![PortSpec::new("input", tex)],
                    outputs: output(),
                }
            }
            Self::Fire2D(_) => NodePorts {
                inputs: simulation::FIRE_INPUTS
                    .iter()
                    .map(|p| PortSpec::optional(*p, tex))
                    .collect(),
                outputs: std::iter::once("output")
                    .chain(simulation::FIRE_OUTPUTS)
                    .map(|p| PortSpec::new(p, tex))
                    .collect(),
            },
        }
    }

    /// Settings a fresh node of this kind starts with.
    pub fn default_settings(&self) -> ResourceSettings {
        match self {
            Self::Time(_) => ResourceSettings {
                edit_flags: crate::graph::settings::EditFlags::NONE,
                ..ResourceSettings::default()
            },
            Self::Blur(_) => ResourceSettings {
                double_buffered: true,
                ..ResourceSettings::default()
            },
            Self::Distance(_) => distance::settings(),
            Self::Fire2D(_) => simulation::settings(),
            Self::NormalFromHeight(_) | Self::MaskCombine(_) => color::flat_settings(),
            Self::Uniform(_)
            | Self::Checker(_)
            | Self::Dot(_)
            | Self::Noise(_)
            | Self::Hsv(_)
            | Self::Output(_) => ResourceSettings::default(),
        }
    }

    /// Allocation options of the node's render target, `None` when it owns no texture.
    pub fn target_options(&self, settings: &ResourceSettings) -> Option<TargetOptions> {
        let mips = match self {
            Self::Time(_) => return None,
            Self::Output(o) => MipOptions {
                has_mips: o.has_mips,
                auto_generate: false,
            },
            _ => MipOptions::default(),
        };
        // Multi-pass kernels ping-pong regardless of what the settings ask for.
        let ping_pong = matches!(self, Self::Blur(_) | Self::Distance(_) | Self::Fire2D(_));
        Some(TargetOptions {
            double_buffered: settings.double_buffered || ping_pong,
            wrap: settings.wrap_mode,
            filter: settings.filter_mode,
            mips,
        })
    }

    /// Time-driven nodes are always ready and excluded from dependency chains.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    /// Nodes that record their own profiling marker are not wrapped by the scheduler.
    pub fn uses_own_profiling_scope(&self) -> bool {
        matches!(
            self,
            Self::Hsv(_) | Self::NormalFromHeight(_) | Self::MaskCombine(_)
        )
    }

    /// Record the node's work. `Ok(false)` leaves the previous outputs in place.
    pub fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        match self {
            Self::Uniform(n) => n.process(ctx),
            Self::Checker(n) => n.process(ctx),
            Self::Dot(n) => n.process(ctx),
            Self::Noise(n) => n.process(ctx),
            Self::Time(n) => n.process(ctx),
            Self::Hsv(n) => n.process(ctx),
            Self::NormalFromHeight(n) => n.process(ctx),
            Self::MaskCombine(n) => n.process(ctx),
            Self::Blur(n) => n.process(ctx),
            Self::Distance(n) => n.process(ctx),
            Self::Output(n) => n.process(ctx),
            Self::Fire2D(n) => n.process(ctx),
        }
    }
}

/// Everything a node sees while it records its work.
///
/// Outputs are staged: the scheduler publishes them only when processing succeeds.
pub struct ProcessCtx<'a> {
    pub(crate) node: NodeId,
    pub(crate) name: &'a str,
    pub(crate) shape: ResolvedShape,
    pub(crate) realtime: bool,
    /// Set on the first run after [`crate::GraphRuntime::reset_realtime`].
    pub(crate) reset: bool,
    pub(crate) clock: FrameClock,
    pub(crate) inputs: &'a BTreeMap<&'static str, PortValue>,
    pub(crate) outputs: BTreeMap<&'static str, PortValue>,
    pub(crate) messages: &'a mut NodeMessages,
    pub(crate) events: &'a mut Vec<GraphEvent>,
    pub(crate) resources: &'a mut ResourceManager,
    pub(crate) registry: &'a ProgramRegistry,
    pub(crate) cmd: &'a mut CommandBuffer,
}

impl ProcessCtx<'_> {
    /// Texture bound to an input port.
    pub(crate) fn input_texture(&self, port: &str) -> Option<TextureHandle> {
        self.inputs.get(port).and_then(|v| v.texture())
    }

    /// Scalar bound to an input port.
    pub(crate) fn input_float(&self, port: &str) -> Option<f32> {
        self.inputs.get(port).and_then(|v| v.as_float())
    }

    pub(crate) fn key(&self) -> ResourceKey {
        ResourceKey::output(self.node)
    }

    /// Key of an extra target the node owns next to its output.
    pub(crate) fn slot(&self, slot: &'static str) -> ResourceKey {
        ResourceKey {
            node: self.node,
            slot,
        }
    }

    pub(crate) fn target_at(&self, key: ResourceKey) -> TexflowResult<RenderTarget> {
        self.resources
            .target(key)
            .cloned()
            .ok_or_else(|| TexflowError::not_found(format!("render target {key}")))
    }

    /// Current state of the node's main render target.
    pub(crate) fn target(&self) -> TexflowResult<RenderTarget> {
        self.resources
            .target(self.key())
            .cloned()
            .ok_or_else(|| TexflowError::not_found(format!("render target of {}", self.name)))
    }

    pub(crate) fn program(&mut self, name: &'static str) -> TexflowResult<ComputeProgram> {
        self.resources.program(self.node, name, self.registry)
    }

    /// Storage extent of a texture, used as the dispatch grid.
    pub(crate) fn extent(&self, texture: TextureHandle) -> TexflowResult<Extent3> {
        self.resources
            .texture(texture)
            .map(|t| t.extent())
            .ok_or_else(|| TexflowError::not_found(format!("texture {texture}")))
    }

    pub(crate) fn set_output(&mut self, port: &'static str, value: PortValue) {
        self.outputs.insert(port, value);
    }

    /// Attach a de-duplicated warning; only the first occurrence is logged and reported.
    pub(crate) fn warn(&mut self, text: &str) {
        if self.messages.add(MessageKind::Warning, text) {
            warn!(node = %self.node, name = self.name, "{text}");
            self.events.push(GraphEvent::Warning {
                node: self.node,
                message: text.to_string(),
            });
        }
    }

    pub(crate) fn clear_warning(&mut self, text: &str) {
        self.messages.remove(text);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/kinds.rs"]
mod tests;
