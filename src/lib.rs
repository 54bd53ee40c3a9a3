//! texflow is a texture dataflow engine.
//!
//! Graphs of texture-producing nodes are scheduled in dependency order and recorded as
//! GPU-style command lists executed by a compute backend (a row-parallel CPU device here):
//!
//! - Build a [`Graph`] in code or load a [`GraphDef`] from JSON
//! - Create a [`GraphRuntime`] and call [`GraphRuntime::run_graph`]
//! - Read results back through [`GraphRuntime::output_texture`]
//!
//! Render targets are sized from per-node [`ResourceSettings`] against the graph's
//! [`OutputShape`], reused across runs, and double buffered for multi-pass nodes such as the
//! jump-flood [`DistanceNode`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;
mod texture;

pub(crate) mod graph;
pub(crate) mod nodes;
pub(crate) mod process;
pub(crate) mod render;

pub use crate::foundation::core::{Extent3, Rgba};
pub use crate::foundation::error::{TexflowError, TexflowResult};

pub use crate::texture::format::{
    Channels, CompressionFormat, ExportFormat, FormatSupport, OutputChannel, OutputPrecision,
    Precision, TextureDimension, TextureFormat,
};
pub use crate::texture::storage::{FilterMode, MipOptions, Texture, TextureDesc, WrapMode};

pub use crate::graph::def::{EdgeDef, GraphDef, LoadedGraph, NodeDef};
pub use crate::graph::model::{
    Edge, Graph, MessageKind, Node, NodeId, NodeMessage, NodeMessages,
};
pub use crate::graph::order::{dependencies, topological_order};
pub use crate::graph::ports::{NodePorts, PortRef, PortSpec, PortType, PortValue};
pub use crate::graph::settings::{
    EditFlags, OutputDimension, OutputShape, PotSize, ResourceSettings, SettingsEdit, SizeMode,
};
pub use crate::graph::shape::{ResolvedShape, resolve as resolve_shape, resolve_dimension};

pub use crate::nodes::{
    BlurNode, CheckerNode, DistanceNode, DotNode, Fire2DNode, HsvNode, MaskCombineNode, NodeKind,
    NoiseNode, NormalFromHeightNode, OutputNode, PortContext, ProcessCtx, TimeNode, UniformNode,
};

pub use crate::process::events::{GraphEvent, RunReport};
pub use crate::process::scheduler::{FrameClock, GraphRuntime, RuntimeOpts};

pub use crate::render::arena::{TextureArena, TextureHandle};
pub use crate::render::cpu::{CpuCompute, CpuComputeOpts, CpuComputeStats};
pub use crate::render::fluid::BorderMode;
pub use crate::render::jfa::{
    DistanceMetric, DistanceOutput, NO_FEATURE, ThresholdMode, flood_offsets,
};
pub use crate::render::kernel::{
    BLUR_PROGRAM, COLOR_PROGRAM, Command, CommandBuffer, ComputeBackend, ComputeProgram,
    DISTANCE_PROGRAM, Dispatch, FIRE_PROGRAM, GENERATE_PROGRAM, KernelDecl, KernelParams,
    OUTPUT_PROGRAM, ProgramRegistry, SampleTiming,
};
pub use crate::render::profiling::{Profiler, ScopeTiming};
pub use crate::render::resources::{
    RenderTarget, ResourceEvent, ResourceKey, ResourceManager, ResourceStats, TargetOptions,
};
