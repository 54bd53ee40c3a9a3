use std::collections::BTreeMap;

use tracing::{debug, debug_span, warn};

use crate::foundation::error::TexflowResult;
use crate::graph::model::{Graph, MessageKind, Node, NodeId, NodeMessages};
use crate::graph::ports::PortValue;
use crate::graph::settings::ResourceSettings;
use crate::graph::shape::{self, ResolvedShape};
use crate::nodes::{NodeKind, ProcessCtx};
use crate::process::events::{GraphEvent, RunReport};
use crate::render::cpu::{CpuCompute, CpuComputeOpts};
use crate::render::kernel::{CommandBuffer, ComputeBackend, ProgramRegistry};
use crate::render::profiling::Profiler;
use crate::render::resources::{ResourceKey, ResourceManager};
use crate::texture::format::{FormatSupport, TextureDimension};
use crate::texture::storage::Texture;

/// Clock fed to time nodes of realtime graphs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
    /// Seconds since the first realtime frame.
    pub time: f32,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Realtime frames run so far.
    pub frame_count: u64,
}

impl FrameClock {
    /// Step the clock by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
        self.delta_time = dt;
        self.frame_count += 1;
    }
}

/// Options for [`GraphRuntime`].
#[derive(Clone, Debug)]
pub struct RuntimeOpts {
    /// Run kernels row-parallel on a rayon pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Formats the device can allocate.
    pub formats: FormatSupport,
    /// Seconds added to the frame clock per realtime run.
    pub frame_delta: f32,
}

impl Default for RuntimeOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            formats: FormatSupport::all(),
            frame_delta: 1.0 / 60.0,
        }
    }
}

fn dimension_warning(d: TextureDimension) -> String {
    format!("Dimension {d} is not supported by this node")
}

struct Job {
    id: NodeId,
    name: String,
    kind: NodeKind,
    settings: ResourceSettings,
    shape: ResolvedShape,
}

/// Executes graphs: owns the render targets, the program registry and the compute backend.
pub struct GraphRuntime {
    resources: ResourceManager,
    registry: ProgramRegistry,
    backend: Box<dyn ComputeBackend>,
    profiler: Profiler,
    clock: FrameClock,
    frame_delta: f32,
    reset_pending: bool,
}

impl std::fmt::Debug for GraphRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRuntime")
            .field("resources", &self.resources)
            .field("frame", &self.profiler.frame())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl GraphRuntime {
    /// Runtime backed by the CPU compute device.
    pub fn new(opts: &RuntimeOpts) -> TexflowResult<Self> {
        let backend = CpuCompute::new(&CpuComputeOpts {
            parallel: opts.parallel,
            threads: opts.threads,
        })?;
        Ok(Self::with_backend(opts, Box::new(backend)))
    }

    /// Runtime backed by any compute backend.
    pub fn with_backend(opts: &RuntimeOpts, backend: Box<dyn ComputeBackend>) -> Self {
        Self {
            resources: ResourceManager::new(opts.formats.clone()),
            registry: ProgramRegistry::builtin(),
            backend,
            profiler: Profiler::default(),
            clock: FrameClock::default(),
            frame_delta: opts.frame_delta,
            reset_pending: false,
        }
    }

    /// Render targets and allocation counters.
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Program registry (unregister programs to simulate a missing shader).
    pub fn registry_mut(&mut self) -> &mut ProgramRegistry {
        &mut self.registry
    }

    /// Frame-delayed profiling results.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Realtime clock.
    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    /// Restart realtime simulation: the clock goes back to zero and simulation nodes clear their
    /// state on the next realtime run.
    pub fn reset_realtime(&mut self) {
        debug!(frame = self.clock.frame_count, "realtime reset");
        self.clock = FrameClock::default();
        self.reset_pending = true;
    }

    /// Texture behind a texture port value.
    pub fn texture(&self, value: PortValue) -> Option<&Texture> {
        value.texture().and_then(|h| self.resources.texture(h))
    }

    /// Texture published on a node's `output` port.
    pub fn output_texture(&self, graph: &Graph, node: NodeId) -> Option<&Texture> {
        graph
            .node(node)
            .and_then(|n| n.output("output"))
            .and_then(|v| self.texture(v))
    }

    /// Release the resources of nodes removed or disabled since the last call.
    pub fn release_pending(&mut self, graph: &mut Graph) -> Vec<GraphEvent> {
        graph
            .take_released()
            .into_iter()
            .filter_map(|node| {
                let textures = self.resources.release_node(node);
                (textures > 0).then_some(GraphEvent::Released { node, textures })
            })
            .collect()
    }

    /// Run every enabled node in ascending compute order.
    ///
    /// Node failures are contained: the node keeps its previous outputs, gets a message, and the
    /// run continues.
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = graph.len()))]
    pub fn run_graph(&mut self, graph: &mut Graph) -> TexflowResult<RunReport> {
        self.profiler.begin_frame();
        if graph.is_realtime() {
            self.clock.advance(self.frame_delta);
        }

        let mut report = RunReport {
            frame: self.profiler.frame(),
            order: graph.compute_order().to_vec(),
            ..RunReport::default()
        };
        report.events.extend(graph.drain_events());
        let released = self.release_pending(graph);
        report.events.extend(released);

        let root = *graph.output_shape();
        let realtime = graph.is_realtime();
        for id in report.order.clone() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            if !node.enabled() {
                continue;
            }
            let job = Job {
                id,
                name: node.name().to_string(),
                kind: node.kind().clone(),
                settings: node.settings().clone(),
                shape: shape::resolve(node.settings(), &root),
            };
            let span = debug_span!("node", node = %id, name = %job.name, kind = job.kind.label());
            let _guard = span.enter();

            let inputs = pull_inputs(graph, node);
            let Some(node) = graph.node_mut(id) else {
                continue;
            };
            node.inputs = inputs.clone();
            let mut messages = std::mem::take(&mut node.messages);

            if !job.kind.supported_dimensions().contains(&job.shape.dimension) {
                let text = dimension_warning(job.shape.dimension);
                if messages.add(MessageKind::Warning, text.clone()) {
                    warn!(dimension = %job.shape.dimension, "node skipped: {text}");
                    report.events.push(GraphEvent::Warning {
                        node: id,
                        message: text,
                    });
                }
                report.events.push(GraphEvent::Skipped { node: id });
                report.skipped.push(id);
                if let Some(node) = graph.node_mut(id) {
                    node.messages = messages;
                }
                continue;
            }
            for d in [
                TextureDimension::Texture2D,
                TextureDimension::Texture3D,
                TextureDimension::Cube,
            ] {
                messages.remove(&dimension_warning(d));
            }

            report.events.push(GraphEvent::BeforeProcess { node: id });
            let mut cmd = CommandBuffer::default();
            let recorded = self.record(
                &job,
                &inputs,
                &mut messages,
                &mut report.events,
                &mut cmd,
                realtime,
            );
            let outcome = match recorded {
                Ok(Some(outputs)) => {
                    match self.backend.submit(cmd.commands(), self.resources.arena_mut()) {
                        Ok(timings) => {
                            report.commands += cmd.len();
                            self.profiler.record(timings);
                            Ok(Some(outputs))
                        }
                        Err(e) => Err(e),
                    }
                }
                other => other,
            };
            report.events.extend(
                self.resources
                    .drain_events()
                    .into_iter()
                    .map(GraphEvent::Resource),
            );

            let success = match outcome {
                Ok(Some(outputs)) => {
                    messages.clear_kind(MessageKind::Error);
                    if let Some(node) = graph.node_mut(id) {
                        node.outputs = outputs;
                    }
                    self.resources.commit(id);
                    true
                }
                Ok(None) => {
                    debug!("node returned failure, outputs left stale");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "node failed");
                    messages.add(MessageKind::Error, e.to_string());
                    report.events.push(GraphEvent::Failed {
                        node: id,
                        error: e.to_string(),
                    });
                    false
                }
            };
            if let Some(node) = graph.node_mut(id) {
                node.messages = messages;
            }
            report.events.push(GraphEvent::AfterProcess { node: id });
            report.events.push(GraphEvent::Processed { node: id, success });
            if success {
                report.processed.push(id);
            } else {
                report.failed.push(id);
            }

            push_outputs(graph, id);
        }

        if realtime {
            self.reset_pending = false;
        }
        debug!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            commands = report.commands,
            "graph run finished"
        );
        Ok(report)
    }

    // Target setup, the node body, then scope cleanup. Commands are only submitted by the caller.
    fn record(
        &mut self,
        job: &Job,
        inputs: &BTreeMap<&'static str, PortValue>,
        messages: &mut NodeMessages,
        events: &mut Vec<GraphEvent>,
        cmd: &mut CommandBuffer,
        realtime: bool,
    ) -> TexflowResult<Option<BTreeMap<&'static str, PortValue>>> {
        if let Some(opts) = job.kind.target_options(&job.settings) {
            self.resources
                .ensure(ResourceKey::output(job.id), &job.shape, opts)?;
        }

        let scoped = !job.kind.uses_own_profiling_scope();
        if scoped {
            cmd.begin_sample(job.name.clone());
        }
        let mut ctx = ProcessCtx {
            node: job.id,
            name: &job.name,
            shape: job.shape,
            realtime,
            reset: self.reset_pending,
            clock: self.clock,
            inputs,
            outputs: BTreeMap::new(),
            messages,
            events,
            resources: &mut self.resources,
            registry: &self.registry,
            cmd,
        };
        let ok = job.kind.process(&mut ctx)?;
        let outputs = ctx.outputs;
        if scoped {
            cmd.end_sample();
        }
        Ok(ok.then_some(outputs))
    }
}

fn pull_inputs(graph: &Graph, node: &Node) -> BTreeMap<&'static str, PortValue> {
    node.ports()
        .inputs
        .iter()
        .filter_map(|spec| {
            graph
                .edges_into(node.id())
                .find(|e| e.to.port == spec.name)
                .and_then(|e| e.value)
                .map(|v| (spec.name, v))
        })
        .collect()
}

fn push_outputs(graph: &mut Graph, id: NodeId) {
    let Some(outputs) = graph.node(id).map(|n| n.outputs.clone()) else {
        return;
    };
    for e in graph.edges_mut().iter_mut().filter(|e| e.from.node == id) {
        e.value = outputs.get(e.from.port.as_str()).copied();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/scheduler.rs"]
mod tests;
