use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::graph::model::{Graph, NodeId};
use crate::graph::ports::PortRef;
use crate::graph::settings::OutputShape;
use crate::nodes::{DotNode, NodeKind};
use crate::process::scheduler::{GraphRuntime, RuntimeOpts};
use crate::render::arena::TextureArena;
use crate::render::cpu::{CpuCompute, CpuComputeOpts};
use crate::render::kernel::{Command, ComputeBackend, SampleTiming};
use crate::render::resources::ResourceKey;
use crate::texture::format::TextureFormat;

struct Recorder {
    inner: CpuCompute,
    log: Rc<RefCell<Vec<Command>>>,
}

impl ComputeBackend for Recorder {
    fn submit(
        &mut self,
        commands: &[Command],
        arena: &mut TextureArena,
    ) -> TexflowResult<Vec<SampleTiming>> {
        self.log.borrow_mut().extend_from_slice(commands);
        self.inner.submit(commands, arena)
    }
}

fn sdf_graph(node: DistanceNode) -> (Graph, NodeId, NodeId) {
    let mut g = Graph::new(OutputShape::texture_2d(16, 16, TextureFormat::Rgba32Float));
    let dot = g.add_node("dot", NodeKind::Dot(DotNode::default()));
    let sdf = g.add_node("sdf", NodeKind::Distance(node));
    g.connect(PortRef::new(dot, "output"), PortRef::new(sdf, "input"))
        .unwrap();
    (g, dot, sdf)
}

fn runtime() -> GraphRuntime {
    GraphRuntime::new(&RuntimeOpts {
        parallel: false,
        ..RuntimeOpts::default()
    })
    .unwrap()
}

#[test]
fn uv_mode_points_every_texel_at_the_single_seed() {
    let (mut g, _, sdf) = sdf_graph(DistanceNode {
        mode: DistanceOutput::Uv,
        ..DistanceNode::default()
    });
    let mut rt = runtime();
    assert!(rt.run_graph(&mut g).unwrap().succeeded(sdf));

    let t = rt.output_texture(&g, sdf).unwrap();
    let seed = 8.5 / 16.0;
    for px in t.texels() {
        assert_eq!((px[0], px[1]), (seed, seed));
    }
    assert_eq!(t.load(8, 8, 0)[3], 1.0);
    // 50% of a 16 texel target fades out over 8 texels.
    assert!((t.load(12, 8, 0)[3] - 0.5).abs() < 1e-6);
    assert_eq!(t.load(0, 8, 0)[3], 0.0);
}

#[test]
fn mask_mode_marks_texels_inside_the_distance() {
    let (mut g, _, sdf) = sdf_graph(DistanceNode {
        mode: DistanceOutput::Mask,
        distance: 25.0,
        ..DistanceNode::default()
    });
    let mut rt = runtime();
    rt.run_graph(&mut g).unwrap();
    let t = rt.output_texture(&g, sdf).unwrap();
    assert_eq!(t.load(8, 8, 0)[0], 1.0);
    assert_eq!(t.load(11, 8, 0)[0], 1.0);
    assert_eq!(t.load(12, 8, 0)[0], 0.0);
}

#[test]
fn chebyshev_metric_grows_squares() {
    let (mut g, _, sdf) = sdf_graph(DistanceNode {
        mode: DistanceOutput::Mask,
        metric: DistanceMetric::Chebyshev,
        distance: 25.0,
        ..DistanceNode::default()
    });
    let mut rt = runtime();
    rt.run_graph(&mut g).unwrap();
    let t = rt.output_texture(&g, sdf).unwrap();
    assert_eq!(t.load(11, 11, 0)[0], 1.0);
    assert_eq!(t.load(12, 11, 0)[0], 0.0);
}

#[test]
fn passes_are_recorded_in_flood_order_without_aliasing() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let backend = Recorder {
        inner: CpuCompute::new(&CpuComputeOpts {
            parallel: false,
            threads: None,
        })
        .unwrap(),
        log: Rc::clone(&log),
    };
    let mut rt = GraphRuntime::with_backend(&RuntimeOpts::default(), Box::new(backend));
    let (mut g, _, sdf) = sdf_graph(DistanceNode::default());
    rt.run_graph(&mut g).unwrap();

    let target = rt.resources().target(ResourceKey::output(sdf)).unwrap();
    let (output, scratch) = (target.read_instance(), target.write_instance());
    let log = log.borrow();
    let start = log
        .iter()
        .position(|c| matches!(c, Command::BeginSample { name } if name == "sdf"))
        .unwrap();
    let passes: Vec<String> = log[start + 1..]
        .iter()
        .take_while(|c| !matches!(c, Command::EndSample))
        .map(|c| match c {
            Command::Dispatch(d) => {
                assert!(!d.reads().contains(&d.written().unwrap()), "{}", d.kernel.name);
                d.kernel.name.to_string()
            }
            Command::CopyTexture { src, dst } => {
                assert_eq!((*src, *dst), (scratch, output));
                "Copy".to_string()
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();

    let mut expected = vec!["FillUVMap".to_string()];
    for _ in flood_offsets(16) {
        expected.push("JumpFlooding".to_string());
        expected.push("Copy".to_string());
    }
    expected.push("FinalPass".to_string());
    assert_eq!(passes, expected);
    assert_eq!(
        g.node(sdf).unwrap().output("output"),
        Some(PortValue::Texture(output))
    );
}

#[test]
fn missing_input_is_a_failure_not_an_error() {
    let mut g = Graph::new(OutputShape::texture_2d(8, 8, TextureFormat::Rgba32Float));
    let sdf = g.add_node("sdf", NodeKind::Distance(DistanceNode::default()));
    let mut rt = runtime();
    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![sdf]);
    assert!(g.node(sdf).unwrap().messages().is_empty());
}
