use super::*;
use crate::graph::model::{Graph, NodeId};
use crate::graph::settings::OutputShape;
use crate::nodes::NodeKind;
use crate::process::scheduler::{GraphRuntime, RuntimeOpts};
use crate::texture::format::TextureFormat;

fn runtime() -> GraphRuntime {
    GraphRuntime::new(&RuntimeOpts {
        parallel: false,
        ..RuntimeOpts::default()
    })
    .unwrap()
}

fn single(kind: NodeKind, size: u32) -> (Graph, NodeId) {
    let mut g = Graph::new(OutputShape::texture_2d(size, size, TextureFormat::Rgba32Float));
    let id = g.add_node("src", kind);
    (g, id)
}

#[test]
fn uniform_fills_every_texel() {
    let color = Rgba::new(0.25, 0.5, 0.75, 1.0);
    let (mut g, id) = single(NodeKind::Uniform(UniformNode { color }), 4);
    let mut rt = runtime();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.succeeded(id));

    let t = rt.output_texture(&g, id).unwrap();
    assert!(t.texels().iter().all(|px| *px == color.to_array()));
}

#[test]
fn checker_alternates_cells() {
    let (mut g, id) = single(
        NodeKind::Checker(CheckerNode {
            cells: 2,
            ..CheckerNode::default()
        }),
        4,
    );
    let mut rt = runtime();
    rt.run_graph(&mut g).unwrap();
    let t = rt.output_texture(&g, id).unwrap();
    assert_eq!(t.load(0, 0, 0), Rgba::WHITE.to_array());
    assert_eq!(t.load(2, 0, 0), Rgba::BLACK.to_array());
    assert_eq!(t.load(2, 2, 0), Rgba::WHITE.to_array());
}

#[test]
fn zero_cells_fail_without_publishing() {
    let (mut g, id) = single(
        NodeKind::Checker(CheckerNode {
            cells: 0,
            ..CheckerNode::default()
        }),
        4,
    );
    let mut rt = runtime();
    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![id]);
    assert!(g.node(id).unwrap().output("output").is_none());
    assert!(!g.node(id).unwrap().messages().is_empty());
}

#[test]
fn dot_with_zero_radius_marks_one_texel() {
    let (mut g, id) = single(NodeKind::Dot(DotNode::default()), 8);
    let mut rt = runtime();
    rt.run_graph(&mut g).unwrap();
    let t = rt.output_texture(&g, id).unwrap();
    let lit = t
        .texels()
        .iter()
        .filter(|px| **px == Rgba::WHITE.to_array())
        .count();
    assert_eq!(lit, 1);
    assert_eq!(t.load(4, 4, 0), Rgba::WHITE.to_array());
}

#[test]
fn noise_is_deterministic_per_seed() {
    let render = |seed| {
        let (mut g, id) = single(
            NodeKind::Noise(NoiseNode {
                seed,
                ..NoiseNode::default()
            }),
            8,
        );
        let mut rt = runtime();
        rt.run_graph(&mut g).unwrap();
        rt.output_texture(&g, id).unwrap().texels().to_vec()
    };
    assert_eq!(render(7), render(7));
    assert_ne!(render(7), render(8));
}

#[test]
fn time_is_frozen_in_static_graphs_and_advances_in_realtime() {
    let (mut g, id) = single(NodeKind::Time(TimeNode::default()), 4);
    let mut rt = GraphRuntime::new(&RuntimeOpts {
        parallel: false,
        frame_delta: 0.5,
        ..RuntimeOpts::default()
    })
    .unwrap();

    rt.run_graph(&mut g).unwrap();
    assert_eq!(g.node(id).unwrap().output("time"), Some(PortValue::Float(0.0)));

    g.set_realtime(true);
    rt.run_graph(&mut g).unwrap();
    rt.run_graph(&mut g).unwrap();
    let node = g.node(id).unwrap();
    assert_eq!(node.output("time"), Some(PortValue::Float(1.0)));
    assert_eq!(node.output("delta_time"), Some(PortValue::Float(0.5)));
    assert_eq!(node.output("frame_count"), Some(PortValue::Float(2.0)));
    assert_eq!(node.output("sin_time"), Some(PortValue::Float(1.0f32.sin())));
    assert!(!rt.resources().has_targets(id));
}
