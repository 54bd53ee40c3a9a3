use super::*;
use crate::graph::model::{Graph, NodeId};
use crate::graph::ports::PortRef;
use crate::graph::settings::OutputShape;
use crate::nodes::{DotNode, NodeKind};
use crate::process::scheduler::{GraphRuntime, RuntimeOpts};
use crate::render::resources::ResourceKey;
use crate::texture::format::TextureFormat;

fn blurred(blur: BlurNode) -> (Graph, GraphRuntime, NodeId, usize) {
    let mut g = Graph::new(OutputShape::texture_2d(16, 16, TextureFormat::Rgba32Float));
    let dot = g.add_node("dot", NodeKind::Dot(DotNode::default()));
    let b = g.add_node("blur", NodeKind::Blur(blur));
    g.connect(PortRef::new(dot, "output"), PortRef::new(b, "input"))
        .unwrap();
    let mut rt = GraphRuntime::new(&RuntimeOpts {
        parallel: false,
        ..RuntimeOpts::default()
    })
    .unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.succeeded(b));
    (g, rt, b, report.commands)
}

#[test]
fn blur_spreads_a_dot_and_keeps_its_energy() {
    let (g, rt, b, _) = blurred(BlurNode::default());
    let t = rt.output_texture(&g, b).unwrap();
    let center = t.load(8, 8, 0)[0];
    assert!(center > 0.0 && center < 1.0, "{center}");
    assert!(t.load(9, 8, 0)[0] > 0.0);
    assert!(t.load(8, 9, 0)[0] > 0.0);

    let total: f32 = t.texels().iter().map(|px| px[0]).sum();
    assert!((total - 1.0).abs() < 1e-3, "{total}");
}

#[test]
fn each_iteration_records_a_horizontal_and_a_vertical_pass() {
    // The dot contributes a scope pair and one dispatch; the blur adds its own scope pair.
    let (_, _, _, one) = blurred(BlurNode {
        radius: 1,
        iterations: 1,
    });
    let (_, _, _, three) = blurred(BlurNode {
        radius: 1,
        iterations: 3,
    });
    assert_eq!(one, 3 + 2 + 2);
    assert_eq!(three, 3 + 2 + 6);
}

#[test]
fn zero_iterations_still_run_one_pair() {
    let (_, _, _, commands) = blurred(BlurNode {
        radius: 1,
        iterations: 0,
    });
    assert_eq!(commands, 3 + 2 + 2);
}

#[test]
fn output_is_the_read_instance_of_the_ping_pong_pair() {
    let (g, rt, b, _) = blurred(BlurNode::default());
    let target = rt.resources().target(ResourceKey::output(b)).unwrap();
    assert!(target.is_double_buffered());
    assert_eq!(
        g.node(b).unwrap().output("output"),
        Some(PortValue::Texture(target.read_instance()))
    );
    assert_ne!(target.read_instance(), target.write_instance());
}

#[test]
fn unconnected_blur_reports_failure() {
    let mut g = Graph::new(OutputShape::texture_2d(8, 8, TextureFormat::Rgba32Float));
    let b = g.add_node("blur", NodeKind::Blur(BlurNode::default()));
    let mut rt = GraphRuntime::new(&RuntimeOpts::default()).unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![b]);
    assert!(g.node(b).unwrap().output("output").is_none());
}
