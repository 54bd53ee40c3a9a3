use super::*;
use crate::foundation::core::Rgba;
use crate::graph::model::{Graph, NodeId};
use crate::graph::ports::PortRef;
use crate::graph::settings::OutputShape;
use crate::nodes::{NodeKind, TimeNode, UniformNode};
use crate::process::scheduler::{GraphRuntime, RuntimeOpts};
use crate::texture::format::{TextureDimension, TextureFormat};

fn close(a: [f32; 4], b: [f32; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
}

fn fed_by_uniform(color: Rgba, kind: NodeKind, port: &str) -> (Graph, NodeId) {
    let mut g = Graph::new(OutputShape::texture_2d(4, 4, TextureFormat::Rgba32Float));
    let src = g.add_node("src", NodeKind::Uniform(UniformNode { color }));
    let id = g.add_node("fx", kind);
    g.connect(PortRef::new(src, "output"), PortRef::new(id, port))
        .unwrap();
    (g, id)
}

fn runtime(frame_delta: f32) -> GraphRuntime {
    GraphRuntime::new(&RuntimeOpts {
        parallel: false,
        frame_delta,
        ..RuntimeOpts::default()
    })
    .unwrap()
}

#[test]
fn hsv_rotates_hue_and_scales_value() {
    let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
    let (mut g, id) = fed_by_uniform(
        red,
        NodeKind::Hsv(HsvNode {
            hue: 1.0 / 3.0,
            saturation: 1.0,
            value: 0.5,
        }),
        "input",
    );
    let mut rt = runtime(0.0);
    rt.run_graph(&mut g).unwrap();
    let px = rt.output_texture(&g, id).unwrap().load(1, 1, 0);
    assert!(close(px, [0.0, 0.5, 0.0, 1.0]), "{px:?}");
}

#[test]
fn hue_input_overrides_the_parameter() {
    let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
    let (mut g, id) = fed_by_uniform(red, NodeKind::Hsv(HsvNode::default()), "input");
    let time = g.add_node("time", NodeKind::Time(TimeNode::default()));
    g.connect(PortRef::new(time, "time"), PortRef::new(id, "hue"))
        .unwrap();
    g.set_realtime(true);

    let mut rt = runtime(2.0 / 3.0);
    rt.run_graph(&mut g).unwrap();
    let px = rt.output_texture(&g, id).unwrap().load(0, 0, 0);
    assert!(close(px, [0.0, 0.0, 1.0, 1.0]), "{px:?}");
}

#[test]
fn fixed_shader_nodes_profile_under_their_own_name() {
    let (mut g, _) = fed_by_uniform(Rgba::WHITE, NodeKind::Hsv(HsvNode::default()), "input");
    let mut rt = runtime(0.0);
    rt.run_graph(&mut g).unwrap();
    rt.run_graph(&mut g).unwrap();
    let scope = rt.profiler().scope("fx").unwrap();
    assert_eq!(scope.count, 1);
    assert_eq!(rt.profiler().scope("src").unwrap().count, 1);
}

#[test]
fn flat_height_gives_an_upward_normal() {
    let (mut g, id) = fed_by_uniform(
        Rgba::splat(0.7),
        NodeKind::NormalFromHeight(NormalFromHeightNode::default()),
        "input",
    );
    let mut rt = runtime(0.0);
    rt.run_graph(&mut g).unwrap();
    let px = rt.output_texture(&g, id).unwrap().load(2, 2, 0);
    assert!(close(px, [0.5, 0.5, 1.0, 1.0]), "{px:?}");
}

#[test]
fn mask_combine_uses_defaults_for_missing_masks() {
    let (mut g, id) = fed_by_uniform(
        Rgba::WHITE,
        NodeKind::MaskCombine(MaskCombineNode::default()),
        "occlusion",
    );
    let mut rt = runtime(0.0);
    assert!(rt.run_graph(&mut g).unwrap().succeeded(id));
    let px = rt.output_texture(&g, id).unwrap().load(0, 0, 0);
    assert!(close(px, [0.0, 1.0, 0.0, 0.5]), "{px:?}");
}

#[test]
fn flat_only_kinds_are_skipped_in_volume_graphs() {
    let mut g = Graph::new(OutputShape {
        width: 4,
        height: 4,
        depth: 4,
        format: TextureFormat::Rgba32Float,
        dimension: TextureDimension::Texture3D,
    });
    let id = g.add_node("masks", NodeKind::MaskCombine(MaskCombineNode::default()));
    assert_eq!(
        g.node(id).unwrap().settings().dimension,
        OutputDimension::Texture2D
    );
    let mut rt = runtime(0.0);
    assert!(rt.run_graph(&mut g).unwrap().succeeded(id));
}
