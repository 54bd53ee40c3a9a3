use super::*;
use crate::graph::ports::PortRef;
use crate::graph::settings::{OutputDimension, OutputShape, SettingsEdit};
use crate::nodes::{BlurNode, CheckerNode, DotNode, NodeKind, UniformNode};
use crate::render::kernel::BLUR_PROGRAM;
use crate::texture::format::{OutputPrecision, TextureFormat};

fn opts() -> RuntimeOpts {
    RuntimeOpts {
        parallel: false,
        ..RuntimeOpts::default()
    }
}

fn graph() -> Graph {
    Graph::new(OutputShape::texture_2d(8, 8, TextureFormat::Rgba8Unorm))
}

fn chain(g: &mut Graph, src: NodeKind) -> (NodeId, NodeId) {
    let a = g.add_node("src", src);
    let b = g.add_node("blur", NodeKind::Blur(BlurNode::default()));
    g.connect(PortRef::new(a, "output"), PortRef::new(b, "input"))
        .unwrap();
    (a, b)
}

#[test]
fn clock_advances_by_the_frame_delta() {
    let mut c = FrameClock::default();
    c.advance(0.25);
    c.advance(0.25);
    assert_eq!(
        c,
        FrameClock {
            time: 0.5,
            delta_time: 0.25,
            frame_count: 2,
        }
    );
}

#[test]
fn events_bracket_each_node() {
    let mut g = graph();
    let (a, b) = chain(&mut g, NodeKind::Dot(DotNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    let report = rt.run_graph(&mut g).unwrap();

    assert_eq!(report.order, vec![a, b]);
    assert_eq!(report.processed, vec![a, b]);
    let lifecycle: Vec<&GraphEvent> = report
        .events_for(b)
        .filter(|e| !matches!(e, GraphEvent::Resource(_)))
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            &GraphEvent::BeforeProcess { node: b },
            &GraphEvent::AfterProcess { node: b },
            &GraphEvent::Processed {
                node: b,
                success: true
            },
        ]
    );
    assert_eq!(
        g.edges()[0].value,
        g.node(a).unwrap().output("output")
    );
}

#[test]
fn unchanged_graphs_allocate_nothing_on_later_runs() {
    let mut g = graph();
    chain(&mut g, NodeKind::Dot(DotNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    rt.run_graph(&mut g).unwrap();
    let stats = rt.resources().stats();
    assert_eq!(stats.allocations, 3);

    for _ in 0..3 {
        let report = rt.run_graph(&mut g).unwrap();
        assert!(
            !report
                .events
                .iter()
                .any(|e| matches!(e, GraphEvent::Resource(_)))
        );
    }
    assert_eq!(rt.resources().stats(), stats);
}

#[test]
fn failures_keep_previous_outputs_and_do_not_stop_the_run() {
    let mut g = graph();
    let (src, blur) = chain(&mut g, NodeKind::Checker(CheckerNode::default()));
    let other = g.add_node("other", NodeKind::Uniform(UniformNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    rt.run_graph(&mut g).unwrap();
    let published = g.node(src).unwrap().output("output");
    assert!(published.is_some());

    g.update_kind(
        src,
        NodeKind::Checker(CheckerNode {
            cells: 0,
            ..CheckerNode::default()
        }),
    )
    .unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![src]);
    assert!(report.succeeded(blur));
    assert!(report.succeeded(other));
    assert_eq!(g.node(src).unwrap().output("output"), published);
    assert_eq!(g.node(src).unwrap().messages().len(), 1);
    assert!(
        report
            .events_for(src)
            .any(|e| matches!(e, GraphEvent::Failed { .. }))
    );

    g.update_kind(src, NodeKind::Checker(CheckerNode::default()))
        .unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.succeeded(src));
    assert!(g.node(src).unwrap().messages().is_empty());
}

#[test]
fn recreated_targets_keep_stale_outputs_readable_until_success() {
    let mut g = graph();
    let (src, blur) = chain(&mut g, NodeKind::Checker(CheckerNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    rt.run_graph(&mut g).unwrap();
    let published = g.node(src).unwrap().output("output");
    let texels = rt.output_texture(&g, src).unwrap().texels().to_vec();

    // A precision change recreates the target before the step fails.
    g.update_settings(src, SettingsEdit::Precision(OutputPrecision::Half))
        .unwrap();
    g.update_kind(
        src,
        NodeKind::Checker(CheckerNode {
            cells: 0,
            ..CheckerNode::default()
        }),
    )
    .unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![src]);
    assert!(report.succeeded(blur));
    assert!(g.node(blur).unwrap().messages().is_empty());
    assert_eq!(g.node(src).unwrap().output("output"), published);
    assert_eq!(
        rt.output_texture(&g, src).unwrap().texels(),
        texels.as_slice()
    );
    assert_eq!(rt.resources().retired(src), 1);

    g.update_kind(src, NodeKind::Checker(CheckerNode::default()))
        .unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.succeeded(src));
    assert_ne!(g.node(src).unwrap().output("output"), published);
    assert!(rt.texture(published.unwrap()).is_none());
    assert_eq!(rt.resources().retired(src), 0);
    assert_eq!(rt.resources().arena().len(), 3);
}

#[test]
fn missing_programs_fail_the_node_until_restored() {
    let mut g = graph();
    let (_, blur) = chain(&mut g, NodeKind::Dot(DotNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    let program = rt.registry_mut().unregister(BLUR_PROGRAM).unwrap();

    let report = rt.run_graph(&mut g).unwrap();
    assert_eq!(report.failed, vec![blur]);
    let text = &g.node(blur).unwrap().messages().iter().next().unwrap().text;
    assert!(text.contains(BLUR_PROGRAM), "{text}");

    rt.registry_mut().register(program);
    assert!(rt.run_graph(&mut g).unwrap().succeeded(blur));
}

#[test]
fn unsupported_dimensions_are_skipped_with_one_warning() {
    let mut g = Graph::new(OutputShape {
        width: 4,
        height: 4,
        depth: 4,
        format: TextureFormat::Rgba8Unorm,
        dimension: crate::texture::format::TextureDimension::Cube,
    });
    let blur = g.add_node("blur", NodeKind::Blur(BlurNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();

    let first = rt.run_graph(&mut g).unwrap();
    let second = rt.run_graph(&mut g).unwrap();
    assert_eq!(first.skipped, vec![blur]);
    assert_eq!(first.warnings().count(), 1);
    assert_eq!(second.warnings().count(), 0);
    assert!(!rt.resources().has_targets(blur));

    g.update_settings(blur, SettingsEdit::Dimension(OutputDimension::Texture2D))
        .unwrap();
    let third = rt.run_graph(&mut g).unwrap();
    assert!(third.skipped.is_empty());
    assert!(g.node(blur).unwrap().messages().is_empty());
    assert!(
        third
            .events
            .contains(&GraphEvent::SettingsChanged { node: blur })
    );
}

#[test]
fn disabled_and_removed_nodes_release_their_textures() {
    let mut g = graph();
    let (src, blur) = chain(&mut g, NodeKind::Dot(DotNode::default()));
    let mut rt = GraphRuntime::new(&opts()).unwrap();
    rt.run_graph(&mut g).unwrap();
    assert!(rt.resources().has_targets(blur));

    g.set_enabled(blur, false).unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.events.contains(&GraphEvent::Released {
        node: blur,
        textures: 2,
    }));
    assert!(!rt.resources().has_targets(blur));
    assert!(!report.order.is_empty() && !report.processed.contains(&blur));

    g.remove_node(src).unwrap();
    let report = rt.run_graph(&mut g).unwrap();
    assert!(report.events.contains(&GraphEvent::Released {
        node: src,
        textures: 1,
    }));
    assert_eq!(rt.resources().arena().len(), 0);
}
