use super::*;
use crate::graph::settings::SizeMode;
use crate::nodes::DotNode;

const DOC: &str = r#"{
  "output": { "width": 64, "height": 64, "format": "rgba8_unorm", "dimension": "texture_2d" },
  "nodes": [
    { "id": "dot", "node": { "kind": "dot", "params": { "radius": 2.0 } } },
    { "id": "sdf", "node": { "kind": "distance", "params": { "distance": 25 } },
      "settings": [ { "field": "width_mode", "value": "fixed" }, { "field": "width", "value": 32 } ] },
    { "id": "out", "node": { "kind": "output", "params": {} }, "enabled": false }
  ],
  "edges": [
    { "from": "dot.output", "to": "sdf.input" },
    { "from": "sdf.output", "to": "out.input" }
  ]
}"#;

#[test]
fn parses_and_builds_a_document() {
    let def = GraphDef::from_json(DOC).unwrap();
    assert!(!def.realtime);
    assert_eq!(def.nodes.len(), 3);
    match &def.nodes[0].node {
        NodeKind::Dot(DotNode { radius, .. }) => assert_eq!(*radius, 2.0),
        other => panic!("unexpected kind {other:?}"),
    }

    let loaded = def.build().unwrap();
    let (dot, sdf, out) = (
        loaded.id("dot").unwrap(),
        loaded.id("sdf").unwrap(),
        loaded.id("out").unwrap(),
    );
    let g = &loaded.graph;
    assert_eq!(g.compute_order(), &[dot, sdf, out]);
    assert_eq!(g.edges().len(), 2);
    assert_eq!(g.node(sdf).unwrap().settings().width_mode, SizeMode::Fixed);
    assert_eq!(g.node(sdf).unwrap().settings().width, 32);
    assert!(!g.node(out).unwrap().enabled());
    assert!(loaded.id("missing").is_err());
}

#[test]
fn building_does_not_leak_edit_events() {
    let mut loaded = GraphDef::from_json(DOC).unwrap().build().unwrap();
    assert!(loaded.graph.drain_events().is_empty());
}

#[test]
fn validation_catches_document_errors() {
    let mut def = GraphDef::from_json(DOC).unwrap();
    def.nodes[1].id = "dot".to_string();
    assert!(matches!(def.validate(), Err(TexflowError::Validation(_))));

    let mut def = GraphDef::from_json(DOC).unwrap();
    def.edges[0].to = "ghost.input".to_string();
    assert!(def.validate().is_err());

    let mut def = GraphDef::from_json(DOC).unwrap();
    def.edges[0].to = "sdf".to_string();
    assert!(def.validate().is_err());

    let mut def = GraphDef::from_json(DOC).unwrap();
    def.output.width = 0;
    assert!(def.build().is_err());
}

#[test]
fn forbidden_settings_edits_fail_the_build() {
    let mut def = GraphDef::from_json(DOC).unwrap();
    def.nodes[1]
        .settings
        .push(SettingsEdit::Channels(crate::texture::format::OutputChannel::R));
    let err = def.build().unwrap_err();
    assert!(err.to_string().contains("sdf"), "{err}");
}

#[test]
fn bad_edges_fail_the_build() {
    let mut def = GraphDef::from_json(DOC).unwrap();
    def.edges.push(EdgeDef {
        from: "out.output".to_string(),
        to: "dot.nope".to_string(),
    });
    assert!(def.build().is_err());
}

#[test]
fn malformed_json_is_a_serde_error() {
    assert!(matches!(
        GraphDef::from_json("{ not json"),
        Err(TexflowError::Serde(_))
    ));
}

#[test]
fn documents_survive_a_json_round_trip() {
    let def = GraphDef::from_json(DOC).unwrap();
    let again = GraphDef::from_json(&def.to_json().unwrap()).unwrap();
    assert_eq!(def, again);
}
