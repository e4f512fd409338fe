//! End-to-end scenarios over the conversion pipeline

use c4izr::c4::FirstCandidate;
use c4izr::plugins::orchestrator::{ConvertOptions, Converter};
use c4izr::prelude::*;
use c4izr::Style;

const THREE_ELEMENTS: &str = r#"<mxfile host="app.diagrams.net">
  <diagram id="p1" name="Shop">
    <mxGraphModel dx="800" dy="600" grid="1">
      <root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <mxCell id="web" value="Web App" style="rounded=1;whiteSpace=wrap;html=1;" vertex="1" parent="1">
          <mxGeometry x="300" y="200" width="320" height="180" as="geometry"/>
        </mxCell>
        <mxCell id="user" value="User" style="shape=umlActor;verticalLabelPosition=bottom;html=1;" vertex="1" parent="1">
          <mxGeometry x="40" y="230" width="30" height="60" as="geometry"/>
        </mxCell>
        <mxCell id="db" value="Database" style="shape=cylinder3;whiteSpace=wrap;html=1;" vertex="1" parent="1">
          <mxGeometry x="800" y="240" width="60" height="80" as="geometry"/>
        </mxCell>
        <mxCell id="e1" style="endArrow=classic;html=1;" edge="1" parent="1" source="user" target="web">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
        <mxCell id="e2" style="endArrow=classic;html=1;" edge="1" parent="1" source="web" target="db">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
      </root>
    </mxGraphModel>
  </diagram>
</mxfile>"#;

fn non_interactive() -> Converter {
    Converter::new(ConvertOptions::new().with_mode(SelectionMode::NonInteractive))
}

#[test]
fn test_three_element_diagram() {
    let conversion = non_interactive()
        .convert_xml(THREE_ELEMENTS, &mut FirstCandidate)
        .unwrap();

    let diagram = &conversion.diagram;
    assert_eq!(conversion.classification.main_system, "web");
    assert_eq!(diagram.role_of("web"), Role::MainSystem);
    assert_eq!(diagram.role_of("user"), Role::Person);
    assert_eq!(diagram.role_of("db"), Role::Database);

    for element in diagram.elements() {
        let bounds = element.bounds();
        assert_eq!((bounds.width, bounds.height), (240.0, 120.0));
    }

    let labels: Vec<&str> = diagram.connections().iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["uses", "uses"]);

    let xml = &conversion.document;
    assert_eq!(xml.matches(r#"width="240" height="120""#).count(), 3);
    assert_eq!(xml.matches(r#"edge="1""#).count(), 2);
    assert_eq!(xml.matches(r#"c4Description="uses""#).count(), 2);
    assert!(xml.contains(r#"c4Name="Web App""#));
    assert!(xml.contains(r#"c4Type="Software System""#));
}

#[test]
fn test_three_element_output_reparses_to_same_document() {
    let conversion = non_interactive()
        .convert_xml(THREE_ELEMENTS, &mut FirstCandidate)
        .unwrap();

    let reparsed = DrawioParser::new().parse(&conversion.document).unwrap();
    assert_eq!(reparsed.name(), "Shop");
    let rendered = DrawioRenderer::new().render_document(&reparsed).unwrap();
    assert_eq!(rendered, conversion.document);
}

#[test]
fn test_person_target_gets_is_used_by() {
    let xml = THREE_ELEMENTS.replace(
        r#"source="user" target="web""#,
        r#"source="web" target="user""#,
    );
    let conversion = non_interactive().convert_xml(&xml, &mut FirstCandidate).unwrap();
    assert_eq!(conversion.diagram.connections()[0].label, "is used by");
}

#[test]
fn test_empty_diagram_is_rejected() {
    let result = non_interactive().convert_xml(
        r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/></root></mxGraphModel>"#,
        &mut FirstCandidate,
    );
    assert!(matches!(result, Err(C4Error::EmptyDiagram)));
}

#[test]
fn test_dangling_reference_fails_before_classification() {
    struct Untouchable;

    impl SelectionProvider for Untouchable {
        fn select(&mut self, _candidates: &[c4izr::c4::Candidate]) -> c4izr::Result<usize> {
            panic!("classification must not run on a malformed graph");
        }
    }

    // two equal boxes would need a selection if classification ran
    let xml = r#"<mxGraphModel><root>
      <mxCell id="0"/><mxCell id="1" parent="0"/>
      <mxCell id="a" value="A" vertex="1" parent="1"><mxGeometry width="100" height="100" as="geometry"/></mxCell>
      <mxCell id="b" value="B" vertex="1" parent="1"><mxGeometry x="200" width="100" height="100" as="geometry"/></mxCell>
      <mxCell id="e" edge="1" parent="1" source="a" target="ghost"><mxGeometry relative="1" as="geometry"/></mxCell>
    </root></mxGraphModel>"#;

    let result = Converter::default().convert_xml(xml, &mut Untouchable);
    assert!(matches!(result, Err(C4Error::MalformedGraph { .. })));
}

#[test]
fn test_graph_json_connection_id_shared_with_element() {
    let json = r#"{"elements": [
        {"id": 1, "label": "Shop", "size": {"width": 300, "height": 200}},
        {"id": 2, "type": "person", "label": "Buyer"}
      ],
      "connections": [{"id": "1", "source": 2, "target": 1, "label": "Orders from"}]}"#;

    let conversion = non_interactive()
        .convert_graph_json(json, &mut FirstCandidate)
        .unwrap();
    let connection = &conversion.diagram.connections()[0];
    assert_eq!(connection.id, "1_1");
    assert_eq!(conversion.document.matches(r#"id="1""#).count(), 1);

    let reparsed = DrawioParser::new().parse(&conversion.document).unwrap();
    assert_eq!(reparsed.edge_count(), 1);
    let rendered = DrawioRenderer::new().render_document(&reparsed).unwrap();
    assert_eq!(rendered, conversion.document);
}

#[test]
fn test_strict_selection_reports_candidates() {
    let xml = r#"<mxGraphModel><root>
      <mxCell id="0"/><mxCell id="1" parent="0"/>
      <mxCell id="a" value="A" vertex="1" parent="1"><mxGeometry width="100" height="100" as="geometry"/></mxCell>
      <mxCell id="b" value="B" vertex="1" parent="1"><mxGeometry x="200" width="100" height="100" as="geometry"/></mxCell>
    </root></mxGraphModel>"#;

    let converter = Converter::new(
        ConvertOptions::new()
            .with_mode(SelectionMode::NonInteractive)
            .with_strict(true),
    );
    match converter.convert_xml(xml, &mut FirstCandidate) {
        Err(C4Error::AmbiguousMainSystem { candidates }) => {
            assert_eq!(candidates, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected ambiguity, got {:?}", other.map(|c| c.document)),
    }
}

#[test]
fn test_main_system_hint_overrides_area() {
    let converter = Converter::new(
        ConvertOptions::new()
            .with_mode(SelectionMode::NonInteractive)
            .with_main_system("database"),
    );
    let conversion = converter.convert_xml(THREE_ELEMENTS, &mut FirstCandidate).unwrap();
    assert_eq!(conversion.classification.main_system, "db");
    assert_eq!(conversion.diagram.role_of("web"), Role::Container);
}

#[test]
fn test_mapping_config_overrides_fields() {
    let mapping = MappingConfig::from_json(
        r#"{"roles": {"person": {"type": "Customer"}},
            "elements": {"web": {"name": "Storefront", "description": "Sells things"}}}"#,
    )
    .unwrap();
    let converter = Converter::new(
        ConvertOptions::new()
            .with_mode(SelectionMode::NonInteractive)
            .with_mapping(mapping),
    );
    let conversion = converter.convert_xml(THREE_ELEMENTS, &mut FirstCandidate).unwrap();

    let xml = &conversion.document;
    assert!(xml.contains(r#"c4Type="Customer""#));
    assert!(xml.contains(r#"c4Name="Storefront""#));
    assert!(xml.contains(r#"c4Description="Sells things""#));
}

#[test]
fn test_compressed_output_round_trips() {
    let converter = Converter::new(
        ConvertOptions::new()
            .with_mode(SelectionMode::NonInteractive)
            .with_compression(true),
    );
    let conversion = converter.convert_xml(THREE_ELEMENTS, &mut FirstCandidate).unwrap();
    assert!(!conversion.document.contains("<mxGraphModel"));

    let reparsed = DrawioParser::new().parse(&conversion.document).unwrap();
    assert_eq!(reparsed.elements().len(), 3);
    assert_eq!(
        reparsed.element("web").unwrap().hints.declared_role,
        Some(Role::MainSystem)
    );
}

#[test]
fn test_styles_follow_roles() {
    let conversion = non_interactive()
        .convert_xml(THREE_ELEMENTS, &mut FirstCandidate)
        .unwrap();
    let style = |id: &str| Style::parse(&conversion.diagram.element(id).unwrap().style);

    assert_eq!(style("web").get("fillColor"), Some("#1061B0"));
    assert_eq!(style("db").shape(), Some("cylinder3"));
    assert_eq!(style("user").shape(), Some("mxgraph.c4.person2"));
}
