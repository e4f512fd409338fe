//! c4izr - Standardize draw.io architecture diagrams into the C4 model
//!
//! Reads a draw.io diagram (or a graph JSON document extracted from an image),
//! decides which element is the main software system, classifies every other
//! element as a C4 role and rewrites geometry, styles and labels with the C4
//! conventions.
//!
//! # Quick Start
//!
//! ```rust
//! use c4izr::{standardize_xml, SelectionMode};
//!
//! let input = r#"<mxGraphModel><root>
//!   <mxCell id="0"/><mxCell id="1" parent="0"/>
//!   <mxCell id="web" value="Web App" vertex="1" parent="1">
//!     <mxGeometry x="100" y="100" width="300" height="200" as="geometry"/>
//!   </mxCell>
//!   <mxCell id="db" value="Orders DB" vertex="1" parent="1">
//!     <mxGeometry x="500" y="100" width="120" height="60" as="geometry"/>
//!   </mxCell>
//!   <mxCell id="e1" edge="1" parent="1" source="web" target="db">
//!     <mxGeometry relative="1" as="geometry"/>
//!   </mxCell>
//! </root></mxGraphModel>"#;
//!
//! let output = standardize_xml(input, SelectionMode::NonInteractive).unwrap();
//! assert!(output.contains("c4Role=\"main-system\""));
//! assert!(output.contains("c4Type=\"Relationship\""));
//! ```
//!
//! # Advanced Usage
//!
//! For more control, drive the stages yourself:
//!
//! ```rust
//! use c4izr::prelude::*;
//!
//! let json = r#"{"elements": [
//!     {"id": "shop", "label": "Shop", "size": {"width": 300, "height": 200}},
//!     {"id": "user", "type": "person", "label": "Customer"}
//!   ],
//!   "connections": [{"source": "user", "target": "shop", "label": "Buys from"}]}"#;
//!
//! let mut diagram = GraphJsonParser::new().parse(json).unwrap();
//! diagram.validate().unwrap();
//!
//! let classification = Classifier::new()
//!     .with_mode(SelectionMode::NonInteractive)
//!     .classify(&mut diagram, &mut FirstCandidate)
//!     .unwrap();
//! assert_eq!(classification.main_system, "shop");
//! assert_eq!(diagram.role_of("user"), Role::Person);
//!
//! Styler::new().apply(&mut diagram).unwrap();
//! RelationshipMapper::new().apply(&mut diagram).unwrap();
//! let xml = DrawioRenderer::new().render_document(&diagram).unwrap();
//! assert!(xml.contains("buys from"));
//! ```

pub mod c4;
pub mod core;
pub mod plugins;

pub use crate::core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::c4::{
        Classification, Classifier, FirstCandidate, MappingConfig, RelationshipMapper,
        SelectionProvider, Styler,
    };
    pub use crate::core::{
        Bounds, C4Error, Connection, Database, Detector, Diagram, Element, Parser, Renderer,
        Role, SelectionMode,
    };
    pub use crate::plugins::drawio::{DrawioDetector, DrawioParser, DrawioRenderer};
    pub use crate::plugins::graph_json::{GraphJsonDetector, GraphJsonParser};
    pub use crate::plugins::orchestrator::{ConvertOptions, Converter};
}

/// Standardize a draw.io document and return the C4 document
///
/// Ties for the main system are broken by document order, even in
/// interactive mode, since there is nobody to ask.
///
/// # Example
/// ```rust
/// use c4izr::{standardize_xml, C4Error, SelectionMode};
///
/// let err = standardize_xml("<mxGraphModel><root/></mxGraphModel>", SelectionMode::NonInteractive)
///     .unwrap_err();
/// assert!(matches!(err, C4Error::EmptyDiagram));
/// ```
pub fn standardize_xml(input: &str, mode: SelectionMode) -> Result<String> {
    use crate::c4::FirstCandidate;
    use crate::plugins::orchestrator::{ConvertOptions, Converter};

    let converter = Converter::new(ConvertOptions::new().with_mode(mode));
    let conversion = converter.convert_xml(input, &mut FirstCandidate)?;
    Ok(conversion.document)
}

/// Parse a draw.io document into an unclassified diagram
///
/// # Example
/// ```rust
/// use c4izr::parse_drawio;
/// use c4izr::prelude::Database;
///
/// let diagram = parse_drawio(r#"<mxGraphModel><root>
///   <mxCell id="0"/><mxCell id="1" parent="0"/>
///   <mxCell id="a" value="A" vertex="1" parent="1">
///     <mxGeometry width="80" height="40" as="geometry"/>
///   </mxCell>
/// </root></mxGraphModel>"#).unwrap();
/// assert_eq!(diagram.node_count(), 1);
/// ```
pub fn parse_drawio(input: &str) -> Result<Diagram> {
    use crate::plugins::drawio::DrawioParser;

    DrawioParser::new().parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<mxGraphModel><root>
      <mxCell id="0"/><mxCell id="1" parent="0"/>
      <mxCell id="a" value="Alpha" vertex="1" parent="1">
        <mxGeometry x="0" y="0" width="100" height="50" as="geometry"/>
      </mxCell>
      <mxCell id="b" value="Beta" vertex="1" parent="1">
        <mxGeometry x="200" y="0" width="100" height="50" as="geometry"/>
      </mxCell>
    </root></mxGraphModel>"#;

    #[test]
    fn test_standardize_xml_breaks_ties_by_document_order() {
        let output = standardize_xml(SAMPLE, SelectionMode::NonInteractive).unwrap();
        let diagram = parse_drawio(&output).unwrap();
        assert_eq!(diagram.main_system().map(|e| e.id.as_str()), None);
        assert_eq!(diagram.element("a").unwrap().hints.declared_role, Some(Role::MainSystem));
        assert_eq!(diagram.element("b").unwrap().hints.declared_role, Some(Role::ExternalSystem));
    }

    #[test]
    fn test_parse_drawio_rejects_garbage() {
        assert!(matches!(parse_drawio("not xml"), Err(C4Error::Parse { .. })));
    }
}
