//! Generic (pre-C4) draw.io rendering of a vision graph
//!
//! The intermediate document shows what the vision stage saw, with plain
//! shapes per element type, before any C4 standardization.

use tracing::{debug, span, Level};

use crate::core::{Diagram, Renderer, Result, Role};
use crate::plugins::drawio::DrawioRenderer;

const BOX_STYLE: &str = "rounded=0;whiteSpace=wrap;html=1;";
const PERSON_STYLE: &str =
    "shape=umlActor;verticalLabelPosition=bottom;verticalAlign=top;html=1;outlineConnect=0;";
const CYLINDER_STYLE: &str =
    "shape=cylinder3;whiteSpace=wrap;html=1;boundedLbl=1;backgroundOutline=1;size=15;";
const CLOUD_STYLE: &str = "ellipse;shape=cloud;whiteSpace=wrap;html=1;";
const OTHER_STYLE: &str = "rounded=1;whiteSpace=wrap;html=1;";

/// Shape style for a vision element type, with the color named in its hints
pub fn element_style(kind: &str, style_hints: &str) -> String {
    let base = match kind.trim().to_lowercase().as_str() {
        "person" => PERSON_STYLE,
        "database" | "cylinder" => CYLINDER_STYLE,
        "cloud" => CLOUD_STYLE,
        "other" => OTHER_STYLE,
        _ => BOX_STYLE,
    };

    let hints = style_hints.to_lowercase();
    let colors = if hints.contains("blue") {
        "fillColor=#dae8fc;strokeColor=#6c8ebf;"
    } else if hints.contains("green") {
        "fillColor=#d5e8d4;strokeColor=#82b366;"
    } else if hints.contains("red") {
        "fillColor=#f8cecc;strokeColor=#b85450;"
    } else if hints.contains("gray") || hints.contains("grey") {
        "fillColor=#f5f5f5;strokeColor=#666666;"
    } else {
        ""
    };

    format!("{}{}", base, colors)
}

/// Edge style for a vision connection type
pub fn connection_style(kind: &str) -> &'static str {
    match kind.trim().to_lowercase().as_str() {
        "bidirectional" => "endArrow=classic;startArrow=classic;html=1;rounded=0;",
        "dashed" => "endArrow=classic;html=1;rounded=0;dashed=1;",
        _ => "endArrow=classic;html=1;rounded=0;",
    }
}

/// Renders a diagram as a plain draw.io document without C4 metadata
pub struct IntermediateRenderer {
    inner: DrawioRenderer,
}

impl IntermediateRenderer {
    pub fn new() -> Self {
        Self {
            inner: DrawioRenderer::new(),
        }
    }
}

impl Default for IntermediateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for IntermediateRenderer {
    type Output = String;

    fn render(&self, diagram: &Diagram) -> Result<String> {
        let render_span = span!(Level::INFO, "render_intermediate");
        let _enter = render_span.enter();

        let mut generic = diagram.clone();
        for element in generic.elements_mut() {
            element.role = Role::Unclassified;
            element.c4 = None;
        }
        for connection in generic.connections_mut() {
            connection.c4 = None;
        }

        let output = self.inner.render_document(&generic)?;
        debug!(output_len = output.len(), "Rendered intermediate document");
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "intermediate"
    }

    fn format(&self) -> &'static str {
        "drawio-xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Parser, Style};
    use crate::plugins::graph_json::GraphJsonParser;

    #[test]
    fn test_element_styles_by_type() {
        assert_eq!(element_style("box", ""), BOX_STYLE);
        assert_eq!(element_style("Cylinder", ""), CYLINDER_STYLE);
        assert_eq!(element_style("spaceship", ""), BOX_STYLE);
        let cloud = Style::parse(&element_style("cloud", "Grey dashed outline"));
        assert_eq!(cloud.shape(), Some("cloud"));
        assert_eq!(cloud.get("fillColor"), Some("#f5f5f5"));
    }

    #[test]
    fn test_connection_styles_by_type() {
        assert!(connection_style("bidirectional").contains("startArrow=classic"));
        assert!(connection_style("dashed").contains("dashed=1"));
        assert_eq!(connection_style("other"), connection_style("arrow"));
    }

    #[test]
    fn test_intermediate_document_drops_c4_state() {
        let mut diagram = GraphJsonParser::new()
            .parse(r#"{"elements": [{"id": "a", "type": "person", "label": "User"}]}"#)
            .unwrap();
        if let Some(a) = diagram.element_mut("a") {
            a.role = Role::Person;
        }

        let output = IntermediateRenderer::new().render(&diagram).unwrap();
        assert!(output.starts_with("<mxfile"));
        assert!(output.contains("shape=umlActor"));
        assert!(!output.contains("c4Role"));
        assert!(output.contains("pageWidth=\"1600\""));
    }
}
