//! Graph JSON parser
//!
//! Reads the element/connection graph produced by the vision stage:
//!
//! ```json
//! {
//!   "elements": [{"id": "elem_1", "type": "box", "label": "Web App",
//!                 "position": {"x": 0.2, "y": 0.1}, "size": {"width": 160, "height": 80}}],
//!   "connections": [{"source": "elem_1", "target": "elem_2", "label": "uses"}]
//! }
//! ```
//!
//! Fields the engine has no use for (`metadata`, `direction`, ...) are ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, span, trace, Level};

use super::intermediate::{connection_style, element_style};
use crate::core::text::html_to_text;
use crate::core::{
    Bounds, C4Error, Connection, Database, Diagram, Element, Parser, Result, Style, VisualHints,
};

pub const DEFAULT_CANVAS_WIDTH: f64 = 1600.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 1200.0;

const DEFAULT_POSITION: f64 = 100.0;
const DEFAULT_WIDTH: f64 = 120.0;
const DEFAULT_HEIGHT: f64 = 60.0;

/// Top-level graph document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub elements: Vec<GraphElement>,
    #[serde(default)]
    pub connections: Vec<GraphConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphElement {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: Option<GraphPosition>,
    #[serde(default)]
    pub size: Option<GraphSize>,
    #[serde(default)]
    pub style_hints: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GraphPosition {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GraphSize {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConnection {
    #[serde(default, deserialize_with = "optional_id_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "id_string")]
    pub source: String,
    #[serde(deserialize_with = "id_string")]
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Vision output uses strings for ids, but numbers show up too
fn value_to_id(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected string or number id, found {}", other)),
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    value_to_id(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

fn optional_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value_to_id(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Strip the markdown code fence a model may wrap its JSON answer in
pub fn extract_json(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parser for vision graph JSON
pub struct GraphJsonParser {
    canvas_width: f64,
    canvas_height: f64,
}

impl GraphJsonParser {
    pub fn new() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
        }
    }

    /// Canvas that relative (`0..=1`) coordinates are scaled to
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Build a diagram from an already deserialized document
    pub fn load(&self, document: GraphDocument) -> Result<Diagram> {
        let mut diagram = Diagram::new();
        diagram.set_model_attributes(self.model_attributes());

        for element in document.elements {
            diagram.add_node(self.element(element))?;
        }
        for (index, connection) in document.connections.into_iter().enumerate() {
            let mut connection = Self::connection(index, connection);
            if diagram.contains_id(&connection.id) {
                let id = diagram.unused_id(&connection.id);
                debug!(from = %connection.id, to = %id, "Renamed connection with a taken id");
                connection.id = id;
            }
            diagram.add_edge(connection)?;
        }

        info!(
            element_count = diagram.node_count(),
            connection_count = diagram.edge_count(),
            "Loaded graph JSON"
        );
        Ok(diagram)
    }

    fn model_attributes(&self) -> Vec<(String, String)> {
        let mut attributes: Vec<(String, String)> = Diagram::new().model_attributes().to_vec();
        for (key, value) in attributes.iter_mut() {
            match key.as_str() {
                "dx" => *value = "1418".to_string(),
                "dy" => *value = "948".to_string(),
                "pageWidth" => *value = self.canvas_width.to_string(),
                "pageHeight" => *value = self.canvas_height.to_string(),
                _ => {}
            }
        }
        attributes
    }

    /// Coordinates within `0..=1` are fractions of the canvas
    fn scale(value: f64, extent: f64) -> f64 {
        if (0.0..=1.0).contains(&value) {
            value * extent
        } else {
            value
        }
    }

    fn element(&self, element: GraphElement) -> Element {
        let position = element.position.unwrap_or_default();
        let size = element.size.unwrap_or_default();
        let bounds = Bounds::new(
            Self::scale(position.x.unwrap_or(DEFAULT_POSITION), self.canvas_width),
            Self::scale(position.y.unwrap_or(DEFAULT_POSITION), self.canvas_height),
            size.width.unwrap_or(DEFAULT_WIDTH),
            size.height.unwrap_or(DEFAULT_HEIGHT),
        );

        let label = html_to_text(&element.label);
        let label = match element.description.as_deref().map(html_to_text) {
            Some(description) if !description.is_empty() && description != label => {
                format!("{}\n{}", label, description)
            }
            _ => label,
        };

        let kind = element.kind.as_deref().unwrap_or("box");
        let style = element_style(kind, element.style_hints.as_deref().unwrap_or(""));
        let parsed = Style::parse(&style);
        let hints = VisualHints {
            shape: parsed.shape().map(str::to_string),
            fill_color: parsed.get("fillColor").map(str::to_string),
            kind: element.kind.clone(),
            notes: element.style_hints.clone(),
            ..Default::default()
        };

        trace!(element_id = %element.id, kind, "Loaded graph element");
        Element::new(element.id, label)
            .with_geometry(bounds)
            .with_style(style)
            .with_hints(hints)
    }

    fn connection(index: usize, connection: GraphConnection) -> Connection {
        let id = connection
            .id
            .unwrap_or_else(|| format!("edge-{}", index + 1));
        let label = connection
            .label
            .as_deref()
            .map(html_to_text)
            .unwrap_or_default();
        Connection::new(id, connection.source, connection.target)
            .with_label(label)
            .with_style(connection_style(connection.kind.as_deref().unwrap_or("arrow")))
    }
}

impl Default for GraphJsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for GraphJsonParser {
    fn parse(&self, input: &str) -> Result<Diagram> {
        let parse_span = span!(Level::INFO, "parse_graph_json", input_len = input.len());
        let _enter = parse_span.enter();

        let json = extract_json(input);
        let document: GraphDocument = serde_json::from_str(json).map_err(|e| {
            C4Error::parse_error(format!("invalid graph JSON: {}", e))
        })?;
        debug!(
            elements = document.elements.len(),
            connections = document.connections.len(),
            "Deserialized graph JSON"
        );
        self.load(document)
    }

    fn name(&self) -> &'static str {
        "graph-json"
    }

    fn version(&self) -> &'static str {
        "0.3.0"
    }

    fn can_parse(&self, input: &str) -> bool {
        extract_json(input).starts_with('{')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISION: &str = r#"```json
{
  "elements": [
    {"id": "elem_1", "type": "box", "label": "Web App", "description": "Serves the UI",
     "position": {"x": 0.25, "y": 0.5}, "size": {"width": 200, "height": 100},
     "style_hints": "blue rectangle"},
    {"id": "elem_2", "type": "person", "label": "User"},
    {"id": 3, "type": "database", "label": "Orders", "description": "Orders",
     "position": {"x": 640, "y": 300}}
  ],
  "connections": [
    {"source": "elem_2", "target": "elem_1", "label": "Visits", "type": "arrow", "direction": "left-to-right"},
    {"id": "c2", "source": "elem_1", "target": 3, "type": "dashed"}
  ],
  "metadata": {"diagram_type": "C4"}
}
```"#;

    #[test]
    fn test_extract_json_strips_fences() {
        assert_eq!(extract_json("```json\n{}\n```"), "{}");
        assert_eq!(extract_json("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(extract_json("  {} "), "{}");
    }

    #[test]
    fn test_parse_vision_output() {
        let diagram = GraphJsonParser::new().parse(VISION).unwrap();
        assert_eq!(diagram.node_count(), 3);
        assert_eq!(diagram.edge_count(), 2);

        let web = diagram.element("elem_1").unwrap();
        assert_eq!(web.label, "Web App\nServes the UI");
        assert_eq!(web.bounds(), Bounds::new(400.0, 600.0, 200.0, 100.0));
        assert_eq!(web.hints.fill_color.as_deref(), Some("#dae8fc"));
        assert_eq!(web.hints.kind.as_deref(), Some("box"));

        let user = diagram.element("elem_2").unwrap();
        assert_eq!(user.bounds(), Bounds::new(100.0, 100.0, 120.0, 60.0));
        assert_eq!(user.hints.shape.as_deref(), Some("umlActor"));

        // identical description is not repeated; numeric ids become strings
        let orders = diagram.element("3").unwrap();
        assert_eq!(orders.label, "Orders");
        assert_eq!(orders.hints.shape.as_deref(), Some("cylinder3"));

        let first = &diagram.connections()[0];
        assert_eq!(first.id, "edge-1");
        assert_eq!(first.label, "Visits");
        assert!(diagram.connections()[1].style.contains("dashed=1"));
        assert_eq!(diagram.connections()[1].target, "3");
    }

    #[test]
    fn test_canvas_size_is_page_size() {
        let diagram = GraphJsonParser::new()
            .with_canvas(800.0, 600.0)
            .parse(r#"{"elements": [{"id": "a", "label": "A", "position": {"x": 1, "y": 0}}]}"#)
            .unwrap();
        let a = diagram.element("a").unwrap();
        assert_eq!(a.bounds().x, 800.0);
        assert!(diagram
            .model_attributes()
            .contains(&("pageWidth".to_string(), "800".to_string())));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = GraphJsonParser::new().parse("{\"elements\": [");
        assert!(matches!(result, Err(C4Error::Parse { .. })));
        let result = GraphJsonParser::new().parse(r#"{"elements": [{"label": "no id"}]}"#);
        assert!(matches!(result, Err(C4Error::Parse { .. })));
    }

    #[test]
    fn test_connection_ids_never_reuse_cell_ids() {
        let diagram = GraphJsonParser::new()
            .parse(
                r#"{"elements": [{"id": 1, "label": "A"}, {"id": "edge-2", "label": "B"}],
                    "connections": [
                      {"id": 1, "source": 1, "target": "edge-2"},
                      {"source": "edge-2", "target": 1},
                      {"id": "x", "source": 1, "target": "edge-2"},
                      {"id": "x", "source": "edge-2", "target": 1}
                    ]}"#,
            )
            .unwrap();
        let ids: Vec<&str> = diagram.connections().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1_1", "edge-2_1", "x", "x_1"]);
        assert!(diagram.validate().is_ok());
    }

    #[test]
    fn test_duplicate_element_ids_are_malformed() {
        let result = GraphJsonParser::new().parse(
            r#"{"elements": [{"id": "a", "label": "A"}, {"id": "a", "label": "B"}]}"#,
        );
        assert!(matches!(result, Err(C4Error::MalformedGraph { .. })));
    }
}
