//! draw.io XML serializer
//!
//! Output is deterministic: cells are written in document order (elements,
//! then connections), attributes in a fixed order and numbers with their
//! shortest round-trip representation.

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, span, trace, Level};

use super::codec::encode_diagram_data;
use crate::c4::palette::{element_label, relationship_label};
use crate::core::text::text_to_html;
use crate::core::{
    C4Error, Connection, Diagram, Element, Renderer, Result, Role, DEFAULT_MODEL_ATTRIBUTES,
};

const HOST: &str = "c4izr";
const VERSION: &str = env!("CARGO_PKG_VERSION");

type XmlWriter = Writer<Vec<u8>>;

fn xml_error<E: Display>(err: E) -> C4Error {
    C4Error::parse_error(format!("failed to write XML: {}", err))
}

/// Attribute with the value escaped for XML, line breaks included
fn attr<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    let escaped = escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    }
}

fn start<'a>(name: &'a str, attrs: &[(&'a str, &str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(name);
    for (key, value) in attrs {
        elem.push_attribute(attr(key, value));
    }
    elem
}

fn write_start(writer: &mut XmlWriter, elem: BytesStart) -> Result<()> {
    writer.write_event(Event::Start(elem)).map_err(xml_error)
}

fn write_empty(writer: &mut XmlWriter, elem: BytesStart) -> Result<()> {
    writer.write_event(Event::Empty(elem)).map_err(xml_error)
}

fn write_end(writer: &mut XmlWriter, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn into_string(writer: XmlWriter) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

/// First of `base`, `base_1`, `base_2`, ... that no cell uses
fn free_id(base: &str, taken: &HashSet<&str>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Stable page id derived from the page name (FNV-1a)
fn page_id(name: &str) -> String {
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    });
    format!("c4izr-{:016x}", hash)
}

/// The role recorded in `c4Role`: the classified role, else a declared one
fn recorded_role(element: &Element) -> Option<Role> {
    if element.role.is_classified() {
        Some(element.role)
    } else {
        element.hints.declared_role
    }
}

fn is_modeled(key: &str) -> bool {
    matches!(
        key,
        "id" | "label"
            | "placeholders"
            | "c4Name"
            | "c4Type"
            | "c4Description"
            | "c4Technology"
            | "c4Role"
    )
}

/// draw.io XML serializer
pub struct DrawioRenderer {
    compress: bool,
}

impl DrawioRenderer {
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// Write the page of an `mxfile` document compressed, as draw.io does by default
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Serialize a complete `mxfile` document holding one page
    pub fn render_document(&self, diagram: &Diagram) -> Result<String> {
        let render_span = span!(
            Level::INFO,
            "render_drawio_document",
            compressed = self.compress
        );
        let _enter = render_span.enter();

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let agent = format!("{}/{}", HOST, VERSION);
        write_start(
            &mut writer,
            start(
                "mxfile",
                &[
                    ("host", HOST),
                    ("agent", agent.as_str()),
                    ("version", VERSION),
                    ("type", "device"),
                ],
            ),
        )?;

        let id = page_id(diagram.name());
        write_start(
            &mut writer,
            start("diagram", &[("id", id.as_str()), ("name", diagram.name())]),
        )?;
        if self.compress {
            let mut model = Writer::new(Vec::new());
            write_model(&mut model, diagram)?;
            let payload = encode_diagram_data(&into_string(model)?)?;
            writer
                .write_event(Event::Text(BytesText::new(&payload)))
                .map_err(xml_error)?;
        } else {
            write_model(&mut writer, diagram)?;
        }
        write_end(&mut writer, "diagram")?;
        write_end(&mut writer, "mxfile")?;

        let output = into_string(writer)?;
        debug!(output_len = output.len(), "Rendered draw.io document");
        Ok(output)
    }
}

impl Default for DrawioRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for DrawioRenderer {
    type Output = String;

    /// Serialize the bare `mxGraphModel`
    fn render(&self, diagram: &Diagram) -> Result<String> {
        let render_span = span!(
            Level::INFO,
            "render_drawio",
            element_count = diagram.elements().len()
        );
        let _enter = render_span.enter();

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_model(&mut writer, diagram)?;
        let output = into_string(writer)?;
        debug!(output_len = output.len(), "Rendered graph model");
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "drawio"
    }

    fn format(&self) -> &'static str {
        "drawio-xml"
    }
}

fn write_model(writer: &mut XmlWriter, diagram: &Diagram) -> Result<()> {
    let model_attrs: Vec<(&str, &str)> = if diagram.model_attributes().is_empty() {
        DEFAULT_MODEL_ATTRIBUTES.to_vec()
    } else {
        diagram
            .model_attributes()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    };
    write_start(writer, start("mxGraphModel", &model_attrs))?;
    write_start(writer, BytesStart::new("root"))?;

    let taken: HashSet<&str> = diagram
        .elements()
        .iter()
        .map(|e| e.id.as_str())
        .chain(diagram.connections().iter().map(|c| c.id.as_str()))
        .collect();
    let root_id = free_id("0", &taken);
    let layer_id = free_id("1", &taken);
    write_empty(writer, start("mxCell", &[("id", root_id.as_str())]))?;
    write_empty(
        writer,
        start(
            "mxCell",
            &[("id", layer_id.as_str()), ("parent", root_id.as_str())],
        ),
    )?;

    for element in diagram.elements() {
        write_element(writer, element, &layer_id)?;
    }
    for connection in diagram.connections() {
        write_connection(writer, connection, &layer_id)?;
    }

    write_end(writer, "root")?;
    write_end(writer, "mxGraphModel")
}

fn write_element(writer: &mut XmlWriter, element: &Element, layer_id: &str) -> Result<()> {
    let role = recorded_role(element).map(|r| r.as_str());
    let wrapped = element.c4.is_some() || role.is_some() || !element.attributes.is_empty();
    trace!(element_id = %element.id, wrapped, "Writing element");

    let label;
    let html;
    if wrapped {
        let mut attrs: Vec<(&str, &str)> = vec![("id", element.id.as_str())];
        match &element.c4 {
            Some(c4) => {
                attrs.push(("placeholders", "1"));
                attrs.push(("c4Name", c4.name.as_str()));
                attrs.push(("c4Type", c4.c4_type.as_str()));
                attrs.push(("c4Description", c4.description.as_str()));
                label = element_label(&c4.name);
            }
            None => {
                label = text_to_html(&element.label);
            }
        }
        if let Some(role) = role {
            attrs.push(("c4Role", role));
        }
        attrs.extend(
            element
                .attributes
                .iter()
                .filter(|(k, _)| !is_modeled(k))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        attrs.push(("label", label.as_str()));
        write_start(writer, start("object", &attrs))?;
        write_start(
            writer,
            start(
                "mxCell",
                &[
                    ("style", element.style.as_str()),
                    ("vertex", "1"),
                    ("parent", layer_id),
                ],
            ),
        )?;
    } else {
        html = text_to_html(&element.label);
        write_start(
            writer,
            start(
                "mxCell",
                &[
                    ("id", element.id.as_str()),
                    ("value", html.as_str()),
                    ("style", element.style.as_str()),
                    ("vertex", "1"),
                    ("parent", layer_id),
                ],
            ),
        )?;
    }

    if let Some(bounds) = element.geometry {
        let (x, y) = (bounds.x.to_string(), bounds.y.to_string());
        let (width, height) = (bounds.width.to_string(), bounds.height.to_string());
        write_empty(
            writer,
            start(
                "mxGeometry",
                &[
                    ("x", x.as_str()),
                    ("y", y.as_str()),
                    ("width", width.as_str()),
                    ("height", height.as_str()),
                    ("as", "geometry"),
                ],
            ),
        )?;
    }

    write_end(writer, "mxCell")?;
    if wrapped {
        write_end(writer, "object")?;
    }
    Ok(())
}

fn write_connection(
    writer: &mut XmlWriter,
    connection: &Connection,
    layer_id: &str,
) -> Result<()> {
    let wrapped = connection.c4.is_some() || !connection.attributes.is_empty();
    trace!(connection_id = %connection.id, wrapped, "Writing connection");

    let cell_attrs = [
        ("style", connection.style.as_str()),
        ("edge", "1"),
        ("parent", layer_id),
        ("source", connection.source.as_str()),
        ("target", connection.target.as_str()),
    ];

    let label;
    if wrapped {
        let mut attrs: Vec<(&str, &str)> = vec![("id", connection.id.as_str())];
        match &connection.c4 {
            Some(c4) => {
                attrs.push(("placeholders", "1"));
                attrs.push(("c4Type", "Relationship"));
                attrs.push(("c4Description", c4.description.as_str()));
                if let Some(technology) = &c4.technology {
                    attrs.push(("c4Technology", technology.as_str()));
                }
                label = relationship_label().to_string();
            }
            None => label = text_to_html(&connection.label),
        }
        attrs.extend(
            connection
                .attributes
                .iter()
                .filter(|(k, _)| !is_modeled(k))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        attrs.push(("label", label.as_str()));
        write_start(writer, start("object", &attrs))?;
        write_start(writer, start("mxCell", &cell_attrs))?;
    } else {
        label = text_to_html(&connection.label);
        let mut attrs: Vec<(&str, &str)> =
            vec![("id", connection.id.as_str()), ("value", label.as_str())];
        attrs.extend(cell_attrs);
        write_start(writer, start("mxCell", &attrs))?;
    }

    let geometry = start("mxGeometry", &[("relative", "1"), ("as", "geometry")]);
    if connection.points.is_empty() {
        write_empty(writer, geometry)?;
    } else {
        write_start(writer, geometry)?;
        write_start(writer, start("Array", &[("as", "points")]))?;
        for point in &connection.points {
            let (x, y) = (point.x.to_string(), point.y.to_string());
            write_empty(
                writer,
                start("mxPoint", &[("x", x.as_str()), ("y", y.as_str())]),
            )?;
        }
        write_end(writer, "Array")?;
        write_end(writer, "mxGeometry")?;
    }

    write_end(writer, "mxCell")?;
    if wrapped {
        write_end(writer, "object")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds, C4Fields, Parser, Point, RelationshipFields};
    use crate::plugins::drawio::DrawioParser;

    fn sample() -> Diagram {
        let mut api = Element::new("api", "API\nServes <json> & more")
            .with_geometry(Bounds::new(10.0, 20.5, 240.0, 120.0))
            .with_style("rounded=1;");
        api.role = Role::MainSystem;
        api.c4 = Some(C4Fields {
            name: "API".to_string(),
            c4_type: "Software System".to_string(),
            description: "Serves <json>\n& more".to_string(),
        });
        let db = Element::new("db", "Orders DB")
            .with_geometry(Bounds::new(300.0, 20.0, 120.0, 60.0))
            .with_style("shape=cylinder3;");

        let mut uses = Connection::new("e1", "api", "db").with_label("reads");
        uses.points = vec![Point::new(150.0, 40.0)];
        uses.c4 = Some(RelationshipFields {
            description: "reads".to_string(),
            technology: Some("SQL".to_string()),
        });
        let plain = Connection::new("e2", "db", "api").with_label("notifies");

        Diagram::from_parts(vec![api, db], vec![uses, plain]).unwrap()
    }

    #[test]
    fn test_render_model_structure() {
        let xml = DrawioRenderer::new().render(&sample()).unwrap();
        assert!(xml.starts_with("<mxGraphModel dx=\"981\""));
        assert!(xml.contains("<mxCell id=\"0\"/>"));
        assert!(xml.contains("<mxCell id=\"1\" parent=\"0\"/>"));
        assert!(xml.contains("c4Role=\"main-system\""));
        assert!(xml.contains("c4Description=\"Serves &lt;json&gt;&#10;&amp; more\""));
        assert!(xml.contains("c4Technology=\"SQL\""));
        assert!(xml.contains("value=\"Orders DB\""));
        assert!(xml.contains("<mxPoint x=\"150\" y=\"40\"/>"));
        assert!(xml.contains("y=\"20.5\""));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = DrawioRenderer::new();
        let diagram = sample();
        assert_eq!(
            renderer.render(&diagram).unwrap(),
            renderer.render(&diagram).unwrap()
        );
    }

    #[test]
    fn test_serialize_parse_serialize_is_stable() {
        let renderer = DrawioRenderer::new();
        let first = renderer.render(&sample()).unwrap();
        let reparsed = DrawioParser::new().parse(&first).unwrap();
        assert_eq!(renderer.render(&reparsed).unwrap(), first);

        let document = renderer.render_document(&sample()).unwrap();
        let reparsed = DrawioParser::new().parse(&document).unwrap();
        assert_eq!(renderer.render_document(&reparsed).unwrap(), document);
    }

    #[test]
    fn test_base_ids_avoid_collisions() {
        let diagram = Diagram::from_parts(
            vec![Element::new("0", "Zero").with_geometry(Bounds::new(0.0, 0.0, 10.0, 10.0))],
            vec![],
        )
        .unwrap();
        let xml = DrawioRenderer::new().render(&diagram).unwrap();
        assert!(xml.contains("<mxCell id=\"0_1\"/>"));
        assert!(xml.contains("<mxCell id=\"1\" parent=\"0_1\"/>"));

        let reparsed = DrawioParser::new().parse(&xml).unwrap();
        assert_eq!(reparsed.elements().len(), 1);
        assert_eq!(reparsed.elements()[0].label, "Zero");
    }

    #[test]
    fn test_compressed_document_reparses() {
        let renderer = DrawioRenderer::new().with_compression(true);
        let document = renderer.render_document(&sample()).unwrap();
        assert!(document.starts_with("<mxfile host=\"c4izr\""));
        assert!(!document.contains("<mxGraphModel"));

        let reparsed = DrawioParser::new().parse(&document).unwrap();
        assert_eq!(reparsed.elements().len(), 2);
        assert_eq!(reparsed.connections().len(), 2);
        assert_eq!(renderer.render_document(&reparsed).unwrap(), document);
    }
}
