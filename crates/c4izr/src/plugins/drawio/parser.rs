//! draw.io XML parser
//!
//! Reads `mxfile` / `mxGraphModel` documents into a [`Diagram`].
//!
//! Cell handling:
//! - vertices with a width and height become elements
//! - vertices that contain other vertices (groups, swimlanes) become clusters;
//!   their children get absolute coordinates and a cluster hint
//! - vertices attached to an edge are edge labels and fold into that edge
//! - `text` cells are decorative and skipped
//! - edges with both endpoints become connections

use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info, span, trace, warn, Level};

use super::codec::decode_diagram_data;
use crate::core::text::html_to_text;
use crate::core::{
    Bounds, C4Error, C4Fields, Connection, Database, Diagram, Element, Parser, Point,
    RelationshipFields, Result, Role, Style, VisualHints,
};

/// Attributes of `object` wrappers that map onto model fields
const MODELED_ATTRIBUTES: [&str; 8] = [
    "id",
    "label",
    "placeholders",
    "c4Name",
    "c4Type",
    "c4Description",
    "c4Technology",
    "c4Role",
];

/// One `mxCell`, with the attributes of its `object` wrapper if it had one
#[derive(Debug, Default)]
struct RawCell {
    id: String,
    value: String,
    style: String,
    parent: Option<String>,
    vertex: bool,
    edge: bool,
    source: Option<String>,
    target: Option<String>,
    geometry: Option<RawGeometry>,
    wrapper: Option<Vec<(String, String)>>,
}

#[derive(Debug, Default)]
struct RawGeometry {
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    relative: bool,
    points: Vec<Point>,
}

impl RawCell {
    fn wrapper_attr(&self, name: &str) -> Option<&str> {
        self.wrapper
            .as_ref()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Wrapper attributes that have no dedicated model field
    fn extra_attributes(&self) -> Vec<(String, String)> {
        self.wrapper
            .iter()
            .flatten()
            .filter(|(k, _)| !MODELED_ATTRIBUTES.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    fn bounds(&self) -> Option<Bounds> {
        let geometry = self.geometry.as_ref()?;
        if geometry.relative {
            return None;
        }
        Some(Bounds::new(
            geometry.x,
            geometry.y,
            geometry.width?,
            geometry.height?,
        ))
    }
}

/// draw.io XML parser
pub struct DrawioParser;

impl DrawioParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_model(&self, model: Node, page_name: Option<&str>) -> Result<Diagram> {
        let root = model
            .children()
            .find(|n| n.has_tag_name("root"))
            .ok_or_else(|| C4Error::parse_error("mxGraphModel has no <root> element"))?;

        let cells: Vec<RawCell> = root
            .children()
            .filter(|n| n.is_element())
            .filter_map(read_cell)
            .collect();
        debug!(cell_count = cells.len(), "Read graph cells");

        let mut diagram = CellGraph::new(&cells).into_diagram()?;

        if let Some(name) = page_name {
            diagram.set_name(name);
        }
        let attributes: Vec<(String, String)> = model
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
        if !attributes.is_empty() {
            diagram.set_model_attributes(attributes);
        }

        Ok(diagram)
    }
}

impl Default for DrawioParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for DrawioParser {
    fn parse(&self, input: &str) -> Result<Diagram> {
        let parse_span = span!(Level::INFO, "parse_drawio", input_len = input.len());
        let _enter = parse_span.enter();

        let document = Document::parse(input.trim_start_matches('\u{feff}'))?;
        let root = document.root_element();

        let diagram = match root.tag_name().name() {
            "mxGraphModel" => self.parse_model(root, None)?,
            "mxfile" => {
                let pages: Vec<Node> = root
                    .children()
                    .filter(|n| n.has_tag_name("diagram"))
                    .collect();
                let page = pages
                    .first()
                    .ok_or_else(|| C4Error::parse_error("mxfile contains no <diagram>"))?;
                if pages.len() > 1 {
                    info!(
                        page_count = pages.len(),
                        "Multiple diagrams found, converting only the first"
                    );
                }
                let page_name = page.attribute("name");

                match page.children().find(|n| n.has_tag_name("mxGraphModel")) {
                    Some(model) => self.parse_model(model, page_name)?,
                    None => {
                        let payload = page.text().unwrap_or("").trim();
                        if payload.is_empty() {
                            return Err(C4Error::parse_error("diagram page is empty"));
                        }
                        let xml = decode_diagram_data(payload)?;
                        let inner = Document::parse(&xml)?;
                        let model = inner.root_element();
                        if !model.has_tag_name("mxGraphModel") {
                            return Err(C4Error::parse_error(format!(
                                "compressed page holds <{}> instead of mxGraphModel",
                                model.tag_name().name()
                            )));
                        }
                        self.parse_model(model, page_name)?
                    }
                }
            }
            other => {
                return Err(C4Error::parse_error(format!(
                    "expected <mxfile> or <mxGraphModel> root, found <{}>",
                    other
                )))
            }
        };

        info!(
            element_count = diagram.node_count(),
            connection_count = diagram.edge_count(),
            "Parsed draw.io diagram"
        );
        Ok(diagram)
    }

    fn name(&self) -> &'static str {
        "drawio"
    }

    fn version(&self) -> &'static str {
        "0.3.0"
    }

    fn can_parse(&self, input: &str) -> bool {
        let input = input.trim_start();
        input.contains("<mxfile") || input.contains("<mxGraphModel")
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

fn read_geometry(node: Node) -> RawGeometry {
    let points = node
        .children()
        .filter(|n| n.has_tag_name("Array") && n.attribute("as") == Some("points"))
        .flat_map(|array| array.children().filter(|n| n.has_tag_name("mxPoint")))
        .map(|p| {
            Point::new(
                parse_number(p.attribute("x")).unwrap_or(0.0),
                parse_number(p.attribute("y")).unwrap_or(0.0),
            )
        })
        .collect();

    RawGeometry {
        x: parse_number(node.attribute("x")).unwrap_or(0.0),
        y: parse_number(node.attribute("y")).unwrap_or(0.0),
        width: parse_number(node.attribute("width")),
        height: parse_number(node.attribute("height")),
        relative: node.attribute("relative") == Some("1"),
        points,
    }
}

/// Read one child of `<root>`; `object`/`UserObject` wrappers are unwrapped
fn read_cell(node: Node) -> Option<RawCell> {
    let (cell, wrapper) = match node.tag_name().name() {
        "mxCell" => (node, None),
        "object" | "UserObject" => {
            let inner = node.children().find(|n| n.has_tag_name("mxCell"))?;
            let attributes = node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect::<Vec<_>>();
            (inner, Some(attributes))
        }
        other => {
            trace!(tag = other, "Skipping unsupported root child");
            return None;
        }
    };

    let id = match wrapper.as_ref() {
        Some(attrs) => attrs
            .iter()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.clone()),
        None => cell.attribute("id").map(str::to_string),
    };
    let Some(id) = id else {
        warn!("Skipping cell without id");
        return None;
    };

    let value = match wrapper.as_ref() {
        Some(attrs) => attrs
            .iter()
            .find(|(k, _)| k == "label")
            .map(|(_, v)| v.clone())
            .unwrap_or_default(),
        None => cell.attribute("value").unwrap_or("").to_string(),
    };

    Some(RawCell {
        id,
        value,
        style: cell.attribute("style").unwrap_or("").to_string(),
        parent: cell.attribute("parent").map(str::to_string),
        vertex: cell.attribute("vertex") == Some("1"),
        edge: cell.attribute("edge") == Some("1"),
        source: cell.attribute("source").map(str::to_string),
        target: cell.attribute("target").map(str::to_string),
        geometry: cell
            .children()
            .find(|n| n.has_tag_name("mxGeometry"))
            .map(read_geometry),
        wrapper,
    })
}

/// Structural view over the raw cells of one page
struct CellGraph<'a> {
    cells: &'a [RawCell],
    by_id: HashMap<&'a str, &'a RawCell>,
    /// Vertices that have vertex children
    clusters: HashSet<&'a str>,
    /// Text of edge-label vertices, keyed by edge id
    edge_labels: HashMap<&'a str, Vec<String>>,
}

impl<'a> CellGraph<'a> {
    fn new(cells: &'a [RawCell]) -> Self {
        let by_id: HashMap<&str, &RawCell> = cells.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut clusters = HashSet::new();
        let mut edge_labels: HashMap<&str, Vec<String>> = HashMap::new();
        for cell in cells.iter().filter(|c| c.vertex) {
            let Some(parent) = cell.parent.as_deref().and_then(|p| by_id.get(p)) else {
                continue;
            };
            if parent.edge {
                let text = html_to_text(&cell.value);
                if !text.is_empty() {
                    edge_labels.entry(parent.id.as_str()).or_default().push(text);
                }
            } else if parent.vertex {
                clusters.insert(parent.id.as_str());
            }
        }

        Self {
            cells,
            by_id,
            clusters,
            edge_labels,
        }
    }

    fn parent_vertex(&self, cell: &RawCell) -> Option<&'a RawCell> {
        cell.parent
            .as_deref()
            .and_then(|p| self.by_id.get(p))
            .copied()
            .filter(|p| p.vertex)
    }

    /// Offset of a cell's coordinate space, summed over its vertex ancestors
    fn offset(&self, cell: &RawCell) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut current = self.parent_vertex(cell);
        let mut depth = 0;
        while let Some(parent) = current {
            if let Some(geometry) = parent.geometry.as_ref().filter(|g| !g.relative) {
                dx += geometry.x;
                dy += geometry.y;
            }
            depth += 1;
            if depth > self.cells.len() {
                warn!(cell_id = %cell.id, "Cycle in parent chain");
                break;
            }
            current = self.parent_vertex(parent);
        }
        (dx, dy)
    }

    fn is_decorative(cell: &RawCell) -> bool {
        let style = Style::parse(&cell.style);
        style.has_token("text") || style.has_token("edgeLabel") || style.get("shape") == Some("text")
    }

    fn element(&self, cell: &RawCell) -> Option<Element> {
        if self.clusters.contains(cell.id.as_str()) {
            trace!(cell_id = %cell.id, "Vertex is a cluster");
            return None;
        }
        if cell
            .parent
            .as_deref()
            .and_then(|p| self.by_id.get(p))
            .is_some_and(|p| p.edge)
        {
            return None;
        }
        if Self::is_decorative(cell) {
            trace!(cell_id = %cell.id, "Skipping decorative text cell");
            return None;
        }
        let Some(bounds) = cell.bounds() else {
            debug!(cell_id = %cell.id, "Skipping vertex without geometry");
            return None;
        };

        let (dx, dy) = self.offset(cell);
        let style = Style::parse(&cell.style);
        let hints = VisualHints {
            shape: style.shape().map(str::to_string),
            icon: style
                .get("image")
                .or_else(|| style.get("resIcon"))
                .or_else(|| style.get("prIcon"))
                .map(str::to_string),
            fill_color: style.get("fillColor").map(str::to_string),
            declared_role: cell
                .wrapper_attr("c4Role")
                .and_then(|r| Role::from_str(r).ok()),
            cluster: self.parent_vertex(cell).map(|p| p.id.clone()),
            ..Default::default()
        };

        let c4_name = cell.wrapper_attr("c4Name");
        let c4_type = cell.wrapper_attr("c4Type");
        let c4_description = cell.wrapper_attr("c4Description");
        let label = match c4_name {
            Some(name) => name.to_string(),
            None => html_to_text(&cell.value),
        };
        let c4 = if c4_name.is_some() || c4_type.is_some() || c4_description.is_some() {
            Some(C4Fields {
                name: label.clone(),
                c4_type: c4_type.unwrap_or_default().to_string(),
                description: c4_description.unwrap_or_default().to_string(),
            })
        } else {
            None
        };

        Some(Element {
            id: cell.id.clone(),
            label,
            geometry: Some(bounds.translated(dx, dy)),
            style: cell.style.clone(),
            role: Role::Unclassified,
            hints,
            c4,
            attributes: cell.extra_attributes(),
        })
    }

    fn connection(&self, cell: &RawCell) -> Option<Connection> {
        let (Some(source), Some(target)) = (cell.source.as_ref(), cell.target.as_ref()) else {
            warn!(edge_id = %cell.id, "Floating edge (arrow) without both endpoints, skipped");
            return None;
        };

        for endpoint in [source, target] {
            if let Some(other) = self.by_id.get(endpoint.as_str()) {
                if !other.vertex || self.clusters.contains(endpoint.as_str()) {
                    warn!(
                        edge_id = %cell.id,
                        endpoint = %endpoint,
                        "Edge attached to a non-element cell, skipped"
                    );
                    return None;
                }
            }
        }

        let c4_description = cell.wrapper_attr("c4Description");
        let c4_technology = cell.wrapper_attr("c4Technology");
        let is_relationship = c4_description.is_some()
            || c4_technology.is_some()
            || cell.wrapper_attr("c4Type") == Some("Relationship");

        let label = match c4_description {
            Some(description) => description.to_string(),
            None => {
                let own = html_to_text(&cell.value);
                if own.is_empty() {
                    self.edge_labels
                        .get(cell.id.as_str())
                        .map(|parts| parts.join(" "))
                        .unwrap_or_default()
                } else {
                    own
                }
            }
        };
        let c4 = is_relationship.then(|| RelationshipFields {
            description: label.clone(),
            technology: c4_technology.map(str::to_string),
        });

        Some(Connection {
            id: cell.id.clone(),
            source: source.clone(),
            target: target.clone(),
            label,
            style: cell.style.clone(),
            points: cell
                .geometry
                .as_ref()
                .map(|g| g.points.clone())
                .unwrap_or_default(),
            c4,
            attributes: cell.extra_attributes(),
        })
    }

    fn into_diagram(self) -> Result<Diagram> {
        let mut diagram = Diagram::new();
        let mut skipped = 0usize;

        for cell in self.cells {
            if cell.vertex {
                match self.element(cell) {
                    Some(element) => diagram.add_node(element)?,
                    None => skipped += 1,
                }
            }
        }
        for cell in self.cells {
            if cell.edge {
                match self.connection(cell) {
                    Some(connection) => diagram.add_edge(connection)?,
                    None => skipped += 1,
                }
            }
        }

        debug!(
            skipped,
            cluster_count = self.clusters.len(),
            "Built diagram from cells"
        );
        Ok(diagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<mxGraphModel dx="1418" dy="948" grid="1">
  <root>
    <mxCell id="0" />
    <mxCell id="1" parent="0" />
    <mxCell id="3" style="edgeStyle=none;html=1;" parent="1" source="2" target="4" edge="1">
      <mxGeometry relative="1" as="geometry" />
    </mxCell>
    <mxCell id="2" value="System A" style="rounded=0;whiteSpace=wrap;html=1;" parent="1" vertex="1">
      <mxGeometry x="260" y="170" width="120" height="60" as="geometry" />
    </mxCell>
    <mxCell id="4" value="System C" style="shape=cylinder3;whiteSpace=wrap;html=1;" parent="1" vertex="1">
      <mxGeometry x="260" y="350" width="120" height="60" as="geometry" />
    </mxCell>
    <mxCell id="9" style="edgeStyle=none;html=1;" parent="1" source="2" edge="1">
      <mxGeometry relative="1" as="geometry" />
    </mxCell>
  </root>
</mxGraphModel>"#;

    #[test]
    fn test_parse_vertices_and_edges() {
        let diagram = DrawioParser::new().parse(SAMPLE).unwrap();
        assert_eq!(diagram.node_count(), 2);
        // floating edge 9 is skipped
        assert_eq!(diagram.edge_count(), 1);

        let ids: Vec<&str> = diagram.nodes().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4"]);

        let c = diagram.element("4").unwrap();
        assert_eq!(c.label, "System C");
        assert_eq!(c.hints.shape.as_deref(), Some("cylinder3"));
        assert_eq!(c.bounds(), Bounds::new(260.0, 350.0, 120.0, 60.0));
        assert_eq!(
            diagram.model_attributes()[0],
            ("dx".to_string(), "1418".to_string())
        );
    }

    #[test]
    fn test_groups_become_clusters_with_absolute_children() {
        let xml = r#"<mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <mxCell id="g" value="Partner Cloud" style="swimlane;" vertex="1" parent="1">
              <mxGeometry x="100" y="100" width="400" height="300" as="geometry"/>
            </mxCell>
            <mxCell id="p" value="Payments" style="rounded=1;" vertex="1" parent="g">
              <mxGeometry x="20" y="40" width="120" height="60" as="geometry"/>
            </mxCell>
        </root></mxGraphModel>"#;
        let diagram = DrawioParser::new().parse(xml).unwrap();
        assert_eq!(diagram.node_count(), 1);
        let p = diagram.element("p").unwrap();
        assert_eq!(p.bounds(), Bounds::new(120.0, 140.0, 120.0, 60.0));
        assert_eq!(p.hints.cluster.as_deref(), Some("g"));
    }

    #[test]
    fn test_edge_label_children_fold_into_edge() {
        let xml = r#"<mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <mxCell id="a" value="A" vertex="1" parent="1"><mxGeometry width="10" height="10" as="geometry"/></mxCell>
            <mxCell id="b" value="B" vertex="1" parent="1"><mxGeometry x="50" width="10" height="10" as="geometry"/></mxCell>
            <mxCell id="e" edge="1" parent="1" source="a" target="b"><mxGeometry relative="1" as="geometry"/></mxCell>
            <mxCell id="l" value="reads&lt;br&gt;from" style="edgeLabel;html=1;" vertex="1" connectable="0" parent="e">
              <mxGeometry x="-0.2" relative="1" as="geometry"><mxPoint as="offset"/></mxGeometry>
            </mxCell>
        </root></mxGraphModel>"#;
        let diagram = DrawioParser::new().parse(xml).unwrap();
        assert_eq!(diagram.node_count(), 2);
        assert_eq!(diagram.connections()[0].label, "reads\nfrom");
    }

    #[test]
    fn test_object_wrapper_fields() {
        let xml = r#"<mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <object id="s" placeholders="1" c4Name="Billing" c4Type="Software System" c4Description="Bills people" c4Role="main-system" tooltip="hi" label="%c4Name%">
              <mxCell style="rounded=1;" vertex="1" parent="1"><mxGeometry x="0" y="0" width="240" height="120" as="geometry"/></mxCell>
            </object>
        </root></mxGraphModel>"#;
        let diagram = DrawioParser::new().parse(xml).unwrap();
        let s = diagram.element("s").unwrap();
        assert_eq!(s.label, "Billing");
        assert_eq!(s.hints.declared_role, Some(Role::MainSystem));
        assert_eq!(s.role, Role::Unclassified);
        let c4 = s.c4.as_ref().unwrap();
        assert_eq!(c4.description, "Bills people");
        assert_eq!(s.attributes, vec![("tooltip".to_string(), "hi".to_string())]);
    }

    #[test]
    fn test_dangling_reference_is_kept_for_validation() {
        let xml = r#"<mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <mxCell id="a" value="A" vertex="1" parent="1"><mxGeometry width="10" height="10" as="geometry"/></mxCell>
            <mxCell id="e" edge="1" parent="1" source="a" target="nowhere"><mxGeometry relative="1" as="geometry"/></mxCell>
        </root></mxGraphModel>"#;
        let diagram = DrawioParser::new().parse(xml).unwrap();
        assert_eq!(diagram.edge_count(), 1);
        assert!(matches!(
            diagram.validate(),
            Err(C4Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        let parser = DrawioParser::new();
        assert!(matches!(
            parser.parse("<mxGraphModel><root>"),
            Err(C4Error::Parse { .. })
        ));
        assert!(matches!(
            parser.parse("<svg/>"),
            Err(C4Error::Parse { .. })
        ));
        assert!(matches!(
            parser.parse("<mxGraphModel/>"),
            Err(C4Error::Parse { .. })
        ));
        assert!(matches!(
            parser.parse("<mxfile></mxfile>"),
            Err(C4Error::Parse { .. })
        ));
    }

    #[test]
    fn test_compressed_page() {
        let model = r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="a" value="Alpha" vertex="1" parent="1"><mxGeometry width="10" height="10" as="geometry"/></mxCell></root></mxGraphModel>"#;
        let payload = super::super::codec::encode_diagram_data(model).unwrap();
        let file = format!(
            r#"<mxfile host="test"><diagram id="x" name="Overview">{}</diagram><diagram name="Other">ignored</diagram></mxfile>"#,
            payload
        );
        let diagram = DrawioParser::new().parse(&file).unwrap();
        assert_eq!(diagram.name(), "Overview");
        assert_eq!(diagram.element("a").unwrap().label, "Alpha");
    }
}
