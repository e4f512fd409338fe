//! In-memory diagram model
//!
//! A [`Diagram`] holds the elements (boxes) and connections (arrows) of one
//! input file. Elements keep document order so that serialization produces
//! stable diffs; lookup by ID goes through an index.

use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use super::{
    Bounds, C4Error, C4Fields, Database, Point, RelationshipFields, Result, Role, VisualHints,
};

/// `mxGraphModel` attributes used when the source does not provide any
pub const DEFAULT_MODEL_ATTRIBUTES: [(&str, &str); 15] = [
    ("dx", "981"),
    ("dy", "650"),
    ("grid", "1"),
    ("gridSize", "10"),
    ("guides", "1"),
    ("tooltips", "1"),
    ("connect", "1"),
    ("arrows", "1"),
    ("fold", "1"),
    ("page", "1"),
    ("pageScale", "1"),
    ("pageWidth", "816"),
    ("pageHeight", "1056"),
    ("math", "0"),
    ("shadow", "0"),
];

/// Page name used when the source does not name its page
pub const DEFAULT_PAGE_NAME: &str = "Page-1";

/// One node of the diagram
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Unique within a diagram
    pub id: String,
    /// Plain-text display label, possibly multi-line
    pub label: String,
    /// Absolute bounds; `None` when the source had no usable geometry
    pub geometry: Option<Bounds>,
    /// draw.io style string
    pub style: String,
    pub role: Role,
    pub hints: VisualHints,
    /// C4 label fields, set by the style applier or read from the source
    pub c4: Option<C4Fields>,
    /// Extra attributes of a draw.io `object` wrapper, in source order
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_geometry(mut self, bounds: Bounds) -> Self {
        self.geometry = Some(bounds);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_hints(mut self, hints: VisualHints) -> Self {
        self.hints = hints;
        self
    }

    /// Bounds of the element, zero-sized when geometry is missing
    ///
    /// Validated diagrams always have geometry.
    pub fn bounds(&self) -> Bounds {
        self.geometry.unwrap_or_default()
    }

    pub fn area(&self) -> f64 {
        self.bounds().area()
    }
}

/// One directed edge of the diagram
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Connection {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Relationship description, empty when none was authored
    pub label: String,
    /// draw.io style string
    pub style: String,
    /// Waypoints of the edge route
    pub points: Vec<Point>,
    /// C4 relationship fields, set by the relationship mapper
    pub c4: Option<RelationshipFields>,
    /// Extra attributes of a draw.io `object` wrapper, in source order
    pub attributes: Vec<(String, String)>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Returns true if `id` is either endpoint
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// The whole graph for one file
#[derive(Debug, Clone)]
pub struct Diagram {
    name: String,
    model_attributes: Vec<(String, String)>,
    /// Elements in document order
    elements: Vec<Element>,
    /// Element ID to position in `elements`
    index: HashMap<String, usize>,
    /// Connections in document order
    connections: Vec<Connection>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Diagram {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.model_attributes == other.model_attributes
            && self.elements == other.elements
            && self.connections == other.connections
    }
}

impl Diagram {
    /// Create an empty diagram with default page settings
    pub fn new() -> Self {
        Self {
            name: DEFAULT_PAGE_NAME.to_string(),
            model_attributes: DEFAULT_MODEL_ATTRIBUTES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            elements: Vec::new(),
            index: HashMap::new(),
            connections: Vec::new(),
        }
    }

    /// Build a diagram from elements and connections in one go
    pub fn from_parts(
        elements: impl IntoIterator<Item = Element>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self> {
        let mut diagram = Self::new();
        diagram.load_elements(elements)?;
        diagram.load_connections(connections)?;
        Ok(diagram)
    }

    /// Append elements in order; fails on a duplicate ID
    pub fn load_elements(&mut self, elements: impl IntoIterator<Item = Element>) -> Result<()> {
        for element in elements {
            self.add_node(element)?;
        }
        debug!(element_count = self.elements.len(), "Loaded elements");
        Ok(())
    }

    /// Append connections in order
    ///
    /// Endpoints are not checked here; [`Diagram::validate`] does that.
    pub fn load_connections(
        &mut self,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<()> {
        for connection in connections {
            self.add_edge(connection)?;
        }
        debug!(connection_count = self.connections.len(), "Loaded connections");
        Ok(())
    }

    /// Check the structural invariants
    ///
    /// Fails with [`C4Error::MalformedGraph`] if an element lacks geometry, a
    /// connection references an element that is not in the diagram, or two
    /// cells share an ID (elements and connections are one namespace in
    /// draw.io).
    pub fn validate(&self) -> Result<()> {
        for element in &self.elements {
            match element.geometry {
                None => {
                    return Err(C4Error::malformed(format!(
                        "element '{}' has no geometry",
                        element.id
                    )))
                }
                Some(bounds) if !bounds.is_valid() => {
                    return Err(C4Error::malformed(format!(
                        "element '{}' has invalid geometry {:?}",
                        element.id, bounds
                    )))
                }
                Some(_) => {}
            }
        }

        let mut connection_ids = HashSet::new();
        for connection in &self.connections {
            if self.index.contains_key(connection.id.as_str()) {
                return Err(C4Error::malformed(format!(
                    "connection '{}' reuses the id of an element",
                    connection.id
                )));
            }
            if !connection_ids.insert(connection.id.as_str()) {
                return Err(C4Error::malformed(format!(
                    "duplicate connection id '{}'",
                    connection.id
                )));
            }
            for endpoint in [&connection.source, &connection.target] {
                if !self.index.contains_key(endpoint.as_str()) {
                    return Err(C4Error::malformed(format!(
                        "connection '{}' references missing element '{}'",
                        connection.id, endpoint
                    )));
                }
            }
        }

        trace!(
            element_count = self.elements.len(),
            connection_count = self.connections.len(),
            "Diagram validated"
        );
        Ok(())
    }

    /// Whether an element or a connection already uses `id`
    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id) || self.connections.iter().any(|c| c.id == id)
    }

    /// First of `base`, `base_1`, `base_2`, ... that no cell uses yet
    pub fn unused_id(&self, base: &str) -> String {
        if !self.contains_id(base) {
            return base.to_string();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.contains_id(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// `mxGraphModel` attributes in source order
    pub fn model_attributes(&self) -> &[(String, String)] {
        &self.model_attributes
    }

    pub fn set_model_attributes(&mut self, attributes: Vec<(String, String)>) {
        self.model_attributes = attributes;
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to elements; IDs must not be changed through it
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.iter_mut()
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.elements[i]),
            None => None,
        }
    }

    /// Position of an element in document order
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    /// Number of connection endpoints at an element (a self-loop counts twice)
    pub fn degree(&self, id: &str) -> usize {
        self.connections
            .iter()
            .map(|c| usize::from(c.source == id) + usize::from(c.target == id))
            .sum()
    }

    /// Elements directly connected to `id`, in document order, without duplicates
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut neighbors: Vec<&str> = self
            .connections
            .iter()
            .filter_map(|c| {
                if c.source == id {
                    Some(c.target.as_str())
                } else if c.target == id {
                    Some(c.source.as_str())
                } else {
                    None
                }
            })
            .filter(|other| *other != id)
            .collect();
        neighbors.sort_by_key(|n| self.position_of(n).unwrap_or(usize::MAX));
        neighbors.dedup();
        neighbors
    }

    /// Role of an element, `Unclassified` for unknown IDs
    pub fn role_of(&self, id: &str) -> Role {
        self.element(id).map(|e| e.role).unwrap_or_default()
    }

    /// The element classified as main system, if any
    pub fn main_system(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.role == Role::MainSystem)
    }
}

impl Database for Diagram {
    type Node = Element;
    type Edge = Connection;

    fn add_node(&mut self, node: Element) -> Result<()> {
        if self.index.contains_key(&node.id) {
            return Err(C4Error::malformed(format!(
                "duplicate element id '{}'",
                node.id
            )));
        }
        trace!(element_id = %node.id, label = %node.label, "Adding element");
        self.index.insert(node.id.clone(), self.elements.len());
        self.elements.push(node);
        Ok(())
    }

    fn add_edge(&mut self, edge: Connection) -> Result<()> {
        trace!(
            connection_id = %edge.id,
            source = %edge.source,
            target = %edge.target,
            "Adding connection"
        );
        self.connections.push(edge);
        Ok(())
    }

    fn get_node(&self, id: &str) -> Option<&Element> {
        self.element(id)
    }

    fn nodes(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    fn edges(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
        self.connections.clear();
    }

    fn node_count(&self) -> usize {
        self.elements.len()
    }

    fn edge_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(id: &str, label: &str) -> Element {
        Element::new(id, label).with_geometry(Bounds::new(0.0, 0.0, 120.0, 60.0))
    }

    #[test]
    fn test_lookup_and_order() {
        let diagram = Diagram::from_parts(
            vec![boxed("b", "B"), boxed("a", "A"), boxed("c", "C")],
            vec![],
        )
        .unwrap();

        let ids: Vec<&str> = diagram.nodes().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(diagram.get_node("a").unwrap().label, "A");
        assert!(diagram.get_node("zzz").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = Diagram::from_parts(vec![boxed("a", "A"), boxed("a", "B")], vec![]);
        assert!(matches!(result, Err(C4Error::MalformedGraph { .. })));
    }

    #[test]
    fn test_validate_dangling_connection() {
        let diagram = Diagram::from_parts(
            vec![boxed("a", "A")],
            vec![Connection::new("e1", "a", "ghost")],
        )
        .unwrap();
        let err = diagram.validate().unwrap_err();
        assert!(matches!(err, C4Error::MalformedGraph { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_shared_cell_ids() {
        let shared = Diagram::from_parts(
            vec![boxed("1", "A"), boxed("2", "B")],
            vec![Connection::new("1", "1", "2")],
        )
        .unwrap();
        let err = shared.validate().unwrap_err();
        assert!(matches!(err, C4Error::MalformedGraph { .. }));
        assert!(err.to_string().contains("reuses the id"));

        let twice = Diagram::from_parts(
            vec![boxed("a", "A"), boxed("b", "B")],
            vec![Connection::new("e", "a", "b"), Connection::new("e", "b", "a")],
        )
        .unwrap();
        assert!(twice.validate().unwrap_err().to_string().contains("duplicate connection"));
    }

    #[test]
    fn test_unused_id_skips_elements_and_connections() {
        let diagram = Diagram::from_parts(
            vec![boxed("1", "A"), boxed("1_1", "B")],
            vec![Connection::new("1_2", "1", "1_1")],
        )
        .unwrap();
        assert!(diagram.contains_id("1_2"));
        assert_eq!(diagram.unused_id("1"), "1_3");
        assert_eq!(diagram.unused_id("fresh"), "fresh");
    }

    #[test]
    fn test_validate_missing_geometry() {
        let diagram = Diagram::from_parts(vec![Element::new("a", "A")], vec![]).unwrap();
        assert!(matches!(
            diagram.validate(),
            Err(C4Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_self_loop_is_valid() {
        let diagram =
            Diagram::from_parts(vec![boxed("a", "A")], vec![Connection::new("e", "a", "a")])
                .unwrap();
        assert!(diagram.validate().is_ok());
        assert_eq!(diagram.degree("a"), 2);
        assert!(diagram.neighbors("a").is_empty());
    }

    #[test]
    fn test_neighbors_dedup_in_document_order() {
        let diagram = Diagram::from_parts(
            vec![boxed("a", "A"), boxed("b", "B"), boxed("c", "C")],
            vec![
                Connection::new("1", "c", "a"),
                Connection::new("2", "a", "b"),
                Connection::new("3", "a", "b"),
            ],
        )
        .unwrap();
        assert_eq!(diagram.neighbors("a"), vec!["b", "c"]);
        assert_eq!(diagram.degree("a"), 3);
    }

    #[test]
    fn test_clear() {
        let mut diagram = Diagram::from_parts(
            vec![boxed("a", "A"), boxed("b", "B")],
            vec![Connection::new("e", "a", "b")],
        )
        .unwrap();
        diagram.clear();
        assert_eq!(diagram.node_count(), 0);
        assert_eq!(diagram.edge_count(), 0);
        assert!(diagram.element("a").is_none());
    }
}
