//! C4 relationships
//!
//! Connections keep their direction and multiplicity; only their label, style
//! and relationship fields are rewritten.

use chumsky::prelude::*;
use tracing::{debug, info, span, trace, Level};

use super::palette::{relationship_style, DEFAULT_TECHNOLOGY};
use crate::core::text::collapse_whitespace;
use crate::core::{Diagram, RelationshipFields, Result, Role};

/// `text [technology]`, the technology in brackets at the very end
fn technology_suffix<'src>() -> impl Parser<'src, &'src str, (&'src str, &'src str)> {
    let technology = none_of("[]")
        .repeated()
        .at_least(1)
        .to_slice()
        .delimited_by(just('['), just(']'));
    let text = any()
        .and_is(technology.clone().then_ignore(end()).not())
        .repeated()
        .to_slice();
    text.then(technology).then_ignore(end())
}

fn is_acronym(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn lowercase_first(text: &str) -> String {
    let first_word = text.split_whitespace().next().unwrap_or("");
    if is_acronym(first_word) {
        return text.to_string();
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn trim_end_dots(text: &str) -> &str {
    text.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

/// Normalize an authored label into a verb phrase and an optional technology
///
/// `"Reads orders from. [JDBC]"` becomes `("reads orders from", Some("JDBC"))`.
pub fn normalize_label(label: &str) -> (String, Option<String>) {
    let flat = collapse_whitespace(label);
    let flat = trim_end_dots(&flat);

    let (text, technology) = match technology_suffix().parse(flat).into_result() {
        Ok((text, technology)) => (text, Some(technology.trim().to_string())),
        Err(_) => (flat, None),
    };
    let text = trim_end_dots(text.trim());

    (
        lowercase_first(text),
        technology.filter(|t| !t.is_empty()),
    )
}

/// Tidy a description that already sits in `c4Description`
///
/// Brackets stay part of the text; the technology has its own field.
pub fn normalize_description(description: &str) -> String {
    let flat = collapse_whitespace(description);
    lowercase_first(trim_end_dots(flat.trim()))
}

/// Label for a connection nobody labeled
pub fn default_label(source: Role, target: Role) -> &'static str {
    if target == Role::Person && source != Role::Person {
        "is used by"
    } else {
        "uses"
    }
}

/// Applies C4 relationship conventions to every connection
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipMapper;

impl RelationshipMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, diagram: &mut Diagram) -> Result<()> {
        let map_span = span!(
            Level::INFO,
            "map_relationships",
            connection_count = diagram.connections().len()
        );
        let _enter = map_span.enter();

        let endpoint_roles: Vec<(Role, Role)> = diagram
            .connections()
            .iter()
            .map(|c| (diagram.role_of(&c.source), diagram.role_of(&c.target)))
            .collect();

        let mut defaulted = 0usize;
        for (connection, (source, target)) in diagram.connections_mut().zip(endpoint_roles) {
            let (mut description, suffix) = match &connection.c4 {
                Some(c4) if !c4.description.trim().is_empty() => {
                    (normalize_description(&c4.description), None)
                }
                _ => normalize_label(&connection.label),
            };
            if description.is_empty() {
                description = default_label(source, target).to_string();
                defaulted += 1;
            }
            let technology = suffix
                .or_else(|| connection.c4.as_ref().and_then(|c4| c4.technology.clone()))
                .unwrap_or_else(|| DEFAULT_TECHNOLOGY.to_string());

            trace!(
                connection_id = %connection.id,
                description = %description,
                technology = %technology,
                "Mapped relationship"
            );
            connection.label = description.clone();
            connection.style = relationship_style().to_string();
            connection.c4 = Some(RelationshipFields {
                description,
                technology: Some(technology),
            });
        }

        debug!(defaulted, "Default relationship labels applied");
        info!("Mapped relationships");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds, Connection, Element};

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Reads   from"), ("reads from".to_string(), None));
        assert_eq!(
            normalize_label("Reads orders from. [JDBC]"),
            ("reads orders from".to_string(), Some("JDBC".to_string()))
        );
        assert_eq!(
            normalize_label("Sends events [Kafka, Avro]."),
            ("sends events".to_string(), Some("Kafka, Avro".to_string()))
        );
        assert_eq!(
            normalize_label("API calls via gateway"),
            ("API calls via gateway".to_string(), None)
        );
        assert_eq!(normalize_label("  "), (String::new(), None));
        assert_eq!(normalize_label("see [a] and [b]"), ("see [a] and".to_string(), Some("b".to_string())));
        assert_eq!(normalize_label("broken [tech"), ("broken [tech".to_string(), None));
    }

    #[test]
    fn test_default_labels_follow_direction() {
        assert_eq!(default_label(Role::MainSystem, Role::Person), "is used by");
        assert_eq!(default_label(Role::Person, Role::MainSystem), "uses");
        assert_eq!(default_label(Role::MainSystem, Role::ExternalSystem), "uses");
        assert_eq!(default_label(Role::Person, Role::Person), "uses");
    }

    fn element(id: &str, role: Role) -> Element {
        let mut e = Element::new(id, id).with_geometry(Bounds::new(0.0, 0.0, 10.0, 10.0));
        e.role = role;
        e
    }

    #[test]
    fn test_apply_keeps_duplicates_and_direction() {
        let mut diagram = Diagram::from_parts(
            vec![element("main", Role::MainSystem), element("u", Role::Person)],
            vec![
                Connection::new("1", "main", "u"),
                Connection::new("2", "main", "u"),
                Connection::new("3", "u", "main").with_label("Browses [HTTPS]"),
                Connection::new("4", "u", "u"),
            ],
        )
        .unwrap();
        RelationshipMapper::new().apply(&mut diagram).unwrap();

        let connections = diagram.connections();
        assert_eq!(connections.len(), 4);
        assert_eq!(connections[0].label, "is used by");
        assert_eq!(connections[1].label, "is used by");
        assert_eq!((connections[2].source.as_str(), connections[2].target.as_str()), ("u", "main"));
        let c4 = connections[2].c4.as_ref().unwrap();
        assert_eq!(c4.description, "browses");
        assert_eq!(c4.technology.as_deref(), Some("HTTPS"));
        assert_eq!(
            connections[0].c4.as_ref().unwrap().technology.as_deref(),
            Some(DEFAULT_TECHNOLOGY)
        );
        assert!(connections[3].is_self_loop());
        assert!(connections[0].style.contains("endArrow=blockThin"));
    }

    #[test]
    fn test_apply_twice_is_identity() {
        let mut diagram = Diagram::from_parts(
            vec![element("a", Role::MainSystem), element("b", Role::Database)],
            vec![Connection::new("1", "a", "b").with_label("Writes to. [SQL]")],
        )
        .unwrap();
        RelationshipMapper::new().apply(&mut diagram).unwrap();
        let once = diagram.clone();
        RelationshipMapper::new().apply(&mut diagram).unwrap();
        assert_eq!(once, diagram);
    }

    #[test]
    fn test_bracketed_description_survives_reruns() {
        let mut diagram = Diagram::from_parts(
            vec![element("a", Role::MainSystem), element("b", Role::ExternalSystem)],
            vec![
                Connection::new("1", "a", "b").with_label("Calls [v2] [HTTPS]"),
                Connection::new("2", "a", "b").with_label("see [a] and [b]."),
            ],
        )
        .unwrap();
        RelationshipMapper::new().apply(&mut diagram).unwrap();
        let once = diagram.clone();
        let first = once.connections()[0].c4.as_ref().unwrap();
        assert_eq!(first.description, "calls [v2]");
        assert_eq!(first.technology.as_deref(), Some("HTTPS"));

        for _ in 0..2 {
            RelationshipMapper::new().apply(&mut diagram).unwrap();
            assert_eq!(once, diagram);
        }
        let second = diagram.connections()[1].c4.as_ref().unwrap();
        assert_eq!(second.description, "see [a] and");
        assert_eq!(second.technology.as_deref(), Some("b"));
    }

    #[test]
    fn test_normalize_description_keeps_brackets() {
        assert_eq!(normalize_description("Calls  [v2]."), "calls [v2]");
        assert_eq!(normalize_description("API gateway"), "API gateway");
        assert_eq!(normalize_description("writes . ."), "writes");
    }
}
