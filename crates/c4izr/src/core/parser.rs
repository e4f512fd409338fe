//! Core parser trait for diagram sources
//!
//! A parser turns one source document (draw.io XML, vision graph JSON) into
//! a [`Diagram`](super::Diagram).

use super::{Diagram, Result};

/// Core trait for diagram source parsers
///
/// # Example
/// ```
/// use c4izr::core::Parser;
/// use c4izr::plugins::drawio::DrawioParser;
///
/// let parser = DrawioParser::new();
/// let diagram = parser
///     .parse(r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/></root></mxGraphModel>"#)
///     .unwrap();
/// assert!(diagram.is_empty());
/// ```
pub trait Parser: Send + Sync {
    /// Parse the source document into a fresh diagram
    fn parse(&self, input: &str) -> Result<Diagram>;

    /// Get the name of this parser
    fn name(&self) -> &'static str;

    /// Get the version of this parser
    fn version(&self) -> &'static str;

    /// Check if the input looks like something this parser understands
    fn can_parse(&self, input: &str) -> bool;
}
