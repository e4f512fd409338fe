//! Core renderer trait for diagram output

use super::{Diagram, Result};

/// Core trait for diagram renderers
///
/// # Example
/// ```
/// use c4izr::core::{Diagram, Renderer};
/// use c4izr::plugins::drawio::DrawioRenderer;
///
/// let renderer = DrawioRenderer::new();
/// let xml = renderer.render(&Diagram::new()).unwrap();
/// assert!(xml.starts_with("<mxGraphModel"));
/// ```
pub trait Renderer: Send + Sync {
    /// The output type of this renderer
    type Output;

    /// Render the diagram into the output format
    fn render(&self, diagram: &Diagram) -> Result<Self::Output>;

    /// Get the name of this renderer
    fn name(&self) -> &'static str;

    /// Get the supported output format
    fn format(&self) -> &'static str;
}
