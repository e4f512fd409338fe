//! C4 styling of classified elements
//!
//! [`Styler::apply`] rewrites geometry, style and C4 label fields of every
//! element from its role alone, so applying it twice changes nothing.
//! [`spread_layout`] is the separate, non-idempotent layout step.

use tracing::{debug, info, span, trace, Level};

use super::mapping::MappingConfig;
use super::palette::{element_style, ELEMENT_HEIGHT, ELEMENT_WIDTH};
use crate::core::text::split_name;
use crate::core::{C4Error, C4Fields, Diagram, Element, Point, Result, Role};

/// Applies the C4 look and label fields per role
#[derive(Debug, Clone, Default)]
pub struct Styler {
    mapping: MappingConfig,
}

impl Styler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, mapping: MappingConfig) -> Self {
        self.mapping = mapping;
        self
    }

    /// Style every element, main system first, then by role in document order
    pub fn apply(&self, diagram: &mut Diagram) -> Result<()> {
        let style_span = span!(
            Level::INFO,
            "apply_styles",
            element_count = diagram.elements().len()
        );
        let _enter = style_span.enter();

        let mut order: Vec<(u8, usize, String)> = diagram
            .elements()
            .iter()
            .enumerate()
            .map(|(position, e)| (e.role.rank(), position, e.id.clone()))
            .collect();
        order.sort();

        for (_, _, id) in order {
            if let Some(element) = diagram.element_mut(&id) {
                self.style_element(element)?;
            }
        }

        info!("Applied C4 styles");
        Ok(())
    }

    fn style_element(&self, element: &mut Element) -> Result<()> {
        if !element.role.is_classified() {
            return Err(C4Error::malformed(format!(
                "element '{}' has no role yet",
                element.id
            )));
        }
        let bounds = element.geometry.ok_or_else(|| {
            C4Error::malformed(format!("element '{}' has no geometry", element.id))
        })?;

        if bounds.width != ELEMENT_WIDTH || bounds.height != ELEMENT_HEIGHT {
            element.geometry = Some(bounds.resized_around_center(ELEMENT_WIDTH, ELEMENT_HEIGHT));
        }
        element.style = element_style(element.role);
        element.c4 = Some(self.fields(element));

        trace!(
            element_id = %element.id,
            role = %element.role,
            "Styled element"
        );
        Ok(())
    }

    fn fields(&self, element: &Element) -> C4Fields {
        let (first_line, rest) = split_name(&element.label);
        let name = if first_line.is_empty() {
            element.id.clone()
        } else {
            first_line
        };
        let description = element
            .c4
            .as_ref()
            .map(|c4| c4.description.clone())
            .filter(|d| !d.trim().is_empty())
            .or(rest)
            .unwrap_or_else(|| format!("Description of {}.", name.to_lowercase()));

        let overrides = self.mapping.resolve(&element.id, element.role);
        C4Fields {
            name: overrides.name.unwrap_or(name),
            c4_type: overrides
                .c4_type
                .unwrap_or_else(|| element.role.c4_type().to_string()),
            description: overrides.description.unwrap_or(description),
        }
    }
}

/// Scale each element's distance from the main system's center by `factor`
///
/// Element sizes are kept. A factor of 1 leaves the diagram untouched.
pub fn spread_layout(diagram: &mut Diagram, factor: f64) -> Result<()> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(C4Error::config_error(format!(
            "scaling factor must be a positive number, got {}",
            factor
        )));
    }
    if factor == 1.0 {
        return Ok(());
    }

    let anchor: Point = match diagram.main_system() {
        Some(main) => main.bounds().center(),
        None => {
            return Err(C4Error::malformed(
                "layout spread needs a classified main system",
            ))
        }
    };

    for element in diagram.elements_mut() {
        if element.role == Role::MainSystem {
            continue;
        }
        if let Some(bounds) = element.geometry {
            let center = bounds.center();
            let spread = Point::new(
                anchor.x + (center.x - anchor.x) * factor,
                anchor.y + (center.y - anchor.y) * factor,
            );
            element.geometry = Some(bounds.centered_at(spread));
        }
    }

    debug!(factor, anchor_x = anchor.x, anchor_y = anchor.y, "Spread layout");
    Ok(())
}
