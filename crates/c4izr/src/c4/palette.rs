//! C4 visual conventions: colors, shapes and label templates per role

use crate::core::text::fit_font_size;
use crate::core::Role;

/// Canonical box size of every standardized element
pub const ELEMENT_WIDTH: f64 = 240.0;
pub const ELEMENT_HEIGHT: f64 = 120.0;

/// Font size of the element name before shrinking
pub const NAME_FONT_SIZE: u32 = 16;
/// Horizontal room for the name inside the box
pub const NAME_TARGET_WIDTH: f64 = 220.0;

/// Default technology shown for relationships that do not name one
pub const DEFAULT_TECHNOLOGY: &str = "e.g. JSON/HTTP";

/// Connection points on the border of a standardized box
const BOX_POINTS: &str = "[[0.25,0,0],[0.5,0,0],[0.75,0,0],[1,0.25,0],[1,0.5,0],[1,0.75,0],[0.75,1,0],[0.5,1,0],[0.25,1,0],[0,0.75,0],[0,0.5,0],[0,0.25,0]]";

const PERSON_POINTS: &str =
    "[[0.5,0,0],[1,0.5,0],[1,0.75,0],[0.75,1,0],[0.5,1,0],[0.25,1,0],[0,0.75,0],[0,0.5,0]]";

const RELATIONSHIP_STYLE: &str = "endArrow=blockThin;html=1;fontSize=10;fontColor=#404040;strokeWidth=1;endFill=1;strokeColor=#828282;elbow=vertical;metaEdit=1;endSize=14;startSize=14;jumpStyle=arc;jumpSize=16;rounded=0;edgeStyle=orthogonalEdgeStyle;";

const RELATIONSHIP_LABEL: &str = r#"<div style="text-align: left"><div style="text-align: center"><b>%c4Description%</b></div><div style="text-align: center">[%c4Technology%]</div></div>"#;

/// Fill and stroke color of a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub fill: &'static str,
    pub stroke: &'static str,
}

pub fn swatch(role: Role) -> Swatch {
    match role {
        Role::MainSystem => Swatch {
            fill: "#1061B0",
            stroke: "#0D5091",
        },
        Role::ExternalSystem | Role::Person | Role::Unclassified => Swatch {
            fill: "#8C8496",
            stroke: "#736782",
        },
        Role::Container | Role::Database => Swatch {
            fill: "#23A2D9",
            stroke: "#0E7DAD",
        },
        Role::Component => Swatch {
            fill: "#63BEF2",
            stroke: "#2086C9",
        },
    }
}

/// draw.io style string of a standardized element
pub fn element_style(role: Role) -> String {
    let Swatch { fill, stroke } = swatch(role);
    match role {
        Role::Person => format!(
            "html=1;fontSize=11;dashed=0;whiteSpace=wrap;fillColor={fill};strokeColor={stroke};fontColor=#ffffff;shape=mxgraph.c4.person2;align=center;metaEdit=1;points={PERSON_POINTS};resizable=0;"
        ),
        Role::Database => format!(
            "shape=cylinder3;size=15;boundedLbl=1;whiteSpace=wrap;html=1;labelBackgroundColor=none;fillColor={fill};fontColor=#ffffff;align=center;strokeColor={stroke};metaEdit=1;resizable=0;points={BOX_POINTS};"
        ),
        _ => format!(
            "rounded=1;whiteSpace=wrap;html=1;labelBackgroundColor=none;fillColor={fill};fontColor=#ffffff;align=center;arcSize=10;strokeColor={stroke};metaEdit=1;resizable=0;points={BOX_POINTS};"
        ),
    }
}

pub fn relationship_style() -> &'static str {
    RELATIONSHIP_STYLE
}

/// Placeholder label of a C4 element, sized so `name` fits the box
pub fn element_label(name: &str) -> String {
    let size = fit_font_size(name, NAME_FONT_SIZE, NAME_TARGET_WIDTH);
    format!(
        r##"<font style="font-size: {size}px"><b>%c4Name%</b></font><div>[%c4Type%]</div><br><div><font style="font-size: 11px"><font color="#cccccc">%c4Description%</font></div>"##
    )
}

/// Placeholder label of a C4 relationship
pub fn relationship_label() -> &'static str {
    RELATIONSHIP_LABEL
}
