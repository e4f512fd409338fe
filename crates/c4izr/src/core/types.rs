//! Core type definitions for diagram standardization
//!
//! This module contains the fundamental types used throughout c4izr:
//! C4 roles, geometry, visual hints, and C4 metadata fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// C4 role of a diagram element
///
/// Every element starts [`Role::Unclassified`] and is assigned exactly one of
/// the other roles by the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Unclassified,
    Person,
    MainSystem,
    ExternalSystem,
    Container,
    Component,
    Database,
}

impl Role {
    /// All roles an element can end up with after classification
    pub const CLASSIFIED: [Role; 6] = [
        Role::MainSystem,
        Role::Person,
        Role::ExternalSystem,
        Role::Container,
        Role::Component,
        Role::Database,
    ];

    /// Processing rank used by the style applier (MainSystem first)
    pub fn rank(&self) -> u8 {
        match self {
            Role::MainSystem => 0,
            Role::Person => 1,
            Role::ExternalSystem => 2,
            Role::Container => 3,
            Role::Component => 4,
            Role::Database => 5,
            Role::Unclassified => 6,
        }
    }

    /// The C4 type field shown in the element label
    pub fn c4_type(&self) -> &'static str {
        match self {
            Role::Person => "Person",
            Role::MainSystem => "Software System",
            Role::ExternalSystem => "External System",
            Role::Container => "Container",
            Role::Component => "Component",
            Role::Database => "Database",
            Role::Unclassified => "Element",
        }
    }

    /// Returns true once the classifier has assigned the role
    pub fn is_classified(&self) -> bool {
        !matches!(self, Role::Unclassified)
    }

    /// Attribute spelling, e.g. `main-system`
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unclassified => "unclassified",
            Role::Person => "person",
            Role::MainSystem => "main-system",
            Role::ExternalSystem => "external-system",
            Role::Container => "container",
            Role::Component => "component",
            Role::Database => "database",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match normalized.as_str() {
            "unclassified" => Ok(Role::Unclassified),
            "person" | "actor" | "user" => Ok(Role::Person),
            "mainsystem" | "main" | "system" => Ok(Role::MainSystem),
            "externalsystem" | "external" => Ok(Role::ExternalSystem),
            "container" => Ok(Role::Container),
            "component" => Ok(Role::Component),
            "database" | "db" => Ok(Role::Database),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// How the main system is chosen when several candidates tie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SelectionMode {
    /// Ask the caller-supplied selection provider
    #[default]
    Interactive,
    /// First candidate in document order wins
    NonInteractive,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Interactive => write!(f, "interactive"),
            SelectionMode::NonInteractive => write!(f, "non-interactive"),
        }
    }
}

/// A point in diagram coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box: position of the top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Resize to `width` x `height` around the current center
    pub fn resized_around_center(&self, width: f64, height: f64) -> Self {
        let center = self.center();
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Move so that the center lands on `center`, keeping the size
    pub fn centered_at(&self, center: Point) -> Self {
        Self::new(
            center.x - self.width / 2.0,
            center.y - self.height / 2.0,
            self.width,
            self.height,
        )
    }

    /// Shift by an offset, used to turn parent-relative into absolute coordinates
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Returns true if every field is a finite number and the size is not negative
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// Raw classification signals collected while loading an element
///
/// Loaders only copy what they find in the source; the role classifier is the
/// single place that interprets these values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualHints {
    /// Shape name from the style (`shape=cylinder3`) or its leading bare token (`ellipse`)
    pub shape: Option<String>,
    /// Icon reference (`image=...`, `resIcon=...`)
    pub icon: Option<String>,
    /// Fill color from the style
    pub fill_color: Option<String>,
    /// Element type reported by the vision stage (`box`, `person`, `database`, ...)
    pub kind: Option<String>,
    /// Free-text styling notes reported by the vision stage
    pub notes: Option<String>,
    /// Role declared on the source cell through a `c4Role` attribute
    pub declared_role: Option<Role>,
    /// Id of the group/swimlane the element was drawn in
    pub cluster: Option<String>,
}

/// C4 fields of an element label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct C4Fields {
    pub name: String,
    pub c4_type: String,
    pub description: String,
}

/// C4 fields of a relationship label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipFields {
    pub description: String,
    pub technology: Option<String>,
}
