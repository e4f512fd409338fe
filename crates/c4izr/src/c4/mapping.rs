//! User overrides for the C4 label fields
//!
//! ```json
//! {
//!   "roles":    { "person": { "type": "Customer" } },
//!   "elements": { "api": { "name": "Orders API", "description": "Takes orders" } }
//! }
//! ```
//!
//! Per-element overrides beat per-role overrides, which beat derived values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::{C4Error, Result, Role};

/// Replacement values for any of the three C4 fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldOverrides {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub c4_type: Option<String>,
    pub description: Option<String>,
}

impl FieldOverrides {
    /// Fields set in `self` win, the rest come from `fallback`
    pub fn or(&self, fallback: &FieldOverrides) -> FieldOverrides {
        FieldOverrides {
            name: self.name.clone().or_else(|| fallback.name.clone()),
            c4_type: self.c4_type.clone().or_else(|| fallback.c4_type.clone()),
            description: self
                .description
                .clone()
                .or_else(|| fallback.description.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawMapping {
    roles: BTreeMap<String, FieldOverrides>,
    elements: BTreeMap<String, FieldOverrides>,
}

/// Field overrides keyed by role and by element id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConfig {
    roles: BTreeMap<Role, FieldOverrides>,
    elements: BTreeMap<String, FieldOverrides>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawMapping = serde_json::from_str(json)
            .map_err(|e| C4Error::config_error(format!("invalid mapping: {}", e)))?;

        let mut roles = BTreeMap::new();
        for (name, overrides) in raw.roles {
            let role = Role::from_str(&name).map_err(C4Error::config_error)?;
            roles.insert(role, overrides);
        }

        debug!(
            roles = roles.len(),
            elements = raw.elements.len(),
            "Parsed mapping config"
        );
        Ok(Self {
            roles,
            elements: raw.elements,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            C4Error::config_error(format!("cannot read mapping {}: {}", path.display(), e))
        })?;
        let mapping = Self::from_json(&json)?;
        info!(path = %path.display(), "Loaded mapping config");
        Ok(mapping)
    }

    pub fn with_role(mut self, role: Role, overrides: FieldOverrides) -> Self {
        self.roles.insert(role, overrides);
        self
    }

    pub fn with_element(mut self, id: impl Into<String>, overrides: FieldOverrides) -> Self {
        self.elements.insert(id.into(), overrides);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.elements.is_empty()
    }

    /// Effective overrides for one element
    pub fn resolve(&self, id: &str, role: Role) -> FieldOverrides {
        let by_role = self.roles.get(&role).cloned().unwrap_or_default();
        match self.elements.get(id) {
            Some(by_element) => by_element.or(&by_role),
            None => by_role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_beats_role() {
        let mapping = MappingConfig::from_json(
            r#"{
                "roles": {"Person": {"type": "Customer", "description": "Buys things."}},
                "elements": {"u1": {"description": "Our best customer."}}
            }"#,
        )
        .unwrap();

        let resolved = mapping.resolve("u1", Role::Person);
        assert_eq!(resolved.c4_type.as_deref(), Some("Customer"));
        assert_eq!(resolved.description.as_deref(), Some("Our best customer."));
        assert_eq!(resolved.name, None);

        let other = mapping.resolve("u2", Role::Person);
        assert_eq!(other.description.as_deref(), Some("Buys things."));
        assert_eq!(mapping.resolve("u1", Role::Container).c4_type, None);
    }

    #[test]
    fn test_invalid_mappings_are_config_errors() {
        assert!(matches!(
            MappingConfig::from_json(r#"{"roles": {"spaceship": {}}}"#),
            Err(C4Error::Config { .. })
        ));
        assert!(matches!(
            MappingConfig::from_json(r#"{"elements": {"a": {"colour": "red"}}}"#),
            Err(C4Error::Config { .. })
        ));
        assert!(matches!(
            MappingConfig::load(Path::new("/nonexistent/mapping.json")),
            Err(C4Error::Config { .. })
        ));
    }

    #[test]
    fn test_empty_mapping() {
        let mapping = MappingConfig::from_json("{}").unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.resolve("x", Role::MainSystem), FieldOverrides::default());
    }
}
