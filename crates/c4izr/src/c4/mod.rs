//! The C4 standardization engine
//!
//! Classification, styling and relationship mapping of a parsed diagram.

pub mod classifier;
pub mod mapping;
pub mod palette;
pub mod relationships;
pub mod styler;

pub use classifier::{
    classify, Candidate, CandidateSource, Classification, Classifier, FirstCandidate,
    SelectionProvider,
};
pub use mapping::{FieldOverrides, MappingConfig};
pub use relationships::{default_label, normalize_description, normalize_label, RelationshipMapper};
pub use styler::{spread_layout, Styler};
