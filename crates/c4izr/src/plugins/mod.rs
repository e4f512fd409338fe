//! Input formats, output writers and the conversion pipeline
//!
//! Each format plugin implements the core traits for its syntax.

pub mod drawio;
pub mod graph_json;
pub mod orchestrator;
pub mod vision;

pub use drawio::*;
pub use graph_json::*;
pub use orchestrator::*;
pub use vision::*;
