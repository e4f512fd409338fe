//! Core abstractions for diagram standardization
//!
//! The diagram model, the error taxonomy, and the traits every input format
//! and output writer implements.

mod database;
mod detector;
mod diagram;
mod error;
pub mod logging;
mod parser;
mod renderer;
pub mod style;
pub mod text;
mod types;

pub use database::*;
pub use detector::*;
pub use diagram::*;
pub use error::*;
pub use logging::*;
pub use parser::*;
pub use renderer::*;
pub use style::Style;
pub use types::*;
