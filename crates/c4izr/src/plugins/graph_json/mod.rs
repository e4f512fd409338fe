//! Vision graph JSON plugin
//!
//! Loads the element/connection graph extracted from an image and renders the
//! generic draw.io document it corresponds to.

mod detector;
mod intermediate;
mod parser;

pub use detector::*;
pub use intermediate::*;
pub use parser::*;
