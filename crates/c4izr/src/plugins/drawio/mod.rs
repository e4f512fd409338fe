//! draw.io format plugin
//!
//! Reading and writing of draw.io (`.drawio`) documents, compressed or plain.

mod codec;
mod detector;
mod parser;
mod renderer;

pub use codec::*;
pub use detector::*;
pub use parser::*;
pub use renderer::*;
