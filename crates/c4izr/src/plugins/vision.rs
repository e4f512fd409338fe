//! Image to graph extraction
//!
//! The engine does not talk to a vision model itself. A [`VisionExtractor`]
//! turns an image into a [`GraphDocument`]; the shipped [`CommandExtractor`]
//! runs a user-configured program that prints the graph JSON on stdout.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info, span, warn, Level};

use super::graph_json::{extract_json, GraphDocument};
use crate::core::{C4Error, Result};

/// File extensions treated as raster images
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Returns true if the path has one of [`IMAGE_EXTENSIONS`] (case-insensitive)
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Extracts the element/connection graph from an image
pub trait VisionExtractor: Send + Sync {
    fn extract(&self, image: &Path) -> Result<GraphDocument>;

    fn name(&self) -> &'static str;
}

/// Runs an external command with the image path as its last argument
///
/// The child inherits the environment, so credentials such as
/// `ANTHROPIC_API_KEY` reach the command without the engine reading them.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line on whitespace: the first word is the program
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| C4Error::config_error("vision command is empty"))?;
        Ok(Self {
            program: program.to_string(),
            args: words.map(str::to_string).collect(),
        })
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl VisionExtractor for CommandExtractor {
    fn extract(&self, image: &Path) -> Result<GraphDocument> {
        let vision_span = span!(
            Level::INFO,
            "vision_extract",
            program = %self.program,
            image = %image.display()
        );
        let _enter = vision_span.enter();

        if !image.is_file() {
            return Err(C4Error::vision_error(format!(
                "image not found: {}",
                image.display()
            )));
        }

        info!("Running vision command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .output()
            .map_err(|e| {
                C4Error::vision_error(format!("failed to run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "Vision command failed");
            return Err(C4Error::vision_error(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| C4Error::vision_error("vision command printed invalid UTF-8"))?;
        let document: GraphDocument = serde_json::from_str(extract_json(&stdout))
            .map_err(|e| C4Error::vision_error(format!("vision output is not graph JSON: {}", e)))?;

        debug!(
            elements = document.elements.len(),
            connections = document.connections.len(),
            "Vision extraction finished"
        );
        Ok(document)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("arch.png")));
        assert!(is_image_path(Path::new("dir/Arch.JPEG")));
        assert!(!is_image_path(Path::new("arch.drawio")));
        assert!(!is_image_path(Path::new("png")));
    }

    #[test]
    fn test_command_line_split() {
        let extractor = CommandExtractor::from_command_line("python3 vision.py --model fast").unwrap();
        assert_eq!(extractor.program(), "python3");
        assert_eq!(extractor.args, vec!["vision.py", "--model", "fast"]);
        assert!(matches!(
            CommandExtractor::from_command_line("   "),
            Err(C4Error::Config { .. })
        ));
    }

    #[test]
    fn test_missing_image_is_vision_error() {
        let extractor = CommandExtractor::new("cat");
        let result = extractor.extract(&PathBuf::from("/nonexistent/diagram.png"));
        assert!(matches!(result, Err(C4Error::Vision { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_output_is_parsed() {
        let path = std::env::temp_dir().join(format!("c4izr-vision-{}.png", std::process::id()));
        std::fs::write(
            &path,
            "```json\n{\"elements\": [{\"id\": \"a\", \"label\": \"A\"}], \"connections\": []}\n```",
        )
        .unwrap();

        let document = CommandExtractor::new("cat").extract(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(document.elements.len(), 1);
        assert_eq!(document.elements[0].label, "A");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_is_vision_error() {
        let path = std::env::temp_dir().join(format!("c4izr-vision-fail-{}.png", std::process::id()));
        std::fs::write(&path, "x").unwrap();
        let result = CommandExtractor::new("false").extract(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(C4Error::Vision { .. })));
    }
}
