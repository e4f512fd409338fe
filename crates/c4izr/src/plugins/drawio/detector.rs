//! draw.io document detector

use crate::core::Detector;
use tracing::trace;

/// Recognizes `mxfile` and `mxGraphModel` documents
pub struct DrawioDetector;

impl DrawioDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DrawioDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for DrawioDetector {
    fn detect(&self, input: &str) -> bool {
        self.confidence(input) >= 0.5
    }

    fn confidence(&self, input: &str) -> f64 {
        let input = input.trim_start_matches('\u{feff}').trim();
        if !input.starts_with('<') {
            return 0.0;
        }

        let mut score: f64 = 0.0;
        if input.contains("<mxfile") {
            score += 0.6;
        }
        if input.contains("<mxGraphModel") {
            score += 0.6;
        }
        if input.contains("<diagram") {
            score += 0.2;
        }
        if input.contains("<mxCell") {
            score += 0.2;
        }

        trace!(score, "DrawioDetector confidence");
        score.min(1.0)
    }

    fn format_name(&self) -> &'static str {
        "drawio"
    }
}
