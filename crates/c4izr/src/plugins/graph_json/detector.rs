//! Graph JSON detector

use super::extract_json;
use crate::core::Detector;
use tracing::trace;

/// Recognizes vision graph JSON, fenced or bare
pub struct GraphJsonDetector;

impl GraphJsonDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GraphJsonDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for GraphJsonDetector {
    fn detect(&self, input: &str) -> bool {
        self.confidence(input) >= 0.5
    }

    fn confidence(&self, input: &str) -> f64 {
        let json = extract_json(input);
        if !json.starts_with('{') {
            return 0.0;
        }

        let mut score: f64 = 0.25;
        if json.contains("\"elements\"") {
            score += 0.5;
        }
        if json.contains("\"connections\"") {
            score += 0.25;
        }

        trace!(score, "GraphJsonDetector confidence");
        score.min(1.0)
    }

    fn format_name(&self) -> &'static str {
        "graph-json"
    }
}
