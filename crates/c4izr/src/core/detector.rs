//! Core detector trait for input format identification

/// Core trait for input format detectors
///
/// Each source format provides a detector that recognizes its documents.
///
/// # Example
/// ```
/// use c4izr::core::Detector;
/// use c4izr::plugins::drawio::DrawioDetector;
///
/// let detector = DrawioDetector::new();
/// assert!(detector.detect("<mxfile><diagram/></mxfile>"));
/// ```
pub trait Detector: Send + Sync {
    /// Detect if the input matches this format
    fn detect(&self, input: &str) -> bool;

    /// Get the confidence level of the detection (0.0 to 1.0)
    fn confidence(&self, input: &str) -> f64;

    /// Get the input format name
    fn format_name(&self) -> &'static str;
}
