//! Conversion pipeline
//!
//! The converter runs one input through every stage:
//! Detector → Parser → validate → classify → spread → style → relationships → Renderer

use std::fmt;
use std::path::Path;
use tracing::{debug, info, span, trace, warn, Level};

use crate::c4::{
    spread_layout, Classification, Classifier, MappingConfig, RelationshipMapper,
    SelectionProvider, Styler,
};
use crate::core::{C4Error, Detector, Diagram, Parser, Renderer, Result, SelectionMode};
use crate::plugins::drawio::{DrawioDetector, DrawioParser, DrawioRenderer};
use crate::plugins::graph_json::{
    GraphJsonDetector, GraphJsonParser, IntermediateRenderer,
};
use crate::plugins::vision::VisionExtractor;

/// Input formats the converter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    Drawio,
    GraphJson,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Drawio => write!(f, "drawio"),
            InputFormat::GraphJson => write!(f, "graph-json"),
        }
    }
}

/// Settings for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub mode: SelectionMode,
    /// Element id or label of the main system
    pub main_system: Option<String>,
    /// Fail instead of breaking main-system ties in non-interactive mode
    pub strict: bool,
    /// Distance scale around the main system, 1.0 keeps the layout
    pub scaling_factor: f64,
    pub mapping: MappingConfig,
    /// Compress the page of the output document
    pub compress: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Interactive,
            main_system: None,
            strict: false,
            scaling_factor: 1.0,
            mapping: MappingConfig::default(),
            compress: false,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_main_system(mut self, main_system: impl Into<String>) -> Self {
        self.main_system = Some(main_system.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_scaling_factor(mut self, factor: f64) -> Self {
        self.scaling_factor = factor;
        self
    }

    pub fn with_mapping(mut self, mapping: MappingConfig) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Result of a successful conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The standardized diagram
    pub diagram: Diagram,
    pub classification: Classification,
    /// The draw.io document to write
    pub document: String,
}

/// Result of converting an image
#[derive(Debug, Clone)]
pub struct ImageConversion {
    pub conversion: Conversion,
    /// Generic draw.io document of what the vision stage extracted
    pub intermediate: String,
}

/// Runs the standardization pipeline
pub struct Converter {
    options: ConvertOptions,
    detectors: Vec<(InputFormat, Box<dyn Detector>)>,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            detectors: vec![
                (InputFormat::Drawio, Box::new(DrawioDetector::new())),
                (InputFormat::GraphJson, Box::new(GraphJsonDetector::new())),
            ],
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Pick the format whose detector is most confident
    pub fn detect_format(&self, input: &str) -> Result<InputFormat> {
        let detect_span = span!(Level::INFO, "detect_format", input_len = input.len());
        let _enter = detect_span.enter();

        let mut best: Option<(InputFormat, f64)> = None;
        for (format, detector) in &self.detectors {
            let confidence = detector.confidence(input);
            trace!(format = %format, confidence, "Checking detector");
            if detector.detect(input) && best.map_or(true, |(_, c)| confidence > c) {
                best = Some((*format, confidence));
            }
        }

        match best {
            Some((format, confidence)) => {
                info!(format = %format, confidence, "Detected input format");
                Ok(format)
            }
            None => {
                warn!("No suitable detector found for input");
                Err(C4Error::parse_error(
                    "input is neither draw.io XML nor graph JSON",
                ))
            }
        }
    }

    /// Detect the format and parse into an unclassified diagram
    pub fn parse(&self, input: &str) -> Result<Diagram> {
        match self.detect_format(input)? {
            InputFormat::Drawio => DrawioParser::new().parse(input),
            InputFormat::GraphJson => GraphJsonParser::new().parse(input),
        }
    }

    /// Run every standardization stage on a parsed diagram
    pub fn standardize(
        &self,
        mut diagram: Diagram,
        provider: &mut dyn SelectionProvider,
    ) -> Result<(Diagram, Classification)> {
        let standardize_span = span!(
            Level::INFO,
            "standardize",
            element_count = diagram.elements().len(),
            connection_count = diagram.connections().len()
        );
        let _enter = standardize_span.enter();

        let validate_span = span!(Level::DEBUG, "pipeline_validate");
        let validate_enter = validate_span.enter();
        diagram.validate()?;
        drop(validate_enter);

        let classification = Classifier::new()
            .with_mode(self.options.mode)
            .with_main_system(self.options.main_system.clone())
            .with_strict(self.options.strict)
            .classify(&mut diagram, provider)?;

        spread_layout(&mut diagram, self.options.scaling_factor)?;
        Styler::new()
            .with_mapping(self.options.mapping.clone())
            .apply(&mut diagram)?;
        RelationshipMapper::new().apply(&mut diagram)?;

        info!(main_system = %classification.main_system, "Standardization completed");
        Ok((diagram, classification))
    }

    /// Standardize a diagram and serialize it as a draw.io document
    pub fn convert_diagram(
        &self,
        diagram: Diagram,
        provider: &mut dyn SelectionProvider,
    ) -> Result<Conversion> {
        let (diagram, classification) = self.standardize(diagram, provider)?;

        let render_span = span!(Level::DEBUG, "pipeline_render");
        let _render_enter = render_span.enter();
        let document = DrawioRenderer::new()
            .with_compression(self.options.compress)
            .render_document(&diagram)?;
        debug!(output_len = document.len(), "Rendering completed");

        Ok(Conversion {
            diagram,
            classification,
            document,
        })
    }

    pub fn convert_xml(
        &self,
        xml: &str,
        provider: &mut dyn SelectionProvider,
    ) -> Result<Conversion> {
        let diagram = DrawioParser::new().parse(xml)?;
        self.convert_diagram(diagram, provider)
    }

    pub fn convert_graph_json(
        &self,
        json: &str,
        provider: &mut dyn SelectionProvider,
    ) -> Result<Conversion> {
        let diagram = GraphJsonParser::new().parse(json)?;
        self.convert_diagram(diagram, provider)
    }

    /// Convert draw.io XML or graph JSON, whichever the input is
    pub fn convert(&self, input: &str, provider: &mut dyn SelectionProvider) -> Result<Conversion> {
        let diagram = self.parse(input)?;
        self.convert_diagram(diagram, provider)
    }

    /// Extract a graph from an image, then convert it
    pub fn convert_image(
        &self,
        image: &Path,
        extractor: &dyn VisionExtractor,
        provider: &mut dyn SelectionProvider,
    ) -> Result<ImageConversion> {
        let image_span = span!(Level::INFO, "convert_image", image = %image.display());
        let _enter = image_span.enter();

        let document = extractor.extract(image)?;
        let diagram = GraphJsonParser::new().load(document)?;
        let intermediate = IntermediateRenderer::new().render(&diagram)?;
        let conversion = self.convert_diagram(diagram, provider)?;

        Ok(ImageConversion {
            conversion,
            intermediate,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}
