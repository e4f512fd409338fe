//! Command-line interface for the c4izr utility
//!
//! Converts draw.io diagrams, graph JSON documents and diagram images into
//! C4 draw.io diagrams.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::output::{
    collect_drawio_files, default_drawio_path, directory_output_path, intermediate_path,
    open_in_drawio, write_document, DEFAULT_OUTPUT, DEFAULT_OUTPUT_DIR,
};
use crate::prompt::{stdin_is_terminal, TerminalPrompt};
use c4izr::c4::{Classifier, FirstCandidate, MappingConfig, SelectionProvider};
use c4izr::core::logging::init_logging;
use c4izr::plugins::{
    is_image_path, CommandExtractor, ConvertOptions, Converter, InputFormat,
    IntermediateRenderer,
};
use c4izr::{Database, Renderer, SelectionMode};

/// Environment variable holding the vision command line
pub const VISION_COMMAND_ENV: &str = "C4IZR_VISION_COMMAND";

/// Environment variable holding the draw.io executable
pub const DRAWIO_PATH_ENV: &str = "C4IZR_DRAWIO_PATH";

/// c4izr - Standardize draw.io diagrams into the C4 model
#[derive(Parser)]
#[command(name = "c4izr")]
#[command(about = "Convert draw.io diagrams and diagram images into C4 diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a diagram, an image or a directory of diagrams to C4
    Convert(ConvertArgs),

    /// Print the role of every element
    Classify {
        /// draw.io or graph JSON file (use - for stdin)
        input: PathBuf,

        /// Show in JSON format
        #[arg(long)]
        json: bool,

        /// Break main-system ties by document order instead of asking
        #[arg(long)]
        non_interactive: bool,
    },

    /// Parse and validate a diagram without converting it
    Validate {
        /// draw.io or graph JSON file (use - for stdin)
        input: PathBuf,
    },

    /// Detect the input format
    Detect {
        /// File to analyze (use - for stdin)
        input: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// A .drawio file, a graph JSON file, an image, or a directory of .drawio files
    pub input: PathBuf,

    /// Output file, or output directory when the input is a directory (use - for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Treat the input as an image regardless of its extension
    #[arg(long)]
    pub from_image: bool,

    /// Break main-system ties by document order instead of asking
    #[arg(long)]
    pub non_interactive: bool,

    /// Also write the generic diagram extracted from an image or graph JSON
    #[arg(long)]
    pub save_intermediate: bool,

    /// Spread elements away from the main system by this factor
    #[arg(short, long, default_value_t = 1.4)]
    pub scaling_factor: f64,

    /// Id or label of the main system
    #[arg(long, value_name = "ID|LABEL")]
    pub main_system: Option<String>,

    /// JSON file with name/type/description overrides per role or element
    #[arg(long, value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Fail instead of picking the first of several equal candidates
    #[arg(long)]
    pub strict_selection: bool,

    /// Write the page compressed, as draw.io does by default
    #[arg(long)]
    pub compress: bool,

    /// Overwrite existing output instead of keeping it as <stem>.v<N>.<ext>
    #[arg(long)]
    pub no_backup: bool,

    /// Program that prints graph JSON for the image given as its last argument
    #[arg(long, value_name = "CMD")]
    pub vision_command: Option<String>,

    /// Open the converted file(s) in draw.io afterwards
    #[arg(long)]
    pub open_output: bool,

    /// draw.io executable used by --open-output
    #[arg(long, value_name = "PATH")]
    pub drawio_path: Option<PathBuf>,
}

/// One element in the `classify` report
#[derive(Debug, Serialize)]
struct ElementReport<'a> {
    id: &'a str,
    label: &'a str,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct ClassifyReport<'a> {
    main_system: &'a str,
    elements: Vec<ElementReport<'a>>,
}

/// Files converted and skipped in directory mode
#[derive(Debug, Default)]
pub struct DirectorySummary {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Main CLI application
#[derive(Default)]
pub struct C4izrApp;

impl C4izrApp {
    pub fn new() -> Self {
        Self
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let default_level = if cli.verbose && cli.log_level == LogLevel::Info {
            LogLevel::Debug
        } else {
            cli.log_level
        };
        let log_level_str = std::env::var("C4IZR_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| default_level.as_str().to_string());
        let log_format_str = std::env::var("C4IZR_LOG_FORMAT")
            .ok()
            .unwrap_or_else(|| cli.log_format.as_str().to_string());

        if let Err(e) = init_logging(Some(&log_level_str), Some(&log_format_str)) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("c4izr v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Convert(args) => self.convert_command(&args),
            Commands::Classify {
                input,
                json,
                non_interactive,
            } => self.classify_command(&input, json, non_interactive),
            Commands::Validate { input } => self.validate_command(&input),
            Commands::Detect { input } => self.detect_command(&input),
        }
    }

    /// Interactive only when asked for and a person can answer
    fn selection_mode(non_interactive: bool) -> SelectionMode {
        if non_interactive {
            SelectionMode::NonInteractive
        } else if !stdin_is_terminal() {
            warn!("stdin is not a terminal, running non-interactively");
            SelectionMode::NonInteractive
        } else {
            SelectionMode::Interactive
        }
    }

    fn provider(mode: SelectionMode) -> Box<dyn SelectionProvider> {
        match mode {
            SelectionMode::Interactive => Box::new(TerminalPrompt::stdio()),
            SelectionMode::NonInteractive => Box::new(FirstCandidate),
        }
    }

    /// Build conversion options from the command line
    pub fn convert_options(args: &ConvertArgs, mode: SelectionMode) -> Result<ConvertOptions> {
        let mut options = ConvertOptions::new()
            .with_mode(mode)
            .with_strict(args.strict_selection)
            .with_scaling_factor(args.scaling_factor)
            .with_compression(args.compress);
        if let Some(main_system) = &args.main_system {
            options = options.with_main_system(main_system.clone());
        }
        if let Some(path) = &args.mapping {
            let mapping = MappingConfig::load(path)
                .with_context(|| format!("Failed to load mapping '{}'", path.display()))?;
            options = options.with_mapping(mapping);
        }
        Ok(options)
    }

    /// Handle the convert command
    fn convert_command(&mut self, args: &ConvertArgs) -> Result<()> {
        if !is_stdio(&args.input) && !args.input.exists() {
            bail!("Input path '{}' does not exist", args.input.display());
        }

        let mode = Self::selection_mode(args.non_interactive);
        let converter = Converter::new(Self::convert_options(args, mode)?);
        let mut provider = Self::provider(mode);

        if args.from_image || is_image_path(&args.input) {
            if !args.input.is_file() {
                bail!("Image conversion needs a single image file, not '{}'", args.input.display());
            }
            return self.convert_image(&converter, args, provider.as_mut());
        }

        if args.input.is_dir() {
            let output_dir = match &args.output {
                Some(dir) if dir.is_dir() => dir.clone(),
                _ => PathBuf::from(DEFAULT_OUTPUT_DIR),
            };
            let summary =
                self.convert_directory(&converter, &args.input, &output_dir, provider.as_mut(), !args.no_backup)?;
            eprintln!(
                "Processing complete: {} converted, {} failed",
                summary.converted.len(),
                summary.failed.len()
            );
            if summary.converted.is_empty() {
                bail!("No diagram in '{}' was converted", args.input.display());
            }
            Self::open_outputs(args, &summary.converted);
            return Ok(());
        }

        let content = self.read_input(&args.input)?;
        let format = converter.detect_format(&content)?;
        let diagram = converter.parse(&content)?;

        let output = args.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let intermediate = match (args.save_intermediate, format) {
            (true, InputFormat::GraphJson) if !is_stdio(&output) => {
                Some(IntermediateRenderer::new().render(&diagram)?)
            }
            (true, _) => {
                warn!(format = %format, "--save-intermediate only applies to image and graph JSON input");
                None
            }
            (false, _) => None,
        };

        let conversion = converter
            .convert_diagram(diagram, provider.as_mut())
            .with_context(|| format!("Failed to convert '{}'", args.input.display()))?;
        if let Some(intermediate) = intermediate {
            let path = intermediate_path(&output);
            self.write_file(&path, &intermediate, !args.no_backup)?;
            info!(path = %path.display(), "Intermediate draw.io saved");
        }
        self.write_output(&output, &conversion.document, !args.no_backup)?;
        info!(
            main_system = %conversion.classification.main_system,
            output = %output.display(),
            "Conversion successful"
        );
        Self::open_outputs(args, &[output]);
        Ok(())
    }

    /// The draw.io executable: flag, then environment, then the usual install path
    fn drawio_program(args: &ConvertArgs) -> PathBuf {
        args.drawio_path
            .clone()
            .or_else(|| std::env::var_os(DRAWIO_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(default_drawio_path)
    }

    /// Hand written outputs to draw.io when asked; a failure only warns
    fn open_outputs(args: &ConvertArgs, outputs: &[PathBuf]) {
        if !args.open_output {
            return;
        }
        let program = Self::drawio_program(args);
        for output in outputs.iter().filter(|o| !is_stdio(o)) {
            if let Err(e) = open_in_drawio(&program, output) {
                warn!(
                    program = %program.display(),
                    output = %output.display(),
                    error = %e,
                    "Could not open output in draw.io"
                );
            }
        }
    }

    fn vision_extractor(args: &ConvertArgs) -> Result<CommandExtractor> {
        let command = args
            .vision_command
            .clone()
            .or_else(|| std::env::var(VISION_COMMAND_ENV).ok())
            .ok_or_else(|| {
                anyhow!(
                    "Image input needs a vision command: pass --vision-command or set {}",
                    VISION_COMMAND_ENV
                )
            })?;
        Ok(CommandExtractor::from_command_line(&command)?)
    }

    fn convert_image(
        &self,
        converter: &Converter,
        args: &ConvertArgs,
        provider: &mut dyn SelectionProvider,
    ) -> Result<()> {
        let extractor = Self::vision_extractor(args)?;
        let result = converter
            .convert_image(&args.input, &extractor, provider)
            .with_context(|| format!("Failed to convert image '{}'", args.input.display()))?;

        let output = args.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        if args.save_intermediate && !is_stdio(&output) {
            let path = intermediate_path(&output);
            self.write_file(&path, &result.intermediate, !args.no_backup)?;
            info!(path = %path.display(), "Intermediate draw.io saved");
        }
        self.write_output(&output, &result.conversion.document, !args.no_backup)?;
        Self::open_outputs(args, &[output]);
        Ok(())
    }

    /// Convert every `.drawio` file below `input_dir`, skipping failures
    pub fn convert_directory(
        &self,
        converter: &Converter,
        input_dir: &Path,
        output_dir: &Path,
        provider: &mut dyn SelectionProvider,
        backup: bool,
    ) -> Result<DirectorySummary> {
        let files = collect_drawio_files(input_dir)
            .with_context(|| format!("Failed to read directory '{}'", input_dir.display()))?;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;

        let mut summary = DirectorySummary::default();
        for file in files {
            let target = directory_output_path(input_dir, &file, output_dir);
            let outcome = fs::read_to_string(&file)
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(converter.convert_xml(&content, &mut *provider)?))
                .and_then(|conversion| Ok(write_document(&target, &conversion.document, backup)?));

            match outcome {
                Ok(_) => {
                    info!(input = %file.display(), output = %target.display(), "Converted");
                    summary.converted.push(target);
                }
                Err(e) => {
                    warn!(input = %file.display(), error = %e, "Skipping file");
                    summary.failed.push((file, e.to_string()));
                }
            }
        }
        Ok(summary)
    }

    /// Handle the classify command
    fn classify_command(&self, input: &Path, json: bool, non_interactive: bool) -> Result<()> {
        let content = self.read_input(input)?;
        let converter = Converter::default();
        let mut diagram = converter.parse(&content)?;
        diagram.validate()?;

        let mode = Self::selection_mode(non_interactive);
        let classification = Classifier::new()
            .with_mode(mode)
            .classify(&mut diagram, Self::provider(mode).as_mut())?;

        let elements: Vec<ElementReport> = diagram
            .nodes()
            .map(|e| ElementReport {
                id: &e.id,
                label: &e.label,
                role: e.role.as_str(),
            })
            .collect();

        if json {
            let report = ClassifyReport {
                main_system: &classification.main_system,
                elements,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for element in elements {
                println!(
                    "{}\t{}\t{}",
                    element.id,
                    element.role,
                    element.label.replace('\n', " ")
                );
            }
        }
        Ok(())
    }

    /// Handle the validate command
    fn validate_command(&self, input: &Path) -> Result<()> {
        let content = self.read_input(input)?;
        let converter = Converter::default();

        let format = match converter.detect_format(&content) {
            Ok(format) => format,
            Err(e) => {
                println!("✗ Could not detect input format");
                return Err(e.into());
            }
        };

        match converter.parse(&content).and_then(|d| d.validate().map(|_| d)) {
            Ok(diagram) => {
                println!(
                    "✓ Valid {} diagram: {} elements, {} connections",
                    format,
                    diagram.node_count(),
                    diagram.edge_count()
                );
                Ok(())
            }
            Err(e) => {
                println!("✗ Invalid {} diagram: {}", format, e);
                Err(e.into())
            }
        }
    }

    /// Handle the detect command
    fn detect_command(&self, input: &Path) -> Result<()> {
        let content = self.read_input(input)?;
        match Converter::default().detect_format(&content) {
            Ok(format) => {
                println!("{}", format);
                Ok(())
            }
            Err(e) => {
                eprintln!("Could not detect input format: {}", e);
                Err(e.into())
            }
        }
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: &Path) -> Result<String> {
        if is_stdio(input) {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            Ok(content)
        } else {
            fs::read_to_string(input)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", input.display(), e))
        }
    }

    fn write_file(&self, path: &Path, content: &str, backup: bool) -> Result<()> {
        write_document(path, content, backup)
            .map_err(|e| anyhow!("Failed to write output file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: &Path, content: &str, backup: bool) -> Result<()> {
        if is_stdio(output) {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
            io::stdout().flush()?;
            Ok(())
        } else {
            self.write_file(output, content, backup)
        }
    }
}
