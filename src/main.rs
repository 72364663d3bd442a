//! dffkit CLI
//!
//! Command-line interface for inspecting GTA DFF models, rebuilding their
//! scenes and converting them to glTF.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

use dffkit_import::{DffImporter, GltfExportOptions, GltfSink, ImportOptions, SceneCollector};
use dffkit_parsers::logging::{init_with_config, TracingConfig};
use dffkit_parsers::{DffModel, DffParser, HumanReadable, ParseOptions, Parser as _};

/// dffkit - GTA RenderWare DFF model toolkit
#[derive(Parser)]
#[command(name = "dffkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Image extension used when looking up textures
    #[arg(long, global = true, default_value = "png")]
    texture_ext: String,

    /// Fail on unknown chunk types and report broken references
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode models and summarize their contents
    Info(InfoArgs),

    /// Rebuild a model's scene and report what was skipped
    Import(ImportArgs),

    /// Convert a model to glTF 2.0
    Convert(ConvertArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// DFF files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the frame hierarchy
    #[arg(long)]
    tree: bool,
}

#[derive(Args)]
struct ImportArgs {
    /// DFF file to import
    file: PathBuf,

    /// Write the rebuilt scene as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip split normals
    #[arg(long)]
    no_normals: bool,
}

#[derive(Args)]
struct ConvertArgs {
    /// DFF file to convert
    file: PathBuf,

    /// Output path; the extension is replaced
    #[arg(short, long)]
    output: PathBuf,

    /// Write a single binary .glb
    #[arg(long)]
    glb: bool,

    /// Keep the source Z-up axes
    #[arg(long)]
    keep_z_up: bool,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::for_verbosity(cli.verbose));

    let parse = ParseOptions {
        strict_validation: cli.strict,
        skip_unknown_chunks: !cli.strict,
        ..ParseOptions::default()
    };
    let options = ImportOptions {
        texture_extension: cli.texture_ext.clone(),
        parse,
        ..ImportOptions::default()
    };

    match cli.command {
        Commands::Info(args) => cmd_info(&args, &options.parse, cli.format),
        Commands::Import(args) => cmd_import(&args, options, cli.format),
        Commands::Convert(args) => cmd_convert(&args, options),
    }
}

fn cmd_info(args: &InfoArgs, options: &ParseOptions, format: OutputFormat) -> Result<()> {
    let parser = DffParser::new();
    let results: Vec<(&PathBuf, Result<DffModel>)> = args
        .files
        .par_iter()
        .map(|path| {
            if !parser.can_parse(path) {
                warn!(path = %path.display(), "not a .dff file, decoding anyway");
            }
            let model = parser
                .parse_file_with_options(path, options, None)
                .with_context(|| format!("Failed to decode {}", path.display()));
            (path, model)
        })
        .collect();

    let mut failed = 0;
    let mut documents = Vec::new();
    for (path, result) in results {
        match result {
            Ok(model) => match format {
                OutputFormat::Text => print_model(path, &model, args.tree),
                OutputFormat::Json | OutputFormat::Yaml => documents.push(json!({
                    "path": path,
                    "model": model.to_json(),
                })),
            },
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err:#}", path.display());
            }
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&documents)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&documents)?),
        OutputFormat::Text => {}
    }

    if failed > 0 {
        bail!("{failed} of {} files could not be decoded", args.files.len());
    }
    Ok(())
}

fn print_model(path: &Path, model: &DffModel, tree: bool) {
    println!("{}", path.display());
    for line in model.to_readable_string().lines() {
        println!("  {line}");
    }
    if tree {
        println!("  Frames:");
        for line in model.frame_tree().lines() {
            println!("    {line}");
        }
    }
}

fn cmd_import(args: &ImportArgs, mut options: ImportOptions, format: OutputFormat) -> Result<()> {
    options.import_normals = !args.no_normals;
    let importer = DffImporter::new(options);

    let mut sink = SceneCollector::new();
    let report = importer
        .import_file(&args.file, &mut sink)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;
    let scene = sink.into_scene();
    let document = json!({ "scene": scene, "report": report });

    match format {
        OutputFormat::Text => {
            print!("{}", scene.outline());
            println!(
                "{} nodes, {} meshes, {} materials, {} faces",
                report.nodes, report.meshes, report.materials, report.faces
            );
            for diagnostic in &report.diagnostics {
                println!("warning: {diagnostic}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document["report"])?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&document["report"])?),
    }

    if let Some(output) = &args.output {
        let text = serde_json::to_string_pretty(&document)?;
        std::fs::write(output, text).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote scene to {}", output.display());
    }
    Ok(())
}

fn cmd_convert(args: &ConvertArgs, options: ImportOptions) -> Result<()> {
    let importer = DffImporter::new(options);
    let mut sink = GltfSink::new(GltfExportOptions {
        use_glb: args.glb,
        pretty_json: !args.compact,
        z_up_to_y_up: !args.keep_z_up,
        ..GltfExportOptions::default()
    });

    let report = importer
        .import_file(&args.file, &mut sink)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;
    debug!(diagnostics = report.diagnostics.len(), "import finished");

    let written = sink
        .write(&args.output)
        .map_err(dffkit_core::Error::from)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "{} -> {} ({} nodes, {} faces, {} warnings)",
        args.file.display(),
        written.display(),
        report.nodes,
        report.faces,
        report.diagnostics.len()
    );
    Ok(())
}
