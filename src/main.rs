//! Command-line front end for the complexity analyzer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use zenmotion::{
    output, source, AnalyzerConfig, ComplexityAnalyzer, ComplexityWeights, DetailLevel, Dim,
    OutputError, OutputFormat, ScoreVersion,
};

/// Analyzes video complexity using motion estimation and spatial analysis.
#[derive(Parser)]
#[command(name = "zenmotion", version)]
struct Args {
    /// Input video file (.y4m, or .yuv with --width/--height)
    input: PathBuf,

    /// Output file path; use '-' for stdout
    output: String,

    /// Video width in pixels (required for raw YUV, ignored for Y4M)
    #[arg(long)]
    width: Option<usize>,

    /// Video height in pixels (required for raw YUV, ignored for Y4M)
    #[arg(long)]
    height: Option<usize>,

    /// Number of frames to process (0 = all)
    #[arg(long, default_value_t = 0)]
    frames: usize,

    /// GOP size for the encoding simulation
    #[arg(long, default_value_t = 150)]
    gop_size: usize,

    /// Number of consecutive B-frames between anchors
    #[arg(long, default_value_t = 0)]
    bframes: usize,

    /// Output format: csv, json or xml
    #[arg(long, default_value = "csv")]
    format: OutputFormat,

    /// Detail level: frame or gop
    #[arg(long, default_value = "frame")]
    detail: DetailLevel,

    /// Unified complexity score version: v1 (bpp-based) or v2 (weighted)
    #[arg(long, default_value = "v2")]
    complexity_score: ScoreVersion,

    /// Spatial weight for v2 scoring
    #[arg(long, default_value_t = 0.25)]
    weight_spatial: f64,

    /// Motion weight for v2 scoring
    #[arg(long, default_value_t = 0.30)]
    weight_motion: f64,

    /// Residual weight for v2 scoring
    #[arg(long, default_value_t = 0.25)]
    weight_residual: f64,

    /// Error weight for v2 scoring
    #[arg(long, default_value_t = 0.20)]
    weight_error: f64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.gop_size < 1 {
        bail!("invalid GOP size (must be >= 1)");
    }
    let dim = match (args.width, args.height) {
        (Some(width), Some(height)) => Some(Dim { width, height }),
        (None, None) => None,
        _ => bail!("--width and --height must be given together"),
    };

    let input_format = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "unknown".into());
    let source = source::open_source(&args.input, dim)?;

    let weights = ComplexityWeights {
        spatial: args.weight_spatial,
        motion: args.weight_motion,
        residual: args.weight_residual,
        error: args.weight_error,
    };
    info!(
        input = %args.input.display(),
        gop_size = args.gop_size,
        bframes = args.bframes,
        score = ?args.complexity_score,
        "starting analysis"
    );

    let config = AnalyzerConfig {
        gop_size: args.gop_size,
        b_frames: args.bframes,
        num_frames: args.frames,
        weights,
        score_version: args.complexity_score,
    };
    let mut analyzer = ComplexityAnalyzer::new(source, config)?;

    let begin = Instant::now();
    analyzer.analyze()?;
    info!(
        frames = analyzer.records().len(),
        elapsed_ms = begin.elapsed().as_millis() as u64,
        "analysis finished"
    );

    let results = analyzer.into_results(&input_format, &args.input.display().to_string());

    if args.output == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        output::write_results(&mut out, &results, args.format, args.detail)?;
    } else {
        let file = File::create(&args.output).map_err(|source| OutputError::Open {
            path: args.output.clone(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        output::write_results(&mut out, &results, args.format, args.detail)?;
        out.flush()
            .with_context(|| format!("flushing {}", args.output))?;
    }
    Ok(())
}
