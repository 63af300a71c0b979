//! strokescore: score a hand-drawn character image against a reference.
//!
//! Decodes both images, extracts their ink masks, analyzes them on two
//! threads, and prints either a text report or a JSON summary.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin strokescore -- [OPTIONS] <REFERENCE> <USER>
//! ```
//!
//! Exit status is non-zero only when the images cannot be analyzed; a
//! low score is still a successful run.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use strokescore_engine::config::{
    DynamicsConfig, MaskConfig, SkeletonConfig, StrokeConfig, TurningConfig,
};
use strokescore_engine::{AnalysisConfig, BinaryMask, ComparisonSummary, ReportConfig};
use tracing_subscriber::EnvFilter;

/// Stroke geometry analysis and scoring for brush calligraphy.
///
/// Compares a user's drawing with a reference drawing of the same
/// character and reports thickness, turning, spacing, shape and
/// center-tip scores.
#[derive(Parser)]
#[command(name = "strokescore", version)]
struct Cli {
    /// Path to the reference image (PNG, JPEG, BMP, WebP).
    reference: PathBuf,

    /// Path to the user's image. Must have the same dimensions.
    user: PathBuf,

    /// Pixels at or below this luminance are ink.
    #[arg(long, default_value_t = MaskConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Keep red guide markings instead of removing them from the ink.
    #[arg(long)]
    keep_markings: bool,

    /// Skeleton spur length in pixels (0 disables pruning).
    #[arg(long, default_value_t = SkeletonConfig::DEFAULT_SPUR_LENGTH)]
    spur_length: usize,

    /// Turning-point half-window in skeleton samples.
    #[arg(long, default_value_t = TurningConfig::DEFAULT_WINDOW, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    turning_window: usize,

    /// Turning-point threshold in degrees.
    #[arg(long, default_value_t = TurningConfig::DEFAULT_THRESHOLD_DEGREES)]
    turning_threshold: f64,

    /// Chord length in skeleton samples for brush direction and speed.
    #[arg(long, default_value_t = DynamicsConfig::DEFAULT_WINDOW, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    dynamics_window: usize,

    /// Minimum stroke area in pixels; smaller components are noise.
    #[arg(long, default_value_t = StrokeConfig::DEFAULT_MIN_AREA)]
    min_stroke_area: usize,

    /// Decimals shown in the text report.
    #[arg(long, default_value_t = ReportConfig::DEFAULT_PRECISION)]
    precision: usize,

    /// Omit per-stroke and per-turn detail from the text report.
    #[arg(long)]
    brief: bool,

    /// Output a JSON summary instead of the text report.
    #[arg(long)]
    json: bool,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other analysis parameter flags are ignored.
    /// Fields left out keep their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Log analysis progress to stderr (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = AnalysisConfig::default();
    config.mask.threshold = cli.threshold;
    if cli.keep_markings {
        config.mask.marking = None;
    }
    config.skeleton.spur_length = cli.spur_length;
    config.turning.window = cli.turning_window;
    config.turning.threshold_degrees = cli.turning_threshold;
    config.dynamics.window = cli.dynamics_window;
    config.strokes.min_area = cli.min_stroke_area;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_mask(path: &Path, config: &AnalysisConfig) -> Result<BinaryMask, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "image loaded");
    strokescore_engine::mask::decode_mask(&bytes, &config.mask)
        .map_err(|e| format!("could not analyze {}: {e}", path.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli).and_then(|c| {
        c.validate().map_err(|e| e.to_string())?;
        Ok(c)
    }) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let masks = load_mask(&cli.reference, &config)
        .and_then(|r| load_mask(&cli.user, &config).map(|u| (r, u)));
    let (reference, user) = match masks {
        Ok(pair) => pair,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if reference.dimensions() != user.dimensions() {
        eprintln!(
            "could not analyze: reference is {} but user image is {}",
            reference.dimensions(),
            user.dimensions(),
        );
        return ExitCode::FAILURE;
    }

    let (reference_analysis, user_analysis) = std::thread::scope(|s| {
        let r = s.spawn(|| strokescore_engine::analyze_mask(&reference, &config));
        let u = strokescore_engine::analyze_mask(&user, &config);
        (r.join(), u)
    });
    let Ok(reference_analysis) = reference_analysis else {
        eprintln!("could not analyze {}: analysis thread panicked", cli.reference.display());
        return ExitCode::FAILURE;
    };

    let comparison = strokescore_engine::compare_analyses(
        &reference,
        &user,
        reference_analysis,
        user_analysis,
        &config,
    );

    if cli.json {
        match serde_json::to_string_pretty(&ComparisonSummary::from(&comparison)) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        let title = cli
            .user
            .file_stem()
            .and_then(|s| s.to_str())
            .map_or_else(|| "Stroke Analysis Report".to_owned(), |stem| {
                format!("Stroke Analysis Report: {stem}")
            });
        let report_config = ReportConfig {
            title,
            precision: cli.precision,
            include_strokes: !cli.brief,
            include_turning_points: !cli.brief,
            include_pressure: true,
            ..ReportConfig::default()
        };
        println!("{}", strokescore_engine::render_text(&comparison, &report_config));
    }

    ExitCode::SUCCESS
}
