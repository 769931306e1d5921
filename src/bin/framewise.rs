use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ndarray::Axis;
use serde::Serialize;

use framewise::features::AudioReader;
use framewise::model::{output_dimension, Tensor};
use framewise::telemetry::{hub, TelemetrySnapshot};
use framewise::{
    AppConfig, AudioItem, LegacyFeatureExtractor, NativeEngine, RecipeConfig, SimpleSegmentation,
    Specifications, WavReader,
};

fn main() -> ExitCode {
    framewise::init_logging();
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("framewise error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "framewise",
    about = "Frame-level audio features and segmentation scores"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => AppConfig::load_from_file(path),
            None => AppConfig::default(),
        };

        match self.command {
            Command::Extract(args) => extract_command(config, args),
            Command::Segment(args) => segment_command(config, args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract recipe features from a WAV file and print a JSON summary.
    Extract(ExtractArgs),
    /// Run the segmentation forward path on a WAV file.
    Segment(SegmentArgs),
}

#[derive(Args, Debug, Clone)]
struct ExtractArgs {
    /// WAV file to analyse.
    wav: PathBuf,
    /// 1-based channel to extract.
    #[arg(long, default_value_t = 1)]
    channel: usize,
    /// Recipe as inline JSON (overrides the configuration file).
    #[arg(long)]
    recipe: Option<String>,
    /// Also print every feature row.
    #[arg(long, default_value_t = false)]
    full: bool,
}

#[derive(Args, Debug, Clone)]
struct SegmentArgs {
    /// WAV file to segment.
    wav: PathBuf,
    /// Task specification JSON file.
    #[arg(long)]
    task: PathBuf,
    /// Trained parameters JSON file (name -> {shape, data}).
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Also print every score row.
    #[arg(long, default_value_t = false)]
    full: bool,
}

#[derive(Serialize)]
struct ExtractReport {
    source: String,
    sample_rate: Option<u32>,
    dimension: usize,
    num_frames: usize,
    grid_start: f64,
    grid_duration: f64,
    grid_step: f64,
    has_non_finite: bool,
    telemetry: TelemetrySnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Vec<f64>>>,
}

#[derive(Serialize)]
struct SegmentReport {
    source: String,
    dimension: usize,
    num_frames: usize,
    frame_duration: f64,
    frame_step: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<Vec<Vec<f32>>>,
}

fn extract_command(config: AppConfig, args: ExtractArgs) -> Result<()> {
    let recipe_config = match &args.recipe {
        Some(json) => serde_json::from_str::<RecipeConfig>(json)
            .context("failed to parse --recipe JSON")?,
        None => config.extraction.recipe,
    };
    let recipe = recipe_config.build().context("invalid feature recipe")?;

    let mut extractor = LegacyFeatureExtractor::new(recipe, NativeEngine::new(), WavReader)
        .context("failed to create extractor")?;

    let item = AudioItem::new(&args.wav).with_channel(args.channel);
    let matrix = extractor
        .extract(&item)
        .with_context(|| format!("failed to extract features from {}", args.wav.display()))?;

    let grid = matrix.grid();
    let report = ExtractReport {
        source: item.identifier(),
        sample_rate: extractor.configured_sample_rate().map(|rate| rate.hz()),
        dimension: matrix.dimension(),
        num_frames: matrix.num_frames(),
        grid_start: grid.start(),
        grid_duration: grid.duration(),
        grid_step: grid.step(),
        has_non_finite: matrix.has_non_finite(),
        telemetry: hub().snapshot(),
        rows: args
            .full
            .then(|| matrix.data().rows().into_iter().map(|row| row.to_vec()).collect()),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn segment_command(config: AppConfig, args: SegmentArgs) -> Result<()> {
    let specifications: Specifications = read_json(&args.task)?;
    let dimension = output_dimension(&specifications).context("unsupported task")?;
    tracing::info!(dimension, "task specification loaded");

    let mut model = SimpleSegmentation::new(config.segmentation.clone(), &specifications)
        .context("failed to build segmentation model")?;

    if let Some(path) = &args.weights {
        let parameters: HashMap<String, Tensor> = read_json(path)?;
        model
            .load_parameters(&parameters)
            .with_context(|| format!("failed to load parameters from {}", path.display()))?;
    }

    let audio = WavReader
        .read(&args.wav)
        .with_context(|| format!("failed to read {}", args.wav.display()))?;
    if audio.sample_rate != config.segmentation.sample_rate {
        bail!(
            "{} is sampled at {} Hz, the model expects {} Hz",
            args.wav.display(),
            audio.sample_rate,
            config.segmentation.sample_rate
        );
    }

    let waveforms = audio.samples.insert_axis(Axis(0));
    let scores = model.forward(waveforms.view())?;
    let item_scores = scores.index_axis(Axis(0), 0);

    let grid = model.receptive_field();
    let report = SegmentReport {
        source: args.wav.display().to_string(),
        dimension: model.dimension(),
        num_frames: item_scores.nrows(),
        frame_duration: grid.duration(),
        frame_step: grid.step(),
        scores: args
            .full
            .then(|| item_scores.rows().into_iter().map(|row| row.to_vec()).collect()),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}
