//! EfficientNet Classification Example
//!
//! Classifies one or more images with a pretrained EfficientNet checkpoint
//! exported to ONNX.
//!
//! Usage:
//! ```
//! cargo run --example classify -- --model-root <models_dir> --model-file model.onnx --labels <labels_dir> <image_paths>...
//! ```
//!
//! The model root must contain one directory per checkpoint (`B0`, `B1`, ...)
//! holding the exported ONNX graph. The default file name is the TensorFlow.js
//! `model.json`, so pass `--model-file model.onnx`. Pass `--batch` to classify
//! all images in parallel.

use clap::Parser;
use efficientnet::core::init_tracing;
use efficientnet::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Command-line arguments for the classification example
#[derive(Parser)]
#[command(name = "classify")]
#[command(about = "EfficientNet Classification Example - top-k labels for images")]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Checkpoint ordinal, 0 (B0) to 7 (B7)
    #[arg(long)]
    checkpoint: Option<u8>,

    /// Directory holding B0..B7 model directories
    #[arg(short, long)]
    model_root: Option<PathBuf>,

    /// File name of the graph inside each checkpoint directory
    #[arg(long)]
    model_file: Option<String>,

    /// Directory of {locale}.json label tables
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Number of predictions per image
    #[arg(short = 'k', long)]
    top_k: Option<i64>,

    /// Label locale
    #[arg(long)]
    locale: Option<String>,

    /// Use the symmetric [-1, 1] pixel normalization
    #[arg(long)]
    symmetric: bool,

    /// Classify all images in parallel
    #[arg(short, long)]
    batch: bool,

    /// Image file paths to process
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn build_config(args: &Args) -> EffNetResult<EfficientNetConfig> {
    let mut config = match &args.config {
        Some(path) => EfficientNetConfig::from_json_file(path)?,
        None => EfficientNetConfig::default(),
    };
    if let Some(checkpoint) = args.checkpoint {
        config.checkpoint = checkpoint;
    }
    if let Some(root) = &args.model_root {
        config.local_model_root = Some(root.clone());
    }
    if let Some(file) = &args.model_file {
        config.model_file_name = file.clone();
    }
    if let Some(labels) = &args.labels {
        config.labels_dir = Some(labels.clone());
    }
    if args.symmetric {
        config.normalization = PixelNormalization::Symmetric;
    }
    config.validate()?;
    Ok(config)
}

fn display(path: &Path, result: &Classification) {
    info!("{}", path.display());
    for (rank, prediction) in result.iter().enumerate() {
        info!(
            "   {}. {} (class {}, score {:.4})",
            rank + 1,
            prediction.label,
            prediction.class_id,
            prediction.score
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let config = build_config(&args)?;

    let model = EfficientNetModel::from_config(&config)?;
    info!(
        "EfficientNet {} at {}x{} from {}",
        config.checkpoint()?,
        model.resolution(),
        model.resolution(),
        model.source()
    );

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} loading [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );
    let observer = |percent: f32| pb.set_position(percent.round() as u64);
    if let Err(e) = model.load_with_progress(&observer) {
        pb.abandon();
        error!("Failed to load model: {}", e);
        return Err(e.into());
    }
    pb.finish_and_clear();

    let requests: Vec<InferenceRequest> = args
        .images
        .iter()
        .map(|path| {
            let mut request = InferenceRequest::new(path.as_path());
            if let Some(k) = args.top_k {
                request = request.top_k(k);
            }
            if let Some(locale) = &args.locale {
                request = request.locale(locale.clone());
            }
            request
        })
        .collect();

    let results = if args.batch {
        info!("Batch classification for {} images...", requests.len());
        model.inference_batch(requests)
    } else {
        requests
            .into_iter()
            .map(|request| model.inference(request))
            .collect()
    };

    let mut failures = 0;
    for (path, result) in args.images.iter().zip(results) {
        match result {
            Ok(classification) => display(path, &classification),
            Err(e) => {
                failures += 1;
                error!("Classification failed for {}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} image(s) failed").into());
    }
    Ok(())
}
