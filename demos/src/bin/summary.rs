//! FPN Generator Summary
//!
//! Builds one of the deblurring generators, runs a random batch through it and
//! reports the parameter count, backbone level shapes and output range.
//!
//! ## Usage
//!
//! ```bash
//! # Default MobileNet generator at 256x256
//! cargo run --bin summary
//!
//! # GhostNet v4 generator on a 736x1312 frame
//! cargo run --bin summary -- --generator fpn_ghostnet_v4 --height 736 --width 1312
//!
//! # Load a configuration and a Burn record, then save the result
//! cargo run --bin summary -- --config generator.json --weights model.mpk --save copy.mpk
//! ```

use std::{fs, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::{Distribution, ElementConversion},
};
use clap::Parser;
use deblurgan_burn::{FpnGeneratorConfig, Generator, ModelConfig};
use deblurgan_demos::{create_device, get_backend_name, SelectedBackend};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generator override: fpn_mobilenet, fpn_ghostnet_v2 or fpn_ghostnet_v4
    #[arg(short, long)]
    generator: Option<String>,

    /// Input height, a multiple of 32
    #[arg(long, default_value = "256")]
    height: usize,

    /// Input width, a multiple of 32
    #[arg(long, default_value = "256")]
    width: usize,

    /// Batch size
    #[arg(short, long, default_value = "1")]
    batch: usize,

    /// Let gradients reach the backbone
    #[arg(long)]
    unfreeze: bool,

    /// Burn record (.mpk) to load into the generator
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Where to save the generator record
    #[arg(short, long)]
    save: Option<PathBuf>,
}

const DEFAULT_LOG_FILTER: &str = "deblurgan_burn=info";

/// `RUST_LOG` directives when set and valid, otherwise [`DEFAULT_LOG_FILTER`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        serde_json::from_str::<ModelConfig>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
    } else {
        ModelConfig::new()
    };

    if let Some(name) = &args.generator {
        config.generator = Generator::from_name(name)?;
    }

    let device = create_device();
    println!("Using backend: {}", get_backend_name());

    let mut model = FpnGeneratorConfig::new(config)
        .init::<SelectedBackend>(&device)
        .context("Failed to build generator")?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();

    if let Some(weights) = &args.weights {
        println!("Loading weights from: {}", weights.display());
        model = model
            .load_file(weights.clone(), &recorder, &device)
            .with_context(|| format!("Failed to load weights: {}", weights.display()))?;
    }

    if args.unfreeze {
        model = model.unfreeze();
    }

    println!("Generator: {}", model.generator_name());
    println!("Parameters: {}", model.num_params());
    println!(
        "Backbone: {}",
        if model.is_backbone_frozen() {
            "frozen"
        } else {
            "trainable"
        }
    );

    let input = Tensor::<SelectedBackend, 4>::random(
        [args.batch, 3, args.height, args.width],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    );

    let levels = model.forward_encoder(input.clone())?;
    for (index, level) in levels.iter().enumerate() {
        println!("  enc{index}: {:?}", level.dims());
    }

    let start = Instant::now();
    let output = model.forward(input)?;
    let min = output.clone().min().into_scalar().elem::<f32>();
    let max = output.clone().max().into_scalar().elem::<f32>();
    println!(
        "Output: {:?} in [{min:.3}, {max:.3}] ({:.2?})",
        output.dims(),
        start.elapsed()
    );

    if let Some(save_path) = &args.save {
        model
            .save_file(save_path.clone(), &recorder)
            .with_context(|| format!("Failed to save record: {}", save_path.display()))?;
        println!("Saved record to: {}", save_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default_level() {
        let filter = log_filter(Some("deblurgan_burn=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_default_log_filter() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }
}
