// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `enhance`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Upsampling;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the enhancement network on paired low/high images
    Train(TrainArgs),

    /// Enhance a single image with a trained checkpoint
    Enhance(EnhanceArgs),
}

/// Decoder upsampling strategy, as spelled on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsamplingArg {
    /// Learned transposed convolutions
    Transposed,
    /// Fixed bilinear resize followed by a 3×3 convolution
    Bilinear,
}

impl From<UpsamplingArg> for Upsampling {
    fn from(arg: UpsamplingArg) -> Self {
        match arg {
            UpsamplingArg::Transposed => Upsampling::Transposed,
            UpsamplingArg::Bilinear   => Upsampling::Bilinear,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root with train/{low,high} and optionally test/{low,high}
    #[arg(long, default_value = "data/LOLdataset")]
    pub data_dir: String,

    /// Directory for checkpoints, train_config.json and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for validation sample images
    #[arg(long, default_value = "output_images")]
    pub output_dir: String,

    /// Square training resolution; must be divisible by 8
    #[arg(long, default_value_t = 256)]
    pub resolution: usize,

    /// Number of image pairs processed together in one step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Background workers preparing batches (0 = load on the loop thread)
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    /// Seed for weight init, shuffling and the fallback split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Save validation outputs every N epochs (0 disables)
    #[arg(long, default_value_t = 10)]
    pub sample_every: usize,

    /// Validation share when the dataset has no test/ split
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// 3 for RGB, 1 for grayscale
    #[arg(long, default_value_t = 3)]
    pub image_channels: usize,

    /// Width of the first encoder stage; later stages double it
    #[arg(long, default_value_t = 64)]
    pub base_channels: usize,

    #[arg(long, value_enum, default_value_t = UpsamplingArg::Transposed)]
    pub upsampling: UpsamplingArg,

    /// Skip the non-local block in the bottleneck
    #[arg(long)]
    pub no_non_local: bool,
}

/// Convert CLI args into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            output_dir:     a.output_dir,
            resolution:     a.resolution,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            num_workers:    a.num_workers,
            seed:           a.seed,
            sample_every:   a.sample_every,
            val_fraction:   a.val_fraction,
            image_channels: a.image_channels,
            base_channels:  a.base_channels,
            upsampling:     a.upsampling.into(),
            non_local:      !a.no_non_local,
        }
    }
}

/// All arguments for the `enhance` command.
#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Image to enhance
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the enhanced image (format from extension)
    #[arg(long)]
    pub output: PathBuf,

    /// Directory containing train_config.json and checkpoint files
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["llie", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();
        assert_eq!(cfg.resolution, def.resolution);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.epochs, def.epochs);
        assert_eq!(cfg.lr, def.lr);
        assert_eq!(cfg.upsampling, def.upsampling);
        assert!(cfg.non_local);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "llie", "train",
            "--upsampling", "bilinear",
            "--no-non-local",
            "--resolution", "128",
            "--epochs", "2",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.upsampling, Upsampling::Bilinear);
        assert!(!cfg.non_local);
        assert_eq!(cfg.resolution, 128);
        assert_eq!(cfg.epochs, 2);
    }

    #[test]
    fn test_enhance_requires_paths() {
        assert!(Cli::try_parse_from(["llie", "enhance"]).is_err());
        let cli = Cli::try_parse_from(["llie", "enhance", "--input", "a.png", "--output", "b.png"]).unwrap();
        assert!(matches!(cli.command, Commands::Enhance(_)));
    }
}
