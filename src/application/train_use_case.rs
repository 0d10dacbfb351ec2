// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: List train pairs             (Layer 4 - data)
//   Step 3: List or split validation     (Layer 4 - data)
//   Step 4: Build datasets               (Layer 4 - data)
//   Step 5: Save config                  (Layer 6 - infra)
//   Step 6: Run training loop            (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::PairDataset,
    loader::PairedDirLoader,
    preprocessor::ImagePreprocessor,
    splitter::split_train_val,
};
use crate::domain::traits::PairSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::LossHistory};
use crate::ml::model::{LlieConfig, Upsampling, DOWNSAMPLE_FACTOR};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a training run, passed explicitly into the loop.
// Serialisable so it can be saved next to the checkpoints and
// reloaded to rebuild the same architecture for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Dataset root containing train/{low,high} and optionally test/{low,high}
    pub data_dir:       String,
    pub checkpoint_dir: String,
    /// Where sample validation outputs are written
    pub output_dir:     String,
    /// Images are resized to resolution × resolution; must be divisible by 8
    pub resolution:     usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    /// DataLoader prefetch workers
    pub num_workers:    usize,
    /// Seeds parameter init, the train loader shuffle and the fallback split
    pub seed:           u64,
    /// Persist validation outputs every N epochs (0 disables)
    pub sample_every:   usize,
    /// Validation share when the dataset has no test/ split
    pub val_fraction:   f64,
    pub image_channels: usize,
    pub base_channels:  usize,
    pub upsampling:     Upsampling,
    pub non_local:      bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data/LOLdataset".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            output_dir:     "output_images".to_string(),
            resolution:     256,
            batch_size:     32,
            epochs:         30,
            lr:             1e-3,
            num_workers:    4,
            seed:           42,
            sample_every:   10,
            val_fraction:   0.2,
            image_channels: 3,
            base_channels:  64,
            upsampling:     Upsampling::Transposed,
            non_local:      true,
        }
    }
}

impl TrainConfig {
    /// Architecture described by this config.
    pub fn model_config(&self) -> LlieConfig {
        LlieConfig::new(self.upsampling)
            .with_image_channels(self.image_channels)
            .with_base_channels(self.base_channels)
            .with_non_local(self.non_local)
    }

    pub fn preprocessor(&self) -> ImagePreprocessor {
        ImagePreprocessor::new(self.resolution, self.image_channels)
    }

    /// Reject configurations the network or loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 || self.resolution % DOWNSAMPLE_FACTOR != 0 {
            bail!(
                "resolution {} must be a positive multiple of {}",
                self.resolution,
                DOWNSAMPLE_FACTOR
            );
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.base_channels == 0 {
            bail!("base_channels must be at least 1");
        }
        if !matches!(self.image_channels, 1 | 3) {
            bail!("image_channels must be 1 or 3, got {}", self.image_channels);
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must be in [0, 1), got {}", self.val_fraction);
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<LossHistory> {
        let cfg = &self.config;

        // ── Step 1: Validate configuration ────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: List training pairs ───────────────────────────────────────
        let train_loader = PairedDirLoader::new(&cfg.data_dir, "train");
        let train_pairs  = train_loader.pair_files()?;

        // ── Step 3: Validation pairs — test/ split or a seeded holdout ───────
        let test_loader = PairedDirLoader::new(&cfg.data_dir, "test");
        let (train_pairs, val_pairs) = if test_loader.exists() {
            (train_pairs, test_loader.pair_files()?)
        } else {
            tracing::info!(
                "No test split under '{}'; holding out {:.0}% of train",
                cfg.data_dir,
                cfg.val_fraction * 100.0
            );
            split_train_val(train_pairs, 1.0 - cfg.val_fraction, cfg.seed)
        };

        if train_pairs.is_empty() {
            bail!("no training pairs found under '{}'", cfg.data_dir);
        }
        if val_pairs.is_empty() {
            tracing::warn!("Validation set is empty; val_loss will be NaN");
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_pairs.len(),
            val_pairs.len()
        );

        // ── Step 4: Build Burn datasets (decoded lazily by the workers) ──────
        let preprocessor  = cfg.preprocessor();
        let train_dataset = PairDataset::new(train_pairs, preprocessor);
        let val_dataset   = PairDataset::new(val_pairs, preprocessor);
        let [c, h, w]     = train_dataset.sample_shape();
        tracing::info!(
            "Datasets ready: {} train / {} val samples of {}x{}x{}",
            train_dataset.sample_count(),
            val_dataset.sample_count(),
            c, h, w
        );

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::test_rng;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.resolution, 256);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.epochs, 30);
        assert_eq!(cfg.sample_every, 10);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model_config().stage_channels(), [64, 128, 256, 512]);
    }

    #[test]
    fn test_resolution_must_be_divisible_by_eight() {
        let cfg = TrainConfig { resolution: 100, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let cfg = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_dir:       dir.path().join("nothing").display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_end_to_end_run_without_test_split() {
        let _rng = test_rng::lock();
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("lol");
        for sub in ["low", "high"] {
            std::fs::create_dir_all(data.join("train").join(sub)).unwrap();
        }
        for i in 0..5u8 {
            let name = format!("{i}.png");
            image::RgbImage::from_pixel(10, 10, image::Rgb([i * 10; 3]))
                .save(data.join("train/low").join(&name))
                .unwrap();
            image::RgbImage::from_pixel(10, 10, image::Rgb([200; 3]))
                .save(data.join("train/high").join(&name))
                .unwrap();
        }

        let cfg = TrainConfig {
            data_dir:       data.display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            output_dir:     dir.path().join("samples").display().to_string(),
            resolution:     8,
            batch_size:     2,
            epochs:         2,
            num_workers:    0,
            sample_every:   2,
            base_channels:  4,
            ..TrainConfig::default()
        };
        let history = TrainUseCase::new(cfg).execute().unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.train_losses().iter().all(|l| l.is_finite()));
        // 20% of 5 pairs held out for validation
        assert!(dir.path().join("samples/output_2_1.png").exists());
        assert!(!dir.path().join("samples/output_1_1.png").exists());
        assert!(dir.path().join("ckpt/train_config.json").exists());
        assert!(dir.path().join("ckpt/metrics.csv").exists());
    }
}
