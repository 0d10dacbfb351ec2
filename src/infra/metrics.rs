// ============================================================
// Layer 6 — Loss Bookkeeping and Metrics Logger
// ============================================================
// PhaseLoss        — running (Σ loss·batch_size, Σ batch_size) for
//                    one phase; its mean is the per-sample loss
// LossAccumulator  — train + validation PhaseLoss, reset per epoch
// EpochMetrics     — the finalised numbers for one epoch
// LossHistory      — every EpochMetrics of the run, in order
// MetricsLogger    — appends each epoch to a CSV file
//
// Example CSV output:
//   epoch,train_loss,val_loss,val_psnr
//   1,0.062100,0.058300,12.343500
//   2,0.041900,0.040100,13.968200
//
// How to read the metrics:
//   - Loss should decrease each epoch (model is learning)
//   - If val_loss increases while train_loss decreases → overfitting
//   - PSNR (dB) rises as the enhanced images approach the references
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

// ─── PhaseLoss ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseLoss {
    sum:     f64,
    samples: usize,
}

impl PhaseLoss {
    /// Add one batch; `batch_mean` is the mean loss over its samples.
    pub fn add(&mut self, batch_mean: f64, batch_size: usize) {
        self.sum     += batch_mean * batch_size as f64;
        self.samples += batch_size;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Mean per-sample loss; NaN when the phase saw no data.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            f64::NAN
        } else {
            self.sum / self.samples as f64
        }
    }
}

// ─── LossAccumulator ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct LossAccumulator {
    pub train: PhaseLoss,
    pub val:   PhaseLoss,
}

impl LossAccumulator {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn finalize(&self, epoch: usize) -> EpochMetrics {
        EpochMetrics::new(epoch, self.train.mean(), self.val.mean())
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of metrics for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean per-sample MSE over the training set
    pub train_loss: f64,

    /// Mean per-sample MSE over the validation set
    pub val_loss: f64,

    /// Peak signal-to-noise ratio (dB) of the validation MSE
    pub val_psnr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss, val_psnr: psnr(val_loss) }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// PSNR for pixel values in [0, 1]: 10 · log10(1 / mse).
pub fn psnr(mse: f64) -> f64 {
    -10.0 * mse.log10()
}

// ─── LossHistory ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossHistory {
    epochs: Vec<EpochMetrics>,
}

impl LossHistory {
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.train_loss).collect()
    }

    /// Epoch with the lowest validation loss.
    pub fn best(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .filter(|m| !m.val_loss.is_nan())
            .min_by(|a, b| a.val_loss.total_cmp(&b.val_loss))
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet,
    /// so repeated runs append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,val_psnr")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_psnr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
