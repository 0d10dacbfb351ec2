// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop driven by a small phase machine:
//
//   Idle → Train(1) → Validate(1) → Train(2) → ... → Validate(N) → Done
//
//   Train(e)    — autodiff backend, BatchNorm uses batch statistics;
//                 forward → MSE → backward → one Adam step per batch
//   Validate(e) — model.valid() on the inner backend, BatchNorm uses
//                 running estimates; forward + loss only. On sampling
//                 epochs every output image is handed to the sink.
//
// Epoch loss = Σ(batch_mean · batch_size) / samples seen, so a short
// final batch is weighted correctly.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, TensorData},
};
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PairBatch, PairBatcher},
    dataset::PairDataset,
};
use crate::domain::image_pair::{FloatImage, ImagePair};
use crate::domain::traits::SampleSink;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{LossAccumulator, LossHistory, MetricsLogger, PhaseLoss},
    samples::SampleWriter,
};
use crate::ml::backend::{default_device, TrainBackend};
use crate::ml::model::LlieModel;

// ─── Phase ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Train(usize),
    Validate(usize),
    Done,
}

impl Phase {
    /// Successor in a run of `epochs` epochs. Done is terminal.
    pub fn next(self, epochs: usize) -> Phase {
        match self {
            Phase::Idle if epochs == 0        => Phase::Done,
            Phase::Idle                       => Phase::Train(1),
            Phase::Train(e)                   => Phase::Validate(e),
            Phase::Validate(e) if e < epochs  => Phase::Train(e + 1),
            Phase::Validate(_) | Phase::Done  => Phase::Done,
        }
    }
}

/// True when outputs of epoch `epoch` (1-based) should be persisted.
pub fn is_sampling_epoch(epoch: usize, sample_every: usize) -> bool {
    sample_every > 0 && epoch % sample_every == 0
}

// ─── Epoch Hooks ──────────────────────────────────────────────────────────────
/// Optional side effects run by the loop. All absent in unit tests.
#[derive(Clone, Copy, Default)]
pub struct EpochHooks<'a> {
    pub samples:     Option<&'a dyn SampleSink>,
    pub metrics:     Option<&'a MetricsLogger>,
    pub checkpoints: Option<&'a CheckpointManager>,
}

// ─── Entry Point ──────────────────────────────────────────────────────────────
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: PairDataset,
    val_dataset:   PairDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<LossHistory> {
    let device = default_device();
    tracing::info!("Using device: {:?}", device);

    TrainBackend::seed(cfg.seed);
    let model: LlieModel<TrainBackend> = cfg.model_config().init(&device);
    tracing::info!(
        "Model ready: {:?} upsampling, channels {:?}, non-local={}",
        cfg.upsampling,
        cfg.model_config().stage_channels(),
        cfg.non_local,
    );

    let samples = SampleWriter::new(&cfg.output_dir);
    let metrics = MetricsLogger::new(ckpt_manager.dir())?;
    let hooks   = EpochHooks {
        samples:     Some(&samples),
        metrics:     Some(&metrics),
        checkpoints: Some(&ckpt_manager),
    };

    let start = Instant::now();
    let (_, history) = train_loop(cfg, model, train_dataset, val_dataset, hooks)?;
    let elapsed = start.elapsed().as_secs();

    println!("Training completed in {}m {}s", elapsed / 60, elapsed % 60);
    if let Some(best) = history.best() {
        tracing::info!("Best epoch {} with val_loss={:.6}", best.epoch, best.val_loss);
    }
    Ok(history)
}

// ─── Epoch Loop ───────────────────────────────────────────────────────────────
/// Runs `cfg.epochs` train/validate rounds over any pair datasets.
pub fn train_loop<B, DT, DV>(
    cfg:           &TrainConfig,
    mut model:     LlieModel<B>,
    train_dataset: DT,
    val_dataset:   DV,
    hooks:         EpochHooks<'_>,
) -> Result<(LlieModel<B>, LossHistory)>
where
    B:  AutodiffBackend,
    DT: Dataset<ImagePair> + 'static,
    DV: Dataset<ImagePair> + 'static,
{

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend, reshuffled each epoch) ─────────
    let mut train_builder = DataLoaderBuilder::new(PairBatcher::<B>::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed);
    if cfg.num_workers > 0 {
        train_builder = train_builder.num_workers(cfg.num_workers);
    }
    let train_loader = train_builder.build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let mut val_builder = DataLoaderBuilder::new(PairBatcher::<B::InnerBackend>::new())
        .batch_size(cfg.batch_size);
    if cfg.num_workers > 0 {
        val_builder = val_builder.num_workers(cfg.num_workers);
    }
    let val_loader = val_builder.build(val_dataset);

    let mut losses  = LossAccumulator::default();
    let mut history = LossHistory::default();
    let mut phase   = Phase::Idle.next(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;

    while phase != Phase::Done {
        match phase {
            Phase::Train(_) => {
                losses.reset();
                model = train_epoch(model, &mut optim, train_loader.iter(), cfg.lr, &mut losses.train);
            }
            Phase::Validate(epoch) => {
                let sink = hooks
                    .samples
                    .filter(|_| is_sampling_epoch(epoch, cfg.sample_every));
                validate_epoch(&model.valid(), val_loader.iter(), epoch, sink, &mut losses.val);

                let metrics = losses.finalize(epoch);
                println!(
                    "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6} | val_psnr={:.2} dB",
                    epoch, cfg.epochs, metrics.train_loss, metrics.val_loss, metrics.val_psnr,
                );

                if metrics.is_improvement(best_val_loss) {
                    best_val_loss = metrics.val_loss;
                    tracing::info!("New best val_loss={:.6} at epoch {}", best_val_loss, epoch);
                }
                if let Some(logger) = hooks.metrics {
                    logger.log(&metrics)?;
                }
                if let Some(ckpt) = hooks.checkpoints {
                    ckpt.save_model(&model, epoch)?;
                    tracing::info!("Checkpoint saved for epoch {}", epoch);
                }
                history.push(metrics);
            }
            Phase::Idle | Phase::Done => {}
        }
        phase = phase.next(cfg.epochs);
    }

    tracing::info!("Training complete!");
    Ok((model, history))
}

// ─── Train Phase ──────────────────────────────────────────────────────────────
/// One pass over `batches` with a single optimiser step per batch.
pub fn train_epoch<B, O>(
    mut model: LlieModel<B>,
    optim:     &mut O,
    batches:   impl Iterator<Item = PairBatch<B>>,
    lr:        f64,
    loss_acc:  &mut PhaseLoss,
) -> LlieModel<B>
where
    B: AutodiffBackend,
    O: Optimizer<LlieModel<B>, B>,
{
    for batch in batches {
        let batch_size = batch.len();
        let output     = model.forward(batch.inputs);
        let loss       = reconstruction_loss(output, batch.targets);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        loss_acc.add(loss_val, batch_size);

        // Backward pass + Adam update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(lr, model, grads);
    }
    model
}

// ─── Validate Phase ───────────────────────────────────────────────────────────
/// Forward + loss only. When `sink` is set, every output image is
/// saved with a 1-based index running across the whole pass.
/// Sample persistence never fails the pass.
pub fn validate_epoch<B: Backend>(
    model:    &LlieModel<B>,
    batches:  impl Iterator<Item = PairBatch<B>>,
    epoch:    usize,
    sink:     Option<&dyn SampleSink>,
    loss_acc: &mut PhaseLoss,
) {
    let mut next_index = 1;

    for batch in batches {
        let batch_size = batch.len();
        let output     = model.forward(batch.inputs);

        let loss_val: f64 = reconstruction_loss(output.clone(), batch.targets)
            .into_scalar()
            .elem::<f64>();
        loss_acc.add(loss_val, batch_size);

        if let Some(sink) = sink {
            save_samples(sink, epoch, next_index, output);
        }
        next_index += batch_size;
    }
}

/// Mean squared error over every element of the batch.
pub fn reconstruction_loss<B: Backend>(output: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    MseLoss::new().forward(output, target, Reduction::Mean)
}

fn save_samples<B: Backend>(
    sink:        &dyn SampleSink,
    epoch:       usize,
    first_index: usize,
    outputs:     Tensor<B, 4>,
) {
    let dims = outputs.dims();
    save_sample_data(sink, epoch, first_index, dims, outputs.into_data().convert::<f32>());
}

// A failed write loses diagnostic images, not the run
fn save_sample_data(
    sink:        &dyn SampleSink,
    epoch:       usize,
    first_index: usize,
    dims:        [usize; 4],
    data:        TensorData,
) {
    let [_, channels, height, width] = dims;
    let values = match data.to_vec::<f32>() {
        Ok(values) => values,
        Err(err) => {
            tracing::warn!("Could not read outputs of epoch {} for sampling: {:?}", epoch, err);
            return;
        }
    };

    for (offset, pixels) in values.chunks_exact(channels * height * width).enumerate() {
        let index = first_index + offset;
        let image = FloatImage::new(channels, height, width, pixels.to_vec());

        if let Err(err) = sink.save(epoch, index, &image) {
            tracing::warn!("Could not save sample {} of epoch {}: {:#}", index, epoch, err);
        }
    }
}
