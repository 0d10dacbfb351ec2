// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to one business layer:
//
//   checkpoint.rs — Saving and loading model weights with Burn's
//                   CompactRecorder, plus the TrainConfig JSON
//                   needed to rebuild the model for inference.
//
//   metrics.rs    — Per-epoch loss bookkeeping (accumulator and
//                   history) and the CSV metrics log.
//
//   samples.rs    — PNG writer for validation sample images.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Loss accumulation, history and CSV logging
pub mod metrics;

/// Validation sample image persistence
pub mod samples;
