// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code for the
// network and its training. The data layer only touches Burn
// through the Dataset and Batcher traits.
//
// What's in this layer:
//
//   blocks.rs     — ConvBlock and ResidualBlock building blocks
//
//   attention.rs  — Channel / spatial attention (CBAM) and the
//                   non-local block used in the bottleneck
//
//   resize.rs     — Matmul-based bilinear upsampling used by the
//                   bilinear decoder variant
//
//   model.rs      — The encoder / bottleneck / decoder autoencoder
//                   and the per-forward skip tensor stack
//
//   trainer.rs    — The epoch loop: train phase (backward pass,
//                   optimiser step) and validate phase (loss only,
//                   periodic sample images)
//
//   inferencer.rs — Loads a checkpoint and enhances single images
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Backend aliases for training and inference
pub mod backend;

/// Shape-preserving attention transforms
pub mod attention;

/// Conv and residual building blocks
pub mod blocks;

/// Differentiable bilinear upsampling
pub mod resize;

/// Low-light enhancement autoencoder
pub mod model;

/// Train + validation loop with loss bookkeeping
pub mod trainer;

/// Inference engine — loads checkpoint and enhances an image
pub mod inferencer;
