// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from image files on disk to tensor batches.
//
//   low/ + high/ directories
//       │
//       ▼
//   PairedDirLoader    → pairs files by name, checks headers
//       │
//       ▼
//   split_train_val    → only when there is no test/ split
//       │
//       ▼
//   PairDataset        → implements Burn's Dataset trait; get()
//       │                 runs ImagePreprocessor: decode, resize
//       │                 to R×R, scale to [0, 1]
//       ▼
//   PairBatcher        → stacks pairs into [N, C, R, R] tensors
//       │
//       ▼
//   DataLoader         → worker threads feed the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Lists paired images in the LOL directory layout
pub mod loader;

/// Image decode / resize / normalise and the reverse conversion
pub mod preprocessor;

/// Implements Burn's Dataset trait for image pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
