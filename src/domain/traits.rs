// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop depends on these traits rather than on
// concrete loaders or writers, so tests can swap in in-memory
// implementations.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::image_pair::{FloatImage, PairFiles};

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can list (low-light, reference) pairs.
/// Decoding is left to the dataset, one pair at a time.
///
/// Implementations:
///   - PairedDirLoader → reads `low/` and `high/` directories
pub trait PairSource {
    fn pair_files(&self) -> Result<Vec<PairFiles>>;
}

// ─── SampleSink ───────────────────────────────────────────────────────────────
/// Receives enhanced validation outputs on sampling epochs.
///
/// Implementations:
///   - SampleWriter → writes PNG files
pub trait SampleSink {
    /// `index` is the 1-based position of the sample in the
    /// validation pass.
    fn save(&self, epoch: usize, index: usize, image: &FloatImage) -> Result<()>;
}
