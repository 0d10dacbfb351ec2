// ============================================================
// Layer 2 — Enhance Use Case
// ============================================================
// Loads the trained network once, then brightens single images:
//   1. Rebuild the model from the checkpoint directory
//   2. Decode the input image
//   3. Run the enhancer (resize → forward → resize back)
//   4. Encode the result next to, or instead of, the input

use anyhow::{Context, Result};
use std::path::Path;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Enhancer;

pub struct EnhanceUseCase {
    enhancer: Enhancer,
}

impl EnhanceUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt     = CheckpointManager::new(checkpoint_dir)?;
        let enhancer = Enhancer::from_checkpoint(&ckpt)?;
        Ok(Self { enhancer })
    }

    pub fn enhance_file(&self, input: &Path, output: &Path) -> Result<()> {
        let img = image::open(input)
            .with_context(|| format!("Cannot read image '{}'", input.display()))?;

        let enhanced = self.enhancer.enhance(&img)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        enhanced
            .save(output)
            .with_context(|| format!("Cannot write image '{}'", output.display()))?;

        tracing::info!("Enhanced '{}' → '{}'", input.display(), output.display());
        Ok(())
    }
}
