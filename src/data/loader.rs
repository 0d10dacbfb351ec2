// ============================================================
// Layer 4 — Paired Image Loader
// ============================================================
// Loads (low-light, reference) pairs from the LOL dataset layout:
//
//   <root>/
//     train/
//       low/    1.png 2.png ...   ← dark captures
//       high/   1.png 2.png ...   ← well-exposed references
//     test/
//       low/  high/
//
// Files are paired by name and only their headers are read here;
// full decoding happens in PairDataset::get on the DataLoader
// workers. A low-light image without a reference (or with an
// unreadable header) is skipped with a warning instead of failing
// the whole listing.
//
// Reference: image crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::image_pair::PairFiles;
use crate::domain::traits::PairSource;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Lists every pair under `<root>/<split>/{low,high}`.
pub struct PairedDirLoader {
    low_dir:  PathBuf,
    high_dir: PathBuf,
}

impl PairedDirLoader {
    pub fn new(root: impl AsRef<Path>, split: &str) -> Self {
        let split_dir = root.as_ref().join(split);
        Self {
            low_dir:  split_dir.join("low"),
            high_dir: split_dir.join("high"),
        }
    }

    /// True if both `low/` and `high/` exist for this split.
    pub fn exists(&self) -> bool {
        self.low_dir.is_dir() && self.high_dir.is_dir()
    }

    fn check_pair(&self, low_path: &Path, name: &str) -> Result<PairFiles> {
        let high_path = self.high_dir.join(name);
        if !high_path.exists() {
            bail!("no reference image '{}'", high_path.display());
        }
        for path in [low_path, high_path.as_path()] {
            image::image_dimensions(path)
                .with_context(|| format!("Cannot read header of '{}'", path.display()))?;
        }
        Ok(PairFiles {
            name: name.to_string(),
            low:  low_path.to_path_buf(),
            high: high_path,
        })
    }
}

impl PairSource for PairedDirLoader {
    fn pair_files(&self) -> Result<Vec<PairFiles>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.low_dir)
            .with_context(|| format!("Cannot read directory '{}'", self.low_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();

        // read_dir order is platform dependent
        paths.sort();

        let mut pairs = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match self.check_pair(&path, name) {
                Ok(files) => pairs.push(files),
                Err(e) => tracing::warn!("Skipping '{}': {:#}", path.display(), e),
            }
        }

        tracing::info!(
            "Found {} image pairs in '{}'",
            pairs.len(),
            self.low_dir.display()
        );
        Ok(pairs)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(path: &Path, value: u8) {
        RgbImage::from_pixel(12, 12, Rgb([value; 3])).save(path).unwrap();
    }

    fn make_split(root: &Path, split: &str) -> (PathBuf, PathBuf) {
        let low  = root.join(split).join("low");
        let high = root.join(split).join("high");
        fs::create_dir_all(&low).unwrap();
        fs::create_dir_all(&high).unwrap();
        (low, high)
    }

    #[test]
    fn test_lists_pairs_by_name_in_sorted_order() {
        let root        = tempfile::tempdir().unwrap();
        let (low, high) = make_split(root.path(), "train");
        for (name, v) in [("b.png", 20), ("a.png", 10)] {
            write_png(&low.join(name), v);
            write_png(&high.join(name), 200);
        }

        let loader = PairedDirLoader::new(root.path(), "train");
        let pairs  = loader.pair_files().unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].name, "a.png");
        assert_eq!(pairs[1].name, "b.png");
        assert_eq!(pairs[0].low, low.join("a.png"));
        assert_eq!(pairs[0].high, high.join("a.png"));
    }

    #[test]
    fn test_skips_unpaired_unreadable_and_non_image_files() {
        let root        = tempfile::tempdir().unwrap();
        let (low, high) = make_split(root.path(), "test");
        write_png(&low.join("paired.png"), 5);
        write_png(&high.join("paired.png"), 250);
        write_png(&low.join("orphan.png"), 5);
        fs::write(low.join("broken.png"), "not a png").unwrap();
        write_png(&high.join("broken.png"), 250);
        fs::write(low.join("notes.txt"), "not an image").unwrap();

        let loader = PairedDirLoader::new(root.path(), "test");
        let pairs  = loader.pair_files().unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "paired.png");
    }

    #[test]
    fn test_missing_split_directory() {
        let root   = tempfile::tempdir().unwrap();
        let loader = PairedDirLoader::new(root.path(), "test");
        assert!(!loader.exists());
        assert!(loader.pair_files().is_err());
    }
}
