// ============================================================
// Layer 3 — Image Domain Types
// ============================================================
// A FloatImage is a planar (CHW) buffer of intensities in [0, 1],
// the layout the network consumes. An ImagePair couples a
// low-light capture with its well-exposed reference. PairFiles
// is the same pair before decoding: just the two locations.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Planar float image, channel-major: index = (c · H + y) · W + x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatImage {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
    pub pixels:   Vec<f32>,
}

impl FloatImage {
    /// # Panics
    /// Panics if `pixels.len() != channels * height * width`.
    pub fn new(channels: usize, height: usize, width: usize, pixels: Vec<f32>) -> Self {
        assert_eq!(
            pixels.len(),
            channels * height * width,
            "pixel buffer does not match {channels}x{height}x{width}",
        );
        Self { channels, height, width, pixels }
    }

    /// An image where every pixel has the same intensity.
    pub fn filled(channels: usize, height: usize, width: usize, value: f32) -> Self {
        Self::new(channels, height, width, vec![value; channels * height * width])
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// Interleaved (HWC) 8-bit pixels, the layout image encoders expect.
    /// Values are clamped to [0, 1] and scaled by 255 with truncation.
    pub fn to_interleaved_u8(&self) -> Vec<u8> {
        let plane = self.height * self.width;
        let mut out = Vec::with_capacity(self.pixels.len());
        for p in 0..plane {
            for c in 0..self.channels {
                let v = self.pixels[c * plane + p];
                out.push((v.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }
        out
    }

    /// Inverse of `to_interleaved_u8`: HWC bytes → planar [0, 1] floats.
    pub fn from_interleaved_u8(channels: usize, height: usize, width: usize, bytes: &[u8]) -> Self {
        let plane = height * width;
        let mut pixels = vec![0.0f32; channels * plane];
        for (i, &b) in bytes.iter().enumerate().take(channels * plane) {
            let p = i / channels;
            let c = i % channels;
            pixels[c * plane + p] = b as f32 / 255.0;
        }
        Self::new(channels, height, width, pixels)
    }
}

/// A low-light input and its ground-truth reference.
/// Both images always have the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePair {
    /// File name shared by both images — kept for traceability
    pub name:   String,
    pub input:  FloatImage,
    pub target: FloatImage,
}

impl ImagePair {
    /// # Panics
    /// Panics if input and target shapes differ.
    pub fn new(name: impl Into<String>, input: FloatImage, target: FloatImage) -> Self {
        assert_eq!(input.shape(), target.shape(), "input and target shapes differ");
        Self { name: name.into(), input, target }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.input.shape()
    }
}

/// Where a low-light image and its reference live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFiles {
    pub name: String,
    pub low:  PathBuf,
    pub high: PathBuf,
}
