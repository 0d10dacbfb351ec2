// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<Inner> so gradients are tracked;
// `model.valid()` drops back to Inner for validation and
// inference (BatchNorm then uses its running estimates).
//
// CPU (NdArray) by default, WGPU with `--features wgpu`.

use burn::prelude::Backend;

#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;

pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

pub type Device = <InnerBackend as Backend>::Device;

pub fn default_device() -> Device {
    Device::default()
}

// ─── Test RNG Guard ───────────────────────────────────────────────────────────
// Parameter init and `Tensor::random` draw from one process-wide RNG.
// Tests that consume it hold this lock so a seeded test sees the same
// stream no matter which other tests run in parallel.
#[cfg(test)]
pub(crate) mod test_rng {
    use std::sync::{Mutex, MutexGuard};

    static RNG_LOCK: Mutex<()> = Mutex::new(());

    pub fn lock() -> MutexGuard<'static, ()> {
        // A panicking holder (should_panic tests) must not poison the rest
        RNG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
