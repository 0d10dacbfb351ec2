// ============================================================
// Layer 5 — Bilinear Resize
// ============================================================
// Parameterless bilinear upsampling written as two matmuls
// against fixed interpolation matrices:
//
//   x [B, C, H, W] · Wᵀ [W, W·s]    → rows resized
//   (…)ᵀ        · Hᵀ [H, H·s]    → columns resized
//
// Only matmul, reshape and swap_dims are involved, so the
// backward pass exists on every backend. Sample positions follow
// the align-corners convention: the first and last output pixels
// sit exactly on the first and last input pixels.

use burn::prelude::*;

/// Row-major [n_out, n_in] matrix of linear interpolation weights.
/// Each row sums to 1.
pub fn linear_weights(n_in: usize, n_out: usize) -> Vec<f32> {
    let mut weights = vec![0.0f32; n_out * n_in];
    let step = if n_out > 1 {
        (n_in - 1) as f32 / (n_out - 1) as f32
    } else {
        0.0
    };

    for i in 0..n_out {
        let src  = i as f32 * step;
        let lo   = (src.floor() as usize).min(n_in - 1);
        let hi   = (lo + 1).min(n_in - 1);
        let frac = src - lo as f32;

        weights[i * n_in + lo] += 1.0 - frac;
        weights[i * n_in + hi] += frac;
    }
    weights
}

/// [n_in, n_out] interpolation matrix on `device`, ready to right-multiply.
fn interpolation_matrix<B: Backend>(n_in: usize, n_out: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(linear_weights(n_in, n_out).as_slice(), device)
        .reshape([n_out, n_in])
        .transpose()
}

/// Bilinear ×`scale` upsampling of a [batch, C, H, W] tensor.
pub fn bilinear_upsample<B: Backend>(x: Tensor<B, 4>, scale: usize) -> Tensor<B, 4> {
    if scale == 1 {
        return x;
    }
    let [batch, channels, height, width] = x.dims();
    let (out_h, out_w) = (height * scale, width * scale);
    let device = x.device();

    let cols = interpolation_matrix::<B>(width, out_w, &device);
    let rows = interpolation_matrix::<B>(height, out_h, &device);

    x.reshape([batch * channels * height, width])
        .matmul(cols)                                   // [BCH, W']
        .reshape([batch, channels, height, out_w])
        .swap_dims(2, 3)                                // [B, C, W', H]
        .reshape([batch * channels * out_w, height])
        .matmul(rows)                                   // [BCW', H']
        .reshape([batch, channels, out_w, out_h])
        .swap_dims(2, 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn values(t: Tensor<TestBackend, 4>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_weights_rows_sum_to_one() {
        for (n_in, n_out) in [(1, 2), (2, 4), (3, 6), (4, 8)] {
            let w = linear_weights(n_in, n_out);
            for row in w.chunks_exact(n_in) {
                assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_corners_are_aligned() {
        // [[0, 1], [2, 3]] → 4×4 with samples at 0, 1/3, 2/3, 1
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0, 3.0], &device)
            .reshape([1, 1, 2, 2]);
        let out = bilinear_upsample(x, 2);
        assert_eq!(out.dims(), [1, 1, 4, 4]);

        let v = values(out);
        let expected_top = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        for (got, want) in v[..4].iter().zip(expected_top) {
            assert!((got - want).abs() < 1e-5, "{v:?}");
        }
        assert!((v[12] - 2.0).abs() < 1e-5);
        assert!((v[15] - 3.0).abs() < 1e-5);
        // (1/3, 1/3): 0·4/9 + 1·2/9 + 2·2/9 + 3·1/9 = 1
        assert!((v[5] - 1.0).abs() < 1e-5, "{v:?}");
    }

    #[test]
    fn test_constant_map_stays_constant() {
        let device = Default::default();
        let x   = Tensor::<TestBackend, 4>::full([2, 3, 1, 3], 0.7, &device);
        let out = bilinear_upsample(x, 2);
        assert_eq!(out.dims(), [2, 3, 2, 6]);
        assert!(values(out).iter().all(|v| (v - 0.7).abs() < 1e-6));
    }

    #[test]
    fn test_scale_one_is_identity() {
        let device = Default::default();
        let x   = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device)
            .reshape([1, 1, 2, 2]);
        assert_eq!(values(bilinear_upsample(x, 1)), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_gradient_flows_on_cpu_autodiff() {
        type AdBackend = Autodiff<NdArray>;
        let device = Default::default();
        let x = Tensor::<AdBackend, 4>::ones([1, 2, 2, 2], &device).require_grad();

        let grads = bilinear_upsample(x.clone(), 2).sum().backward();
        let grad  = x.grad(&grads).unwrap();

        // Every output pixel spreads a total weight of 1 over the inputs,
        // so the input gradients sum to the output count per channel.
        let total: f32 = grad.sum().into_scalar().elem();
        assert!((total - 2.0 * 16.0).abs() < 1e-4);
    }
}
