use proptest::prelude::*;

use crate::test::helpers::tensor;
use crate::*;

/// Per-channel `(weight, mean, var, scale, shift)` with positive variance.
fn arb_channels() -> impl Strategy<Value = Vec<(f32, f32, f32, f32, f32)>> {
    prop::collection::vec((-4.0f32..4.0, -2.0f32..2.0, 0.01f32..4.0, -2.0f32..2.0, -2.0f32..2.0), 1..8)
}

proptest! {
    /// A 1x1 convolution of a constant input followed by the normalization
    /// equals the fused convolution applied to the same input.
    #[test]
    fn fused_conv_matches_conv_then_norm(channels in arb_channels(), x in -3.0f32..3.0) {
        let n = channels.len();
        let weight = tensor(&[n, 1], channels.iter().map(|c| c.0).collect());
        let mean = tensor(&[n], channels.iter().map(|c| c.1).collect());
        let var = tensor(&[n], channels.iter().map(|c| c.2).collect());
        let scale = tensor(&[n], channels.iter().map(|c| c.3).collect());
        let shift = tensor(&[n], channels.iter().map(|c| c.4).collect());
        let eps = 1e-5;

        let (w, b) = fuse_affine_params(&weight, None, &mean, &var, eps, Some(&scale), Some(&shift), false).unwrap();
        let w: Vec<f32> = w.iter().copied().collect();
        let b: Vec<f32> = b.iter().copied().collect();

        for (c, &(wc, m, v, s, sh)) in channels.iter().enumerate() {
            let reference = (wc * x - m) / (v + eps as f32).sqrt() * s + sh;
            let fused = w[c] * x + b[c];
            prop_assert!((reference - fused).abs() < 1e-3, "channel {}: {} != {}", c, reference, fused);
        }
    }

    #[test]
    fn fusion_preserves_shapes(channels in 1usize..6, kernel in 1usize..4, transposed in any::<bool>()) {
        let shape = if transposed { [3, channels, kernel, kernel] } else { [channels, 3, kernel, kernel] };
        let weight = tensor(&shape, vec![1.0; 3 * channels * kernel * kernel]);
        let mean = tensor(&[channels], vec![0.0; channels]);
        let var = tensor(&[channels], vec![1.0; channels]);

        let (w, b) = fuse_affine_params(&weight, None, &mean, &var, 1e-5, None, None, transposed).unwrap();
        prop_assert_eq!(w.shape(), weight.shape());
        prop_assert_eq!(b.shape(), &[channels]);
    }
}
