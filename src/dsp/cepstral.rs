// Cepstral module - DCT basis and time derivatives
//
// References:
// - Davis, S. & Mermelstein, P. (1980). Comparison of parametric representations
//   for monosyllabic word recognition in continuously spoken sentences
// - Young, S. et al. The HTK Book, section 5.6 (delta coefficients)

use ndarray::{Array2, ArrayView2};

/// Half-width of the regression window used for derivatives
pub const DELTA_WINDOW: usize = 2;

/// Orthonormal DCT-II basis
///
/// Row k holds `cos(pi / n * (i + 0.5) * k)` scaled so that the basis is
/// orthonormal. Cepstra are `basis.dot(log_mel)`.
///
/// # Returns
/// Basis with shape (num_coefs, num_filters)
pub fn dct_basis(num_coefs: usize, num_filters: usize) -> Array2<f64> {
    let n = num_filters as f64;
    Array2::from_shape_fn((num_coefs, num_filters), |(k, i)| {
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        scale * (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos()
    })
}

/// Regression derivative of each column over time (rows are frames)
///
/// `d[t] = sum_n n * (c[t+n] - c[t-n]) / (2 * sum_n n^2)` for n in 1..=DELTA_WINDOW,
/// with the first and last frames replicated at the edges.
pub fn deltas(features: ArrayView2<f64>) -> Array2<f64> {
    let (num_frames, dim) = features.dim();
    let mut output = Array2::<f64>::zeros((num_frames, dim));
    if num_frames == 0 {
        return output;
    }

    let denominator: f64 = 2.0 * (1..=DELTA_WINDOW).map(|n| (n * n) as f64).sum::<f64>();
    let last = num_frames - 1;

    for t in 0..num_frames {
        for n in 1..=DELTA_WINDOW {
            let ahead = (t + n).min(last);
            let behind = t.saturating_sub(n);
            for d in 0..dim {
                output[[t, d]] += n as f64 * (features[[ahead, d]] - features[[behind, d]]);
            }
        }
    }

    output.mapv_inplace(|v| v / denominator);
    output
}
