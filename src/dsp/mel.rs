// Mel module - mel scale and triangular filterbanks
//
// Filters are computed on the continuous frequency of each FFT bin rather
// than on rounded bin indices, so narrow low-frequency filters never vanish
// for large FFT sizes.

use ndarray::Array2;

/// Convert frequency in Hz to mel scale (HTK formula)
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel scale to frequency in Hz (HTK formula)
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank
///
/// # Arguments
/// * `num_filters` - Number of mel filters
/// * `num_bins` - Number of one-sided FFT bins (fft_size / 2 + 1)
/// * `sample_rate` - Sample rate in Hz
/// * `f_min` - Lower edge of the first filter in Hz
/// * `f_max` - Upper edge of the last filter in Hz (clamped to Nyquist)
///
/// # Returns
/// Filter weights with shape (num_filters, num_bins)
pub fn mel_filterbank(
    num_filters: usize,
    num_bins: usize,
    sample_rate: u32,
    f_min: f64,
    f_max: f64,
) -> Array2<f64> {
    let nyquist = sample_rate as f64 / 2.0;
    let f_max = f_max.min(nyquist);
    let mut filters = Array2::<f64>::zeros((num_filters, num_bins));
    if num_filters == 0 || num_bins < 2 {
        return filters;
    }

    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max);

    // num_filters + 2 points: each filter spans three consecutive points
    let hz_points: Vec<f64> = (0..num_filters + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (num_filters + 1) as f64))
        .collect();

    let bin_hz = nyquist / (num_bins - 1) as f64;

    for m in 0..num_filters {
        let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        for k in 0..num_bins {
            let freq = k as f64 * bin_hz;
            let rising = (freq - left) / (center - left);
            let falling = (right - freq) / (right - center);
            filters[[m, k]] = rising.min(falling).max(0.0);
        }
    }

    filters
}
