// Temporal module - time-domain features
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description

/// Compute zero-crossing rate (ZCR) of one frame
///
/// Formula: ZCR = (1 / (N - 1)) × #{n : sign(x[n]) != sign(x[n-1])}
///
/// High ZCR indicates high-frequency or noise-like content.
/// Low ZCR indicates low-frequency or tonal content.
///
/// # Returns
/// Zero-crossing rate (0.0 to 1.0)
pub fn zero_crossing_rate(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }

    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[1] >= 0.0 && pair[0] < 0.0) || (pair[1] < 0.0 && pair[0] >= 0.0))
        .count();

    // Normalize by signal length
    crossings as f64 / (frame.len() - 1) as f64
}
