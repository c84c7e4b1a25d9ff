//! Matched-filter primitives for blink classification.
//!
//! A blink shows up in a pupil-confidence trace as a sharp dip: high
//! confidence, then low while the eyelid covers the pupil, then high again.
//! Correlating the trace against a step kernel (+1/n taps followed by -1/n
//! taps) turns each edge of that dip into a signed response peak, which the
//! streaming and batch detectors threshold into onset/offset events.

/// Normalizes filter responses so a full-swing confidence edge maps to ~1.
///
/// The raw dot product of a unit step against the kernel peaks at 0.5, so
/// dividing by 0.45 leaves a small margin above 1.0 for clean edges.
pub const RESPONSE_SCALE: f64 = 0.45;

/// Builds the step kernel for a window of `size` samples.
///
/// The first half (rounding down) holds `+1/size`, the rest `-1/size`; an
/// odd `size` puts the extra tap on the negative side. Taps sum to zero for
/// even sizes, so a constant signal produces zero response.
pub fn blink_kernel(size: usize) -> Vec<f64> {
    debug_assert!(size >= 2, "kernel needs at least two taps");

    let tap = 1.0 / size as f64;
    (0..size)
        .map(|i| if i < size / 2 { tap } else { -tap })
        .collect()
}

/// Correlates a window of confidence values against the step kernel.
///
/// Returns the scaled response: positive when the newer half of the window
/// is lower than the older half (confidence falling), negative when it is
/// higher (confidence recovering).
pub fn matched_filter(values: &[f64]) -> f64 {
    debug_assert!(values.len() >= 2, "window needs at least two samples");

    let kernel = blink_kernel(values.len());
    let raw: f64 = values
        .iter()
        .zip(kernel.iter())
        .map(|(value, tap)| value * tap)
        .sum();
    raw / RESPONSE_SCALE
}

/// Discrete convolution truncated to the input length ("same" mode).
///
/// Matches the centered slice of the full convolution: `output[i]` is
/// `full[i + (len-1)/2]` where `len` is the kernel length. The output always
/// has `signal.len()` entries, even for kernels longer than the signal.
/// Convolution reverses the kernel, so against `blink_kernel` this computes
/// mean(upcoming samples) minus mean(preceding samples) at each position.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let m = signal.len();
    let n = kernel.len();
    if m == 0 || n == 0 {
        return vec![0.0; m];
    }

    let start = (n - 1) / 2;
    (0..m)
        .map(|i| {
            let k = i + start;
            let j_begin = (k + 1).saturating_sub(n);
            let j_end = (k + 1).min(m);
            (j_begin..j_end)
                .map(|j| signal[j] * kernel[k - j])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_even_split() {
        let kernel = blink_kernel(20);
        assert_eq!(kernel.len(), 20);
        for tap in &kernel[..10] {
            assert!((tap - 0.05).abs() < 1e-12);
        }
        for tap in &kernel[10..] {
            assert!((tap + 0.05).abs() < 1e-12);
        }
        let sum: f64 = kernel.iter().sum();
        assert!(sum.abs() < 1e-12);
    }

    #[test]
    fn test_kernel_odd_extra_negative_tap() {
        let kernel = blink_kernel(5);
        assert_eq!(kernel, vec![0.2, 0.2, -0.2, -0.2, -0.2]);
        let sum: f64 = kernel.iter().sum();
        assert!((sum + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_constant_signal_even_window_is_silent() {
        let values = vec![0.9; 30];
        assert!(matched_filter(&values).abs() < 1e-12);
    }

    #[test]
    fn test_constant_signal_odd_window_residual() {
        // One extra negative tap leaves a -c/size bias, scaled.
        let values = vec![0.8; 5];
        let expected = -(0.8 / 5.0) / RESPONSE_SCALE;
        assert!((matched_filter(&values) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_full_confidence_drop_peaks_positive() {
        let values = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let response = matched_filter(&values);
        assert!((response - 0.5 / RESPONSE_SCALE).abs() < 1e-12);
        assert!(response > 1.0);
    }

    #[test]
    fn test_full_confidence_recovery_peaks_negative() {
        let values = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let response = matched_filter(&values);
        assert!((response + 0.5 / RESPONSE_SCALE).abs() < 1e-12);
    }

    #[test]
    fn test_convolve_same_matches_reference() {
        // Centered slice of the full convolution, kernel reversed.
        let result = convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        assert_eq!(result.len(), 3);
        assert!((result[0] - 1.0).abs() < 1e-12);
        assert!((result[1] - 2.5).abs() < 1e-12);
        assert!((result[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_convolve_same_identity_kernel() {
        let signal = vec![0.3, 0.7, 0.1, 0.9];
        let result = convolve_same(&signal, &[1.0]);
        assert_eq!(result, signal);
    }

    #[test]
    fn test_convolve_same_kernel_longer_than_signal() {
        let result = convolve_same(&[1.0, 2.0], &[0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_convolve_same_empty_signal() {
        let result = convolve_same(&[], &[1.0, 2.0]);
        assert!(result.is_empty());
    }
}
