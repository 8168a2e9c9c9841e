//! FFT-based full-mode cross-correlation.
//!
//! Pure functions, no I/O. The correlation of a target against the reference
//! is computed as the linear convolution of the target with the reversed
//! reference, so index `n` of the output corresponds to a lag of
//! `n - (reference.len() - 1)` samples.

use rustfft::{num_complex::Complex, FftPlanner};

/// Peak of a correlation sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationPeak {
    /// Index into the correlation sequence.
    pub index: usize,
    /// Absolute value at that index.
    pub magnitude: f64,
}

/// Full linear cross-correlation `conv(target, reverse(reference))`.
///
/// Output length is `target.len() + reference.len() - 1`; empty when either
/// input is empty. Cost is O((Nr + Nt) log(Nr + Nt)).
pub fn cross_correlate_full(target: &[f64], reference: &[f64]) -> Vec<f64> {
    if target.is_empty() || reference.is_empty() {
        return Vec::new();
    }

    let correlation_len = target.len() + reference.len() - 1;
    let fft_len = correlation_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut target_complex: Vec<Complex<f64>> =
        target.iter().map(|&x| Complex::new(x, 0.0)).collect();
    target_complex.resize(fft_len, Complex::new(0.0, 0.0));

    let mut reversed_complex: Vec<Complex<f64>> = reference
        .iter()
        .rev()
        .map(|&x| Complex::new(x, 0.0))
        .collect();
    reversed_complex.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut target_complex);
    fft.process(&mut reversed_complex);

    // Plain product: convolution, not correlation, since the reference is already reversed
    let mut product: Vec<Complex<f64>> = target_complex
        .iter()
        .zip(reversed_complex.iter())
        .map(|(a, b)| a * b)
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    product
        .iter()
        .take(correlation_len)
        .map(|c| c.re * scale)
        .collect()
}

/// Relative slack under which two FFT correlation values count as equal.
const TIE_TOLERANCE: f64 = 1e-9;
/// Absolute slack for values near zero.
const TIE_FLOOR: f64 = 1e-12;

/// Find the index of the largest absolute value.
///
/// Values within FFT round-off of the running best are ties, and ties resolve
/// to the lowest index. Returns `None` for an empty sequence or when every
/// value is NaN.
pub fn find_abs_peak(correlation: &[f64]) -> Option<CorrelationPeak> {
    let mut best: Option<CorrelationPeak> = None;
    for (index, value) in correlation.iter().enumerate() {
        let magnitude = value.abs();
        if magnitude.is_nan() {
            continue;
        }
        match best {
            Some(peak) if magnitude <= peak.magnitude * (1.0 + TIE_TOLERANCE) + TIE_FLOOR => {}
            _ => best = Some(CorrelationPeak { index, magnitude }),
        }
    }
    best
}

/// Normalize a raw peak by the geometric mean of both signal energies.
///
/// Returns a value in `[0, 1]` for real signals, 0.0 when either is silent.
pub fn normalized_peak(peak_magnitude: f64, target_energy: f64, reference_energy: f64) -> f64 {
    let norm = (target_energy * reference_energy).sqrt();
    if norm > 1e-12 {
        (peak_magnitude / norm).min(1.0)
    } else {
        0.0
    }
}
