//! FFT plumbing shared by the analysis helpers.
//!
//! Thin wrapper around `rustfft` plus the axis bookkeeping every spectral
//! routine needs: zero-centered reordering and the matching frequency axis.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use crate::types::IQSample;

/// Cached FFT plans for a fixed transform size.
pub struct FftProcessor {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl FftProcessor {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of exactly `size` samples. Unnormalized, matching
    /// the usual DFT convention.
    pub fn fft(&self, samples: &[IQSample]) -> Vec<IQSample> {
        let mut buf = samples.to_vec();
        self.fft_inplace(&mut buf);
        buf
    }

    /// In-place forward transform.
    pub fn fft_inplace(&self, buf: &mut [IQSample]) {
        self.forward.process(buf);
    }

    /// Inverse transform, normalized by 1/N so `ifft(fft(x))` returns `x`.
    pub fn ifft(&self, spectrum: &[IQSample]) -> Vec<IQSample> {
        let mut buf = spectrum.to_vec();
        self.inverse.process(&mut buf);
        let scale = 1.0 / self.size as f64;
        for s in &mut buf {
            *s *= scale;
        }
        buf
    }

    /// Reorder a spectrum so the zero-frequency bin sits at the center of
    /// the axis. Handles even and odd lengths.
    pub fn fft_shift<T: Copy>(data: &[T]) -> Vec<T> {
        let n = data.len();
        let split = n.div_ceil(2);
        let mut shifted = Vec::with_capacity(n);
        shifted.extend_from_slice(&data[split..]);
        shifted.extend_from_slice(&data[..split]);
        shifted
    }

    /// Zero-centered frequency axis for an `n`-point transform at
    /// `sample_rate`: monotonically increasing, spacing `sample_rate / n`,
    /// aligned with [`FftProcessor::fft_shift`] output.
    pub fn centered_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
        let step = sample_rate / n as f64;
        let half = (n / 2) as i64;
        (0..n).map(|i| (i as i64 - half) as f64 * step).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_shift_even() {
        assert_eq!(FftProcessor::fft_shift(&[0, 1, 2, 3]), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_fft_shift_odd() {
        assert_eq!(
            FftProcessor::fft_shift(&[0, 1, 2, 3, 4]),
            vec![3, 4, 0, 1, 2]
        );
    }

    #[test]
    fn test_centered_frequencies_even() {
        let freqs = FftProcessor::centered_frequencies(4, 4.0);
        assert_eq!(freqs, vec![-2.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_centered_frequencies_odd() {
        let freqs = FftProcessor::centered_frequencies(5, 5.0);
        assert_eq!(freqs, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ifft_round_trip() {
        let proc = FftProcessor::new(8);
        let signal: Vec<IQSample> = (0..8)
            .map(|n| IQSample::new((n as f64 * 0.7).sin(), (n as f64 * 0.3).cos()))
            .collect();
        let spectrum = proc.fft(&signal);
        let recovered = proc.ifft(&spectrum);
        for (a, b) in signal.iter().zip(&recovered) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
