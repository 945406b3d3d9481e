//! Fourier-Domain Filtering
//!
//! Band-reject cleanup for captured blocks: zero the FFT bins inside a
//! frequency band and transform back. Used to notch a narrowband
//! interferer out of a noise capture before running statistics on it.

use crate::error::AnalysisError;
use crate::fft_utils::FftProcessor;
use crate::types::IQSample;

/// Zero every FFT bin whose |frequency| falls inside `band` (inclusive
/// edges, Hz) and return the real part of the inverse transform.
pub fn band_reject(
    samples: &[f64],
    sample_rate: f64,
    band: (f64, f64),
) -> Result<Vec<f64>, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::EmptyInput("band reject"));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(AnalysisError::InvalidSampleRate(sample_rate));
    }
    let (low, high) = band;
    if low > high {
        return Err(AnalysisError::InvalidBand { low, high });
    }

    let n = samples.len();
    let processor = FftProcessor::new(n);
    let block: Vec<IQSample> = samples.iter().map(|&x| IQSample::new(x, 0.0)).collect();
    let mut spectrum = processor.fft(&block);

    // Natural bin order: positive frequencies first, negative in the
    // upper half. Both images of a band are zeroed, keeping the output
    // real.
    let step = sample_rate / n as f64;
    let positive = n.div_ceil(2);
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let freq = if k < positive {
            k as f64 * step
        } else {
            (k as f64 - n as f64) * step
        };
        if freq.abs() >= low && freq.abs() <= high {
            *bin = IQSample::new(0.0, 0.0);
        }
    }

    Ok(processor.ifft(&spectrum).iter().map(|s| s.re).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectrum::SpectralEstimator;
    use crate::types::SampleBuffer;

    fn two_tone(n: usize, fs: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * std::f64::consts::PI * 50.0 * t).sin()
                    + (2.0 * std::f64::consts::PI * 200.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_rejects_one_tone_keeps_the_other() {
        let fs = 1000.0;
        let signal = two_tone(1000, fs);
        let filtered = band_reject(&signal, fs, (150.0, 250.0)).unwrap();
        assert_eq!(filtered.len(), signal.len());

        // Both tones sit on exact bins, so the survivor reconstructs
        // sample for sample
        for (i, y) in filtered.iter().enumerate() {
            let t = i as f64 / fs;
            let expected = (2.0 * std::f64::consts::PI * 50.0 * t).sin();
            assert!((y - expected).abs() < 1e-9, "sample {}: {} vs {}", i, y, expected);
        }
    }

    #[test]
    fn test_rejected_band_is_empty_in_spectrum() {
        let fs = 1000.0;
        let signal = two_tone(1000, fs);
        let filtered = band_reject(&signal, fs, (150.0, 250.0)).unwrap();
        let spectrum = SpectralEstimator::new()
            .power(&SampleBuffer::Real(filtered), fs)
            .unwrap();
        let notched = spectrum.peak_in_band(Some(150.0), Some(250.0)).unwrap();
        let kept = spectrum.peak_in_band(Some(40.0), Some(60.0)).unwrap();
        assert!(notched.value < kept.value * 1e-12);
    }

    #[test]
    fn test_full_band_zeroes_everything() {
        let fs = 1000.0;
        let signal = two_tone(256, fs);
        let filtered = band_reject(&signal, fs, (0.0, fs / 2.0)).unwrap();
        assert!(filtered.iter().all(|y| y.abs() < 1e-9));
    }

    #[test]
    fn test_argument_errors() {
        assert_eq!(
            band_reject(&[], 1000.0, (10.0, 20.0)).unwrap_err(),
            AnalysisError::EmptyInput("band reject")
        );
        assert_eq!(
            band_reject(&[1.0], 1000.0, (20.0, 10.0)).unwrap_err(),
            AnalysisError::InvalidBand {
                low: 20.0,
                high: 10.0
            }
        );
        assert!(matches!(
            band_reject(&[1.0], 0.0, (10.0, 20.0)).unwrap_err(),
            AnalysisError::InvalidSampleRate(_)
        ));
    }
}
