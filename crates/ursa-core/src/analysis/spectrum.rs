//! Spectral Estimation
//!
//! Power and voltage spectra of captured blocks, reported on a
//! zero-centered, monotonically increasing frequency axis (DC in the
//! middle). Two evaluation paths are supported:
//!
//! - **fft**: radix FFT on the native N-point grid
//! - **dft**: direct evaluation on a grid densified by an oversampling
//!   factor, placing bins between the FFT grid points
//!
//! The canonical definitions used throughout are power = |X(f)|² and
//! voltage = |X(f)|, both in linear units. Frequency resolution is always
//! `sample_rate / N` for an N-sample block; oversampling refines the grid,
//! not the resolution.

use std::str::FromStr;

use crate::error::AnalysisError;
use crate::fft_utils::FftProcessor;
use crate::types::{IQSample, SampleBuffer};

/// Evaluation path for the spectral estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumMode {
    /// Radix FFT on the native grid.
    #[default]
    Fft,
    /// Direct DFT on an oversampled grid.
    Dft,
}

impl SpectrumMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectrumMode::Fft => "fft",
            SpectrumMode::Dft => "dft",
        }
    }
}

impl FromStr for SpectrumMode {
    type Err = AnalysisError;

    /// Exactly `"fft"` and `"dft"` are recognized; anything else is an
    /// error, never a silent default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fft" => Ok(SpectrumMode::Fft),
            "dft" => Ok(SpectrumMode::Dft),
            other => Err(AnalysisError::InvalidMode(other.to_string())),
        }
    }
}

/// What the spectrum values measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumScale {
    /// |X(f)|²
    Power,
    /// |X(f)|
    Voltage,
}

impl SpectrumScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectrumScale::Power => "power",
            SpectrumScale::Voltage => "voltage",
        }
    }
}

/// Configuration for [`SpectralEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    /// Evaluation path.
    pub mode: SpectrumMode,
    /// Subtract the block mean before transforming. Off by default; the DC
    /// bin is part of the measurement unless explicitly removed.
    pub remove_dc: bool,
    /// Frequency-grid densification factor for `dft` mode (1 = native
    /// grid). Ignored by `fft` mode.
    pub oversampling: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            mode: SpectrumMode::Fft,
            remove_dc: false,
            oversampling: 1,
        }
    }
}

impl SpectrumConfig {
    pub fn with_mode(mut self, mode: SpectrumMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_remove_dc(mut self, remove_dc: bool) -> Self {
        self.remove_dc = remove_dc;
        self
    }

    pub fn with_oversampling(mut self, oversampling: usize) -> Self {
        self.oversampling = oversampling;
        self
    }
}

/// A spectral peak: frequency, value at that bin, and the bin index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub value: f64,
    pub bin: usize,
}

/// Result of spectral estimation over one block.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Frequency axis in Hz: zero-centered, monotonically increasing.
    pub frequencies: Vec<f64>,
    /// Spectrum values per bin, linear units per `scale`.
    pub values: Vec<f64>,
    /// Power (|X|²) or voltage (|X|).
    pub scale: SpectrumScale,
    /// Sample rate of the analyzed block in Hz.
    pub sample_rate: f64,
    /// `sample_rate / N` for the N-sample input block.
    pub freq_resolution: f64,
}

impl Spectrum {
    /// Global maximum. Ties resolve to the lowest bin index.
    pub fn peak(&self) -> SpectralPeak {
        let mut bin = 0;
        let mut best = f64::NEG_INFINITY;
        for (i, &v) in self.values.iter().enumerate() {
            if v > best {
                best = v;
                bin = i;
            }
        }
        SpectralPeak {
            frequency: self.frequencies[bin],
            value: best,
            bin,
        }
    }

    /// Maximum restricted to `[min_freq, max_freq]` (either side open when
    /// `None`). Returns `None` when no bin falls inside the band.
    pub fn peak_in_band(&self, min_freq: Option<f64>, max_freq: Option<f64>) -> Option<SpectralPeak> {
        let lo = min_freq.unwrap_or(f64::NEG_INFINITY);
        let hi = max_freq.unwrap_or(f64::INFINITY);

        let mut found: Option<SpectralPeak> = None;
        for (i, (&f, &v)) in self.frequencies.iter().zip(&self.values).enumerate() {
            if f < lo || f > hi {
                continue;
            }
            match found {
                Some(ref best) if v <= best.value => {}
                _ => {
                    found = Some(SpectralPeak {
                        frequency: f,
                        value: v,
                        bin: i,
                    })
                }
            }
        }
        found
    }

    /// Full width at half maximum around the global peak: walk outward
    /// while bins stay at or above half the peak value. `None` when the
    /// peak does not extend past its own bin.
    pub fn fwhm(&self) -> Option<f64> {
        let peak = self.peak();
        let half = peak.value / 2.0;

        let mut lower = peak.bin;
        while lower > 0 && self.values[lower - 1] >= half {
            lower -= 1;
        }

        let mut upper = peak.bin;
        while upper + 1 < self.values.len() && self.values[upper + 1] >= half {
            upper += 1;
        }

        if upper == lower {
            None
        } else {
            Some(self.frequencies[upper] - self.frequencies[lower])
        }
    }

    /// Format as a text summary with the strongest bins.
    pub fn to_text(&self) -> String {
        let peak = self.peak();
        let mut output = String::new();
        output.push_str(&format!(
            "Spectrum ({} scale, {} bins)\n",
            self.scale.as_str(),
            self.values.len()
        ));
        output.push_str(&format!(
            "Sample rate: {:.0} Hz, Resolution: {:.2} Hz\n",
            self.sample_rate, self.freq_resolution
        ));
        output.push_str(&format!(
            "Peak: {:.2} Hz ({:.6e})\n",
            peak.frequency, peak.value
        ));
        output.push_str("─".repeat(50).as_str());
        output.push('\n');
        output.push_str("  Frequency (Hz)         Value\n");
        output.push_str("─".repeat(50).as_str());
        output.push('\n');

        // Top 20 bins by value
        let mut indices: Vec<usize> = (0..self.values.len()).collect();
        indices.sort_by(|&a, &b| self.values[b].total_cmp(&self.values[a]));

        for &i in indices.iter().take(20) {
            output.push_str(&format!(
                "{:>14.2}    {:>12.6e}\n",
                self.frequencies[i], self.values[i]
            ));
        }

        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        let peak = self.peak();
        format!(
            r#"{{
  "scale": "{}",
  "sample_rate": {},
  "freq_resolution": {},
  "peak_frequency_hz": {},
  "peak_value": {},
  "frequencies": {:?},
  "values": {:?}
}}"#,
            self.scale.as_str(),
            self.sample_rate,
            self.freq_resolution,
            peak.frequency,
            peak.value,
            self.frequencies,
            self.values
        )
    }

    /// Format as CSV.
    pub fn to_csv(&self) -> String {
        let mut output = format!("frequency_hz,{}\n", self.scale.as_str());
        for (freq, value) in self.frequencies.iter().zip(&self.values) {
            output.push_str(&format!("{},{}\n", freq, value));
        }
        output
    }
}

/// Fold a real tone at `freq` into the first Nyquist zone `[0, fs/2]`.
/// This is where an undersampled tone shows up in the measured spectrum.
pub fn fold_frequency(freq: f64, sample_rate: f64) -> f64 {
    let r = freq.abs() % sample_rate;
    if r > sample_rate / 2.0 {
        sample_rate - r
    } else {
        r
    }
}

/// Spectral estimator over captured blocks.
#[derive(Debug, Clone, Default)]
pub struct SpectralEstimator {
    config: SpectrumConfig,
}

impl SpectralEstimator {
    /// Estimator with the default configuration (fft mode, DC kept).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SpectrumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Power spectrum |X(f)|².
    pub fn power(
        &self,
        samples: &SampleBuffer,
        sample_rate: f64,
    ) -> Result<Spectrum, AnalysisError> {
        self.compute(samples, sample_rate, SpectrumScale::Power)
    }

    /// Voltage spectrum |X(f)|.
    pub fn voltage(
        &self,
        samples: &SampleBuffer,
        sample_rate: f64,
    ) -> Result<Spectrum, AnalysisError> {
        self.compute(samples, sample_rate, SpectrumScale::Voltage)
    }

    fn compute(
        &self,
        samples: &SampleBuffer,
        sample_rate: f64,
        scale: SpectrumScale,
    ) -> Result<Spectrum, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyInput("spectrum"));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if self.config.oversampling == 0 {
            return Err(AnalysisError::InvalidOversampling);
        }

        let mut block = samples.to_complex();
        if self.config.remove_dc {
            let mean = block.iter().sum::<IQSample>() / block.len() as f64;
            for s in &mut block {
                *s -= mean;
            }
        }

        let n = block.len();
        let (frequencies, magnitudes) = match self.config.mode {
            SpectrumMode::Fft => {
                let processor = FftProcessor::new(n);
                let spectrum = processor.fft(&block);
                let mags: Vec<f64> = spectrum.iter().map(|s| s.norm()).collect();
                (
                    FftProcessor::centered_frequencies(n, sample_rate),
                    FftProcessor::fft_shift(&mags),
                )
            }
            SpectrumMode::Dft => {
                let grid = n * self.config.oversampling;
                let dt = 1.0 / sample_rate;
                // Time axis centered on the block midpoint
                let times: Vec<f64> =
                    (0..n).map(|i| (i as f64 - n as f64 / 2.0) * dt).collect();
                let step = sample_rate / grid as f64;
                let frequencies: Vec<f64> = (0..grid)
                    .map(|k| -sample_rate / 2.0 + k as f64 * step)
                    .collect();
                let mags: Vec<f64> = frequencies
                    .iter()
                    .map(|&f| {
                        let mut acc = IQSample::new(0.0, 0.0);
                        for (x, &t) in block.iter().zip(&times) {
                            let phase = -2.0 * std::f64::consts::PI * f * t;
                            acc += x * IQSample::new(phase.cos(), phase.sin());
                        }
                        acc.norm()
                    })
                    .collect();
                (frequencies, mags)
            }
        };

        let values = match scale {
            SpectrumScale::Power => magnitudes.iter().map(|&m| m * m).collect(),
            SpectrumScale::Voltage => magnitudes,
        };

        Ok(Spectrum {
            frequencies,
            values,
            scale,
            sample_rate,
            freq_resolution: sample_rate / n as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(freq: f64, sample_rate: f64, n: usize) -> SampleBuffer {
        SampleBuffer::Real(
            (0..n)
                .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
                .collect(),
        )
    }

    #[test]
    fn test_single_tone_peak_fft() {
        let fs = 100_000.0;
        let spectrum = SpectralEstimator::new()
            .power(&sine_block(10_000.0, fs, 4096), fs)
            .unwrap();

        // Real tone: symmetric peaks at ±f; |peak| within one bin of f
        let peak = spectrum.peak();
        assert!(
            (peak.frequency.abs() - 10_000.0).abs() <= spectrum.freq_resolution,
            "peak at {} Hz",
            peak.frequency
        );
    }

    #[test]
    fn test_axis_is_zero_centered_and_increasing() {
        let fs = 1000.0;
        let spectrum = SpectralEstimator::new()
            .power(&sine_block(100.0, fs, 256), fs)
            .unwrap();

        assert_eq!(spectrum.frequencies.len(), 256);
        assert_eq!(spectrum.frequencies[128], 0.0);
        assert!((spectrum.frequencies[0] + fs / 2.0).abs() < 1e-9);
        for w in spectrum.frequencies.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert!((spectrum.freq_resolution - fs / 256.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_is_voltage_squared() {
        let fs = 8000.0;
        let block = sine_block(1000.0, fs, 512);
        let estimator = SpectralEstimator::new();
        let power = estimator.power(&block, fs).unwrap();
        let voltage = estimator.voltage(&block, fs).unwrap();

        for (p, v) in power.values.iter().zip(&voltage.values) {
            assert!((p - v * v).abs() < 1e-6 * (1.0 + p.abs()));
        }
    }

    #[test]
    fn test_dc_offset_kept_unless_removed() {
        let fs = 1000.0;
        let block = SampleBuffer::Real(vec![1.0; 64]);

        let kept = SpectralEstimator::new().power(&block, fs).unwrap();
        let dc_bin = kept.frequencies.iter().position(|&f| f == 0.0).unwrap();
        // All energy in the DC bin: |sum|^2 = 64^2
        assert!((kept.values[dc_bin] - 4096.0).abs() < 1e-6);

        let removed = SpectralEstimator::with_config(
            SpectrumConfig::default().with_remove_dc(true),
        )
        .power(&block, fs)
        .unwrap();
        assert!(removed.values[dc_bin].abs() < 1e-9);
    }

    #[test]
    fn test_dft_matches_fft_on_native_grid() {
        let fs = 4096.0;
        let block = sine_block(512.0, fs, 64);
        let fft = SpectralEstimator::new().power(&block, fs).unwrap();
        let dft = SpectralEstimator::with_config(
            SpectrumConfig::default().with_mode(SpectrumMode::Dft),
        )
        .power(&block, fs)
        .unwrap();

        assert_eq!(dft.values.len(), 64);
        // Same grid, same magnitudes (phases differ; the time axis is
        // block-centered in dft mode)
        for (a, b) in fft.values.iter().zip(&dft.values) {
            assert!((a - b).abs() < 1e-6 * (1.0 + a.abs()), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_dft_oversampled_grid() {
        let fs = 1000.0;
        let n = 128;
        let m = 4;
        let spectrum = SpectralEstimator::with_config(
            SpectrumConfig::default()
                .with_mode(SpectrumMode::Dft)
                .with_oversampling(m),
        )
        .power(&sine_block(100.0, fs, n), fs)
        .unwrap();

        let grid = n * m;
        assert_eq!(spectrum.values.len(), grid);
        assert!((spectrum.frequencies[0] + fs / 2.0).abs() < 1e-9);
        let last = *spectrum.frequencies.last().unwrap();
        let expected_last = fs / 2.0 * (1.0 - 2.0 / grid as f64);
        assert!((last - expected_last).abs() < 1e-9);
        // Resolution reflects the block length, not the dense grid
        assert!((spectrum.freq_resolution - fs / n as f64).abs() < 1e-12);

        let peak = spectrum.peak();
        assert!((peak.frequency.abs() - 100.0).abs() <= spectrum.freq_resolution);
    }

    #[test]
    fn test_invalid_mode_string() {
        let err = "welch".parse::<SpectrumMode>().unwrap_err();
        assert_eq!(err, AnalysisError::InvalidMode("welch".into()));
        assert_eq!("fft".parse::<SpectrumMode>().unwrap(), SpectrumMode::Fft);
        assert_eq!("dft".parse::<SpectrumMode>().unwrap(), SpectrumMode::Dft);
        // Case and whitespace are not forgiven
        assert!("FFT".parse::<SpectrumMode>().is_err());
    }

    #[test]
    fn test_rejects_empty_and_bad_rate() {
        let estimator = SpectralEstimator::new();
        assert_eq!(
            estimator
                .power(&SampleBuffer::Real(vec![]), 1000.0)
                .unwrap_err(),
            AnalysisError::EmptyInput("spectrum")
        );
        assert!(matches!(
            estimator
                .power(&SampleBuffer::Real(vec![1.0]), 0.0)
                .unwrap_err(),
            AnalysisError::InvalidSampleRate(_)
        ));
        assert_eq!(
            SpectralEstimator::with_config(SpectrumConfig::default().with_oversampling(0))
                .power(&SampleBuffer::Real(vec![1.0]), 1000.0)
                .unwrap_err(),
            AnalysisError::InvalidOversampling
        );
    }

    #[test]
    fn test_peak_in_band() {
        let fs = 1000.0;
        let spectrum = SpectralEstimator::new()
            .power(&sine_block(200.0, fs, 512), fs)
            .unwrap();

        // Restricting to positive frequencies picks the +200 Hz image
        let peak = spectrum.peak_in_band(Some(0.0), None).unwrap();
        assert!((peak.frequency - 200.0).abs() <= spectrum.freq_resolution);

        assert!(spectrum.peak_in_band(Some(2000.0), Some(3000.0)).is_none());
    }

    #[test]
    fn test_fold_frequency() {
        assert!((fold_frequency(10_000.0, 100_000.0) - 10_000.0).abs() < 1e-9);
        assert!((fold_frequency(10_000.0, 12_000.0) - 2_000.0).abs() < 1e-9);
        assert!((fold_frequency(7_000.0, 12_000.0) - 5_000.0).abs() < 1e-9);
        assert!((fold_frequency(25_000.0, 12_000.0) - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_aliased_tone_folds() {
        // 10 kHz tone sampled at 12 kHz lands at 2 kHz
        let fs = 12_000.0;
        let spectrum = SpectralEstimator::new()
            .power(&sine_block(10_000.0, fs, 4096), fs)
            .unwrap();
        let peak = spectrum.peak();
        assert!(
            (peak.frequency.abs() - 2_000.0).abs() <= spectrum.freq_resolution,
            "folded peak at {} Hz",
            peak.frequency
        );
    }

    #[test]
    fn test_iq_tone_single_sided() {
        // Complex exponential: one peak, at +f only
        let fs = 10_000.0;
        let block = SampleBuffer::Iq(
            (0..1024)
                .map(|n| {
                    let phase = 2.0 * std::f64::consts::PI * 1500.0 * n as f64 / fs;
                    IQSample::new(phase.cos(), phase.sin())
                })
                .collect(),
        );
        let spectrum = SpectralEstimator::new().power(&block, fs).unwrap();
        let peak = spectrum.peak();
        assert!((peak.frequency - 1500.0).abs() <= spectrum.freq_resolution);

        // Mirror image is far down
        let mirror = spectrum
            .peak_in_band(Some(-1600.0), Some(-1400.0))
            .unwrap();
        assert!(mirror.value < peak.value * 1e-3);
    }

    #[test]
    fn test_fwhm_spans_the_peak() {
        let fs = 1000.0;
        let spectrum = SpectralEstimator::new()
            // Half-bin tone: adjacent bins share the peak, so the
            // half-maximum region spans more than one bin
            .power(&sine_block(103.5, fs, 256), fs)
            .unwrap();
        let width = spectrum.fwhm().unwrap();
        assert!(width >= spectrum.freq_resolution);
        assert!(width < 20.0 * spectrum.freq_resolution);
    }

    #[test]
    fn test_csv_and_json_render() {
        let fs = 1000.0;
        let spectrum = SpectralEstimator::new()
            .power(&sine_block(100.0, fs, 64), fs)
            .unwrap();
        let csv = spectrum.to_csv();
        assert!(csv.starts_with("frequency_hz,power\n"));
        assert_eq!(csv.lines().count(), 65);
        let json = spectrum.to_json();
        assert!(json.contains("\"peak_frequency_hz\""));
    }
}
