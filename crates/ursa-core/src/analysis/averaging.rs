//! SNR vs. Averaging
//!
//! Sweep of the spectrum-averaging depth over a multi-block noise capture.
//! For each depth the per-block power spectra of the first `depth` blocks
//! are averaged bin by bin, and the reported SNR estimate is the ratio
//! max / std over the averaged spectrum, a coarse peak-to-fluctuation
//! figure that grows like √depth on white noise.

use crate::analysis::spectrum::SpectralEstimator;
use crate::error::AnalysisError;
use crate::types::SampleBuffer;

/// Averaging depths attempted, in order. The sweep uses the longest
/// prefix that fits the available block count.
pub const DEPTHS: [usize; 5] = [1, 2, 4, 8, 16];

/// Result of an SNR-vs-averaging sweep.
#[derive(Debug, Clone)]
pub struct AveragingSweep {
    /// Depths actually used: a prefix of `[1, 2, 4, 8, 16]`.
    pub depths: Vec<usize>,
    /// SNR estimate per depth (max / std of the averaged spectrum).
    pub snr: Vec<f64>,
    /// Zero-centered frequency axis shared by all averaged spectra.
    pub frequencies: Vec<f64>,
    /// Averaged power spectrum at each depth.
    pub spectra: Vec<Vec<f64>>,
    /// Sample rate of the capture in Hz.
    pub sample_rate: f64,
}

impl AveragingSweep {
    /// Format as a text table.
    pub fn to_text(&self) -> String {
        let mut output = format!(
            "SNR vs. Averaging ({} depths, {}-bin spectra)\n",
            self.depths.len(),
            self.frequencies.len()
        );
        output.push_str("─".repeat(40).as_str());
        output.push('\n');
        output.push_str("  Depth       SNR      Gain\n");
        output.push_str("─".repeat(40).as_str());
        output.push('\n');
        let base = self.snr.first().copied().unwrap_or(1.0);
        for (depth, snr) in self.depths.iter().zip(&self.snr) {
            output.push_str(&format!(
                "{:>6}    {:>8.2}    {:>5.2}x\n",
                depth,
                snr,
                snr / base
            ));
        }
        output
    }

    /// Format as CSV.
    pub fn to_csv(&self) -> String {
        let mut output = String::from("depth,snr\n");
        for (depth, snr) in self.depths.iter().zip(&self.snr) {
            output.push_str(&format!("{},{}\n", depth, snr));
        }
        output
    }
}

/// Run the sweep over the equal-length blocks of one capture.
pub fn snr_vs_averaging(
    blocks: &[&[f64]],
    sample_rate: f64,
) -> Result<AveragingSweep, AnalysisError> {
    if blocks.is_empty() {
        return Err(AnalysisError::EmptyInput("averaging sweep"));
    }
    let block_len = blocks[0].len();
    if block_len == 0 {
        return Err(AnalysisError::EmptyInput("averaging sweep block"));
    }
    for block in blocks {
        if block.len() != block_len {
            return Err(AnalysisError::ShapeMismatch {
                expected: block_len,
                actual: block.len(),
            });
        }
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(AnalysisError::InvalidSampleRate(sample_rate));
    }

    let depths: Vec<usize> = DEPTHS
        .iter()
        .copied()
        .take_while(|&d| d <= blocks.len())
        .collect();
    let deepest = depths.last().copied().unwrap_or(1);

    let estimator = SpectralEstimator::new();
    let mut per_block = Vec::with_capacity(deepest);
    for block in &blocks[..deepest] {
        let spectrum = estimator.power(&SampleBuffer::Real(block.to_vec()), sample_rate)?;
        per_block.push(spectrum);
    }

    let frequencies = per_block[0].frequencies.clone();
    let nbins = frequencies.len();

    let mut snr = Vec::with_capacity(depths.len());
    let mut spectra = Vec::with_capacity(depths.len());
    for &depth in &depths {
        let mut avg = vec![0.0; nbins];
        for spectrum in &per_block[..depth] {
            for (a, v) in avg.iter_mut().zip(&spectrum.values) {
                *a += v;
            }
        }
        for a in &mut avg {
            *a /= depth as f64;
        }

        let max = avg.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let n = avg.len() as f64;
        let mean = avg.iter().sum::<f64>() / n;
        let var = avg.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        // Peak-to-fluctuation ratio over the averaged spectrum
        snr.push(max / var.sqrt());
        spectra.push(avg);
    }

    Ok(AveragingSweep {
        depths,
        snr,
        frequencies,
        spectra,
        sample_rate,
    })
}
