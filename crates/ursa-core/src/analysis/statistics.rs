//! Noise Statistics
//!
//! Descriptive statistics and Gaussianity checks for noise captures:
//! moments, extremes, RMS, a density histogram with its plug-in Gaussian
//! curve, plus small helpers for clipping artifacts and ADC level
//! occupancy.

use crate::error::AnalysisError;

/// Descriptive statistics of one real block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseStats {
    /// Number of samples analyzed.
    pub num_samples: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Population variance (`std²`).
    pub variance: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Root mean square, DC included.
    pub rms: f64,
}

impl NoiseStats {
    /// Compute statistics for the given block.
    pub fn compute(samples: &[f64]) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyInput("noise statistics"));
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;

        let mut sum_sq = 0.0;
        let mut sum_dev_sq = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &x in samples {
            sum_sq += x * x;
            let d = x - mean;
            sum_dev_sq += d * d;
            min = min.min(x);
            max = max.max(x);
        }

        let variance = sum_dev_sq / n;
        Ok(Self {
            num_samples: samples.len(),
            mean,
            std: variance.sqrt(),
            variance,
            min,
            max,
            rms: (sum_sq / n).sqrt(),
        })
    }

    /// Format as a text table.
    pub fn to_text(&self) -> String {
        let mut output = format!("Noise Statistics ({} samples)\n", self.num_samples);
        output.push_str("─".repeat(30).as_str());
        output.push('\n');
        output.push_str(&format!("  Mean:       {:>12.6}\n", self.mean));
        output.push_str(&format!("  Std dev:    {:>12.6}\n", self.std));
        output.push_str(&format!("  Variance:   {:>12.6}\n", self.variance));
        output.push_str(&format!("  Min:        {:>12.6}\n", self.min));
        output.push_str(&format!("  Max:        {:>12.6}\n", self.max));
        output.push_str(&format!("  RMS:        {:>12.6}\n", self.rms));
        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        format!(
            r#"{{
  "num_samples": {},
  "mean": {},
  "std": {},
  "variance": {},
  "min": {},
  "max": {},
  "rms": {}
}}"#,
            self.num_samples, self.mean, self.std, self.variance, self.min, self.max, self.rms
        )
    }
}

/// Density histogram of a block together with the Gaussian implied by the
/// block's own mean and standard deviation.
///
/// This is a plug-in fit: the moments are the parameters, no optimizer
/// runs. A noise source that is actually Gaussian makes `density` and
/// `curve` agree; a clipped or biased one visibly does not.
#[derive(Debug, Clone)]
pub struct GaussianFit {
    /// Bin centers (midpoints of equal-width bins spanning min..max).
    pub bin_centers: Vec<f64>,
    /// Density-normalized counts; integrates to 1 over the bins.
    pub density: Vec<f64>,
    /// Raw counts per bin.
    pub counts: Vec<u64>,
    /// Gaussian density evaluated at the bin centers.
    pub curve: Vec<f64>,
    /// Width of each bin.
    pub bin_width: f64,
    /// Block mean (the Gaussian's location).
    pub mean: f64,
    /// Block standard deviation (the Gaussian's scale).
    pub std: f64,
}

impl GaussianFit {
    /// Histogram `samples` into `bins` equal-width bins and evaluate the
    /// plug-in Gaussian at the bin centers.
    pub fn compute(samples: &[f64], bins: usize) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyInput("gaussian fit"));
        }
        if bins == 0 {
            return Err(AnalysisError::InvalidBinCount);
        }

        let stats = NoiseStats::compute(samples)?;
        if stats.std == 0.0 {
            return Err(AnalysisError::DegenerateInput(
                "zero-spread block has a singular density",
            ));
        }

        let lo = stats.min;
        let bin_width = (stats.max - stats.min) / bins as f64;

        let mut counts = vec![0u64; bins];
        for &x in samples {
            let mut idx = ((x - lo) / bin_width) as usize;
            // The right edge closes the last bin
            if idx >= bins {
                idx = bins - 1;
            }
            counts[idx] += 1;
        }

        let n = samples.len() as f64;
        let density: Vec<f64> = counts
            .iter()
            .map(|&c| c as f64 / (n * bin_width))
            .collect();
        let bin_centers: Vec<f64> = (0..bins)
            .map(|i| lo + (i as f64 + 0.5) * bin_width)
            .collect();

        let norm = 1.0 / (stats.std * (2.0 * std::f64::consts::PI).sqrt());
        let curve: Vec<f64> = bin_centers
            .iter()
            .map(|&c| {
                let z = (c - stats.mean) / stats.std;
                norm * (-0.5 * z * z).exp()
            })
            .collect();

        Ok(Self {
            bin_centers,
            density,
            counts,
            curve,
            bin_width,
            mean: stats.mean,
            std: stats.std,
        })
    }

    /// Format as CSV.
    pub fn to_csv(&self) -> String {
        let mut output = String::from("bin_center,density,gaussian\n");
        for i in 0..self.bin_centers.len() {
            output.push_str(&format!(
                "{},{},{}\n",
                self.bin_centers[i], self.density[i], self.curve[i]
            ));
        }
        output
    }

    /// Format as a text summary.
    pub fn to_text(&self) -> String {
        let mut output = format!(
            "Gaussian Fit ({} bins, width {:.6})\n",
            self.bin_centers.len(),
            self.bin_width
        );
        output.push_str(&format!(
            "Plug-in parameters: mean {:.6}, std {:.6}\n",
            self.mean, self.std
        ));
        output.push_str("─".repeat(46).as_str());
        output.push('\n');
        output.push_str("   Bin center     Density    Gaussian\n");
        output.push_str("─".repeat(46).as_str());
        output.push('\n');
        for i in 0..self.bin_centers.len() {
            output.push_str(&format!(
                "{:>12.5}    {:>8.5}    {:>8.5}\n",
                self.bin_centers[i], self.density[i], self.curve[i]
            ));
        }
        output
    }
}

/// Drop samples more than `k` standard deviations from the block mean.
/// Used to strip ADC clipping artifacts before fitting.
pub fn sigma_clip(samples: &[f64], k: f64) -> Result<Vec<f64>, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::EmptyInput("sigma clip"));
    }
    if !k.is_finite() || k <= 0.0 {
        return Err(AnalysisError::InvalidArgument(
            "clip threshold must be positive",
        ));
    }

    let stats = NoiseStats::compute(samples)?;
    Ok(samples
        .iter()
        .copied()
        .filter(|x| (x - stats.mean).abs() <= k * stats.std)
        .collect())
}

/// Number of distinct values in the block. With quantized ADC data this
/// counts occupied converter levels.
pub fn distinct_levels(samples: &[f64]) -> usize {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_block() {
        let stats = NoiseStats::compute(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.num_samples, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.variance - 1.25).abs() < 1e-12);
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.rms - 7.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_variance_is_std_squared() {
        let data: Vec<f64> = (0..100).map(|i| ((i * 13 + 7) % 23) as f64).collect();
        let stats = NoiseStats::compute(&data).unwrap();
        assert!((stats.variance - stats.std * stats.std).abs() < 1e-12);
    }

    #[test]
    fn test_empty_block_errors() {
        assert_eq!(
            NoiseStats::compute(&[]).unwrap_err(),
            AnalysisError::EmptyInput("noise statistics")
        );
    }

    #[test]
    fn test_histogram_density_normalization() {
        let data: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        let fit = GaussianFit::compute(&data, 5).unwrap();

        assert_eq!(fit.counts, vec![2, 2, 2, 2, 2]);
        let integral: f64 = fit.density.iter().map(|d| d * fit.bin_width).sum();
        assert!((integral - 1.0).abs() < 1e-12);

        // Centers sit mid-bin
        let lo = 0.0;
        for (i, &c) in fit.bin_centers.iter().enumerate() {
            let expected = lo + (i as f64 + 0.5) * fit.bin_width;
            assert!((c - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gaussian_curve_values() {
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fit = GaussianFit::compute(&data, 3).unwrap();
        let norm = 1.0 / (fit.std * (2.0 * std::f64::consts::PI).sqrt());
        for (&c, &g) in fit.bin_centers.iter().zip(&fit.curve) {
            let z = (c - fit.mean) / fit.std;
            assert!((g - norm * (-0.5 * z * z).exp()).abs() < 1e-12);
        }
        // Peak of the curve is at the center closest to the mean
        let nearest = fit
            .bin_centers
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - fit.mean).abs().total_cmp(&(b.1 - fit.mean).abs()))
            .map(|(i, _)| i)
            .unwrap();
        let max_idx = fit
            .curve
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(nearest, max_idx);
    }

    #[test]
    fn test_histogram_error_cases() {
        assert_eq!(
            GaussianFit::compute(&[], 10).unwrap_err(),
            AnalysisError::EmptyInput("gaussian fit")
        );
        assert_eq!(
            GaussianFit::compute(&[1.0, 2.0], 0).unwrap_err(),
            AnalysisError::InvalidBinCount
        );
        assert!(matches!(
            GaussianFit::compute(&[3.0; 8], 4).unwrap_err(),
            AnalysisError::DegenerateInput(_)
        ));
    }

    #[test]
    fn test_sigma_clip_strips_outliers() {
        let mut data: Vec<f64> = [0.5, -0.5].iter().copied().cycle().take(100).collect();
        data.push(50.0);
        data.push(-50.0);

        let clipped = sigma_clip(&data, 3.0).unwrap();
        assert_eq!(clipped.len(), 100);
        assert!(clipped.iter().all(|x| x.abs() <= 1.0));

        assert!(matches!(
            sigma_clip(&data, 0.0),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert!(matches!(
            sigma_clip(&[], 3.0),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_distinct_levels() {
        assert_eq!(distinct_levels(&[0.5, -0.5, 0.5, 0.25]), 3);
        assert_eq!(distinct_levels(&[]), 0);
        // Quantized data occupies few levels
        let quantized: Vec<f64> = (0..1000)
            .map(|i| ((i * 7919) % 16) as f64 / 8.0 - 1.0)
            .collect();
        assert_eq!(distinct_levels(&quantized), 16);
    }
}
