//! Autocorrelation
//!
//! Normalized autocorrelation of a real block over symmetric lags: the
//! block mean is removed first, then everything is scaled by the zero-lag
//! value, so `values[max_lag]` is exactly 1. Correlation sums are not
//! re-weighted for overlap, so magnitudes taper toward the extreme lags
//! the way a full linear correlation does.

use crate::error::AnalysisError;

/// Normalized autocorrelation over symmetric lags.
#[derive(Debug, Clone)]
pub struct Autocorrelation {
    /// Lags in samples, `-max_lag ..= +max_lag`.
    pub lags: Vec<i64>,
    /// Correlation value per lag; `values[max_lag]` is 1.
    pub values: Vec<f64>,
    /// Largest lag on either side.
    pub max_lag: usize,
}

impl Autocorrelation {
    /// Value at a (possibly negative) lag, `None` outside the computed
    /// range.
    pub fn at(&self, lag: i64) -> Option<f64> {
        let idx = lag + self.max_lag as i64;
        if idx < 0 {
            return None;
        }
        self.values.get(idx as usize).copied()
    }

    /// Format the center of the function as a text table.
    pub fn to_text(&self) -> String {
        let mut output = format!(
            "Autocorrelation ({} lags, max lag {})\n",
            self.values.len(),
            self.max_lag
        );
        output.push_str("─".repeat(30).as_str());
        output.push('\n');
        output.push_str("   Lag      Value\n");
        output.push_str("─".repeat(30).as_str());
        output.push('\n');

        let show = self.max_lag.min(10) as i64;
        for lag in -show..=show {
            if let Some(v) = self.at(lag) {
                output.push_str(&format!("{:>6}    {:>8.4}\n", lag, v));
            }
        }
        output
    }

    /// Format as CSV.
    pub fn to_csv(&self) -> String {
        let mut output = String::from("lag,value\n");
        for (lag, value) in self.lags.iter().zip(&self.values) {
            output.push_str(&format!("{},{}\n", lag, value));
        }
        output
    }
}

/// Compute the normalized autocorrelation of `samples` out to `max_lag`
/// (default: all `N-1` lags).
pub fn autocorrelation(
    samples: &[f64],
    max_lag: Option<usize>,
) -> Result<Autocorrelation, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::EmptyInput("autocorrelation"));
    }
    let n = samples.len();
    let max_lag = max_lag.unwrap_or(n - 1);
    if max_lag >= n {
        return Err(AnalysisError::LagOutOfRange { max_lag, len: n });
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = samples.iter().map(|x| x - mean).collect();

    let zero_lag: f64 = centered.iter().map(|x| x * x).sum();
    if zero_lag == 0.0 {
        return Err(AnalysisError::DegenerateInput(
            "constant block has no autocorrelation",
        ));
    }

    let mut values = vec![0.0; 2 * max_lag + 1];
    values[max_lag] = 1.0;
    for lag in 1..=max_lag {
        let dot: f64 = centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        let r = dot / zero_lag;
        values[max_lag + lag] = r;
        values[max_lag - lag] = r;
    }

    Ok(Autocorrelation {
        lags: (-(max_lag as i64)..=max_lag as i64).collect(),
        values,
        max_lag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(period: usize, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn test_zero_lag_is_one() {
        let acf = autocorrelation(&sine(64, 1024), Some(128)).unwrap();
        assert_eq!(acf.at(0), Some(1.0));
        assert_eq!(acf.values.len(), 257);
        assert_eq!(acf.lags.first(), Some(&-128));
        assert_eq!(acf.lags.last(), Some(&128));
    }

    #[test]
    fn test_symmetry() {
        let data: Vec<f64> = (0..256).map(|i| ((i * 37 + 11) % 101) as f64).collect();
        let acf = autocorrelation(&data, Some(50)).unwrap();
        for lag in 1..=50 {
            assert_eq!(acf.at(lag), acf.at(-lag));
        }
    }

    #[test]
    fn test_periodic_signal_recurrence() {
        let acf = autocorrelation(&sine(64, 1024), Some(128)).unwrap();
        // One full period later the signal repeats
        assert!(acf.at(64).unwrap() > 0.8);
        // Half a period later it is anti-correlated
        assert!(acf.at(32).unwrap() < -0.8);
    }

    #[test]
    fn test_default_max_lag() {
        let acf = autocorrelation(&sine(8, 32), None).unwrap();
        assert_eq!(acf.max_lag, 31);
        assert_eq!(acf.values.len(), 63);
    }

    #[test]
    fn test_lag_out_of_range() {
        let err = autocorrelation(&[1.0, 2.0, 3.0], Some(3)).unwrap_err();
        assert_eq!(err, AnalysisError::LagOutOfRange { max_lag: 3, len: 3 });
    }

    #[test]
    fn test_empty_and_constant_inputs() {
        assert_eq!(
            autocorrelation(&[], None).unwrap_err(),
            AnalysisError::EmptyInput("autocorrelation")
        );
        assert!(matches!(
            autocorrelation(&[2.5; 16], Some(4)).unwrap_err(),
            AnalysisError::DegenerateInput(_)
        ));
    }

    #[test]
    fn test_mean_removal() {
        // A large DC offset must not leak into the correlation
        let with_offset: Vec<f64> = sine(64, 1024).iter().map(|x| x + 100.0).collect();
        let acf_offset = autocorrelation(&with_offset, Some(64)).unwrap();
        let acf_clean = autocorrelation(&sine(64, 1024), Some(64)).unwrap();
        for lag in 0..=64 {
            let a = acf_offset.at(lag).unwrap();
            let b = acf_clean.at(lag).unwrap();
            assert!((a - b).abs() < 1e-9);
        }
    }
}
