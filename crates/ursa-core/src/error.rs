//! Typed errors for the analysis layer.
//!
//! Invalid arguments fail before any transform runs, and no routine papers
//! over a bad input by returning NaN.

use thiserror::Error;

/// Errors produced by the analysis helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The routine was handed no samples.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A spectrum-mode string other than the recognized values.
    #[error("unknown spectrum mode {0:?} (expected \"fft\" or \"dft\")")]
    InvalidMode(String),

    /// Sample rates must be finite and positive.
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    /// The frequency-oversampling factor must be at least 1.
    #[error("oversampling factor must be at least 1")]
    InvalidOversampling,

    /// Requested more lags than the data can support.
    #[error("max lag {max_lag} out of range for {len} samples")]
    LagOutOfRange { max_lag: usize, len: usize },

    /// Histograms need at least one bin.
    #[error("bin count must be positive")]
    InvalidBinCount,

    /// Catch-all for argument checks that precede any computation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Band edges given in the wrong order.
    #[error("invalid band: low edge {low} Hz above high edge {high} Hz")]
    InvalidBand { low: f64, high: f64 },

    /// Input dimensions do not agree with what the operation requires.
    #[error("shape mismatch: expected {expected} samples, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Input that would force a division by zero (e.g. a constant block).
    #[error("degenerate input: {0}")]
    DegenerateInput(&'static str),
}
