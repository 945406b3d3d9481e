//! # Ursa Core
//!
//! Analysis and persistence layer for the undergraduate radio lab toolkit.
//! Everything here operates on captured sample buffers after the fact; the
//! acquisition side lives in `ursa-sdr`.
//!
//! ## Modules
//!
//! - **analysis**: power/voltage spectra, autocorrelation, noise statistics,
//!   Gaussian histogram fits, SNR-vs-averaging sweeps
//! - **archive**: one-file capture archives (flat metadata record + sample
//!   payload) and timestamped run directories
//! - **fft_utils**: shared FFT plumbing (planner wrapper, zero-centered
//!   shift, frequency axis)
//! - **plot** (feature `image`): minimal PNG chart rendering for lab
//!   write-ups
//!
//! ## Example
//!
//! ```rust
//! use ursa_core::analysis::{SpectralEstimator, SpectrumConfig};
//! use ursa_core::types::SampleBuffer;
//!
//! let fs = 100_000.0;
//! let tone: Vec<f64> = (0..4096)
//!     .map(|n| (2.0 * std::f64::consts::PI * 10_000.0 * n as f64 / fs).sin())
//!     .collect();
//!
//! let estimator = SpectralEstimator::new();
//! let spectrum = estimator
//!     .power(&SampleBuffer::Real(tone), fs)
//!     .unwrap();
//! let peak = spectrum.peak();
//! assert!((peak.frequency.abs() - 10_000.0).abs() <= spectrum.freq_resolution);
//! ```

pub mod analysis;
pub mod archive;
pub mod error;
pub mod fft_utils;
#[cfg(feature = "image")]
pub mod plot;
pub mod types;

pub use analysis::{
    Autocorrelation, AveragingSweep, GaussianFit, NoiseStats, SpectralEstimator, Spectrum,
    SpectrumConfig, SpectrumMode,
};
pub use archive::{Capture, CaptureMeta, CaptureMode};
pub use error::AnalysisError;
pub use types::{IQSample, SampleBuffer};
