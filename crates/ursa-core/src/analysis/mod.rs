//! Signal Analysis Module
//!
//! Post-capture analysis helpers for the lab exercises: spectral
//! estimation, autocorrelation, noise statistics, and averaging sweeps.
//! Everything operates on sample buffers already in memory; acquisition
//! and persistence live elsewhere.
//!
//! ## Features
//!
//! - **Spectral Estimation**: power/voltage spectra with a zero-centered
//!   axis, FFT or oversampled direct-DFT evaluation
//! - **Autocorrelation**: normalized ACF over symmetric lags
//! - **Noise Statistics**: moments, extremes, RMS, histogram + Gaussian fit
//! - **Averaging Sweep**: SNR estimate vs. number of averaged blocks
//! - **Band Reject**: Fourier-domain notch for narrowband interferers
//!
//! ## Example
//!
//! ```rust
//! use ursa_core::analysis::{NoiseStats, SpectralEstimator};
//! use ursa_core::types::SampleBuffer;
//!
//! let block: Vec<f64> = (0..1024).map(|n| (n as f64 * 0.1).sin()).collect();
//! let stats = NoiseStats::compute(&block).unwrap();
//! println!("rms: {:.3}", stats.rms);
//!
//! let spectrum = SpectralEstimator::new()
//!     .power(&SampleBuffer::Real(block), 48_000.0)
//!     .unwrap();
//! println!("peak at {:.0} Hz", spectrum.peak().frequency);
//! ```

pub mod acf;
pub mod averaging;
pub mod filter;
pub mod spectrum;
pub mod statistics;

pub use acf::{autocorrelation, Autocorrelation};
pub use averaging::{snr_vs_averaging, AveragingSweep};
pub use filter::band_reject;
pub use spectrum::{
    fold_frequency, SpectralEstimator, SpectralPeak, Spectrum, SpectrumConfig, SpectrumMode,
    SpectrumScale,
};
pub use statistics::{distinct_levels, sigma_clip, GaussianFit, NoiseStats};
