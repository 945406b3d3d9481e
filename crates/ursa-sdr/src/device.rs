//! SDR Device Abstraction
//!
//! The acquisition layer talks to receivers through the [`SdrDevice`]
//! trait. A capture is `num_blocks * num_samples` voltages, real in
//! direct-sampling mode and complex when the tuner mixer is in the path.
//!
//! Receiver access is scoped through [`CaptureSession`], which closes the
//! device on every exit path. There is no global device handle; each
//! routine borrows the device it was given.

use thiserror::Error;
use ursa_core::archive::ArchiveError;
use ursa_core::types::SampleBuffer;

/// Tap count of the receiver's programmable anti-alias FIR.
pub const FIR_TAPS: usize = 16;

/// Pass-through FIR: a unit impulse at full coefficient scale.
///
/// Loading this in place of the stock anti-alias filter leaves the ADC
/// stream unfiltered, so tones beyond Nyquist alias at full strength.
/// Used by the sampling exercises to make folding visible.
pub const PASSTHROUGH_FIR: [i16; FIR_TAPS] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2047];

/// Errors raised by device configuration and capture.
#[derive(Debug, Error)]
pub enum SdrError {
    /// Rejected before the device was touched.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The device did not answer or a read came back short.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Every capture path was exhausted.
    #[error("capture failed after {attempts} attempts: {reason}")]
    CaptureFailed { attempts: usize, reason: String },
    /// The handle was already released.
    #[error("device is closed")]
    Closed,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result alias for device operations.
pub type SdrResult<T> = Result<T, SdrError>;

/// Receiver configuration for one capture run.
#[derive(Debug, Clone, PartialEq)]
pub struct SdrConfig {
    /// ADC sample rate in Hz
    pub sample_rate: f64,
    /// Samples per block
    pub num_samples: usize,
    /// Blocks per capture
    pub num_blocks: usize,
    /// Bypass the tuner and sample the input directly (real voltages)
    pub direct_sampling: bool,
    /// Local oscillator frequency in Hz; required when mixing
    pub lo_freq: Option<f64>,
    /// FIR override; `None` keeps the stock anti-alias filter
    pub fir_coeffs: Option<[i16; FIR_TAPS]>,
}

impl Default for SdrConfig {
    fn default() -> Self {
        Self {
            sample_rate: 2.2e6,
            num_samples: 2048,
            num_blocks: 1,
            direct_sampling: true,
            lo_freq: None,
            fir_coeffs: None,
        }
    }
}

impl SdrConfig {
    /// Set the sample rate in Hz
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the samples per block
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Set the blocks per capture
    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    /// Enable or disable direct sampling
    pub fn with_direct_sampling(mut self, direct: bool) -> Self {
        self.direct_sampling = direct;
        self
    }

    /// Set the local oscillator frequency in Hz
    pub fn with_lo_freq(mut self, lo_freq: f64) -> Self {
        self.lo_freq = Some(lo_freq);
        self
    }

    /// Load a FIR coefficient set in place of the stock filter
    pub fn with_fir_coeffs(mut self, coeffs: [i16; FIR_TAPS]) -> Self {
        self.fir_coeffs = Some(coeffs);
        self
    }

    /// Total samples in one capture
    pub fn total_samples(&self) -> usize {
        self.num_samples * self.num_blocks
    }

    /// True when the pass-through FIR is loaded
    pub fn is_filter_bypassed(&self) -> bool {
        self.fir_coeffs == Some(PASSTHROUGH_FIR)
    }

    /// Check the configuration before it reaches the device.
    pub fn validate(&self) -> SdrResult<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SdrError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.num_samples == 0 {
            return Err(SdrError::InvalidConfig(
                "samples per block must be positive".to_string(),
            ));
        }
        if self.num_blocks == 0 {
            return Err(SdrError::InvalidConfig(
                "block count must be positive".to_string(),
            ));
        }
        if self.num_samples.checked_mul(self.num_blocks).is_none() {
            return Err(SdrError::InvalidConfig(
                "capture size overflows".to_string(),
            ));
        }
        if !self.direct_sampling {
            match self.lo_freq {
                Some(lo) if lo.is_finite() => {}
                Some(lo) => {
                    return Err(SdrError::InvalidConfig(format!(
                        "LO frequency must be finite, got {lo}"
                    )));
                }
                None => {
                    return Err(SdrError::InvalidConfig(
                        "mixer capture requires an LO frequency".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// The acquisition boundary every receiver implements.
///
/// `read_samples` is the primary path; `capture_buffered` is the slower
/// secondary path some front ends provide and defaults to the primary.
pub trait SdrDevice {
    /// Apply a configuration. Implementations validate before touching
    /// hardware state.
    fn configure(&mut self, config: &SdrConfig) -> SdrResult<()>;

    /// Read one full capture over the primary path.
    fn read_samples(&mut self) -> SdrResult<SampleBuffer>;

    /// Read one full capture over the secondary path.
    fn capture_buffered(&mut self) -> SdrResult<SampleBuffer> {
        self.read_samples()
    }

    /// Release the device.
    fn close(&mut self) -> SdrResult<()>;
}

/// Scoped ownership of a device handle.
///
/// The session closes the device when dropped, including on error paths
/// partway through a capture. Call [`CaptureSession::close`] instead to
/// surface close errors.
pub struct CaptureSession<D: SdrDevice> {
    device: Option<D>,
}

impl<D: SdrDevice> CaptureSession<D> {
    /// Take ownership of a device for the duration of the session.
    pub fn new(device: D) -> Self {
        Self {
            device: Some(device),
        }
    }

    /// Borrow the device for capture calls.
    pub fn device_mut(&mut self) -> SdrResult<&mut D> {
        self.device.as_mut().ok_or(SdrError::Closed)
    }

    /// Close the device, surfacing any error the driver reports.
    pub fn close(mut self) -> SdrResult<()> {
        match self.device.take() {
            Some(mut device) => device.close(),
            None => Ok(()),
        }
    }
}

impl<D: SdrDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            let _ = device.close();
        }
    }
}
