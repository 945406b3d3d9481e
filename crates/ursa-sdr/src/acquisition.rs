//! Capture Orchestration
//!
//! Turns a [`CapturePlan`] into an archived-ready [`Capture`]: validate
//! the plan, configure the device, discard one warm-up capture, then
//! capture with the retry policy and stamp the metadata.
//!
//! The warm-up discard is required, not an optimization. The front end
//! settles after a rate change and the first capture carries a DC
//! transient that would bias every statistics exercise downstream.
//!
//! Device trouble follows one fixed policy: retry the primary read once,
//! then try the buffered path once, logging each failure with its
//! classification. Everything here is synchronous and single threaded;
//! the lab benches have no use for more.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use ursa_core::archive::{default_archive_name, write_archive, Capture, CaptureMeta, CaptureMode};
use ursa_core::types::SampleBuffer;

use crate::device::{SdrConfig, SdrDevice, SdrError, SdrResult, PASSTHROUGH_FIR};

/// How capture failures are retried.
///
/// The defaults are the policy the lab runs under: one retry of the
/// primary read, then one attempt of the buffered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional primary-read attempts after the first failure
    pub primary_retries: usize,
    /// Try the buffered path once when primary reads are exhausted
    pub use_fallback: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            primary_retries: 1,
            use_fallback: true,
        }
    }
}

/// Everything needed for one acquisition run.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    /// What is being captured
    pub mode: CaptureMode,
    /// Stimulus frequency in Hz; required for sine captures
    pub signal_freq: Option<f64>,
    /// Local oscillator frequency in Hz; required for mixer captures
    pub lo_freq: Option<f64>,
    /// ADC sample rate in Hz
    pub sample_rate: f64,
    /// Samples per block
    pub num_samples: usize,
    /// Blocks per capture
    pub num_blocks: usize,
    /// Load the pass-through FIR in place of the anti-alias filter
    pub bypass_filter: bool,
    /// Failure handling for the capture reads
    pub retry: RetryPolicy,
}

impl Default for CapturePlan {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Sine,
            signal_freq: Some(1e4),
            lo_freq: None,
            sample_rate: 2.2e6,
            num_samples: 2048,
            num_blocks: 1,
            bypass_filter: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl CapturePlan {
    /// Set the capture mode
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the stimulus frequency in Hz
    pub fn with_signal_freq(mut self, freq: f64) -> Self {
        self.signal_freq = Some(freq);
        self
    }

    /// Set the local oscillator frequency in Hz
    pub fn with_lo_freq(mut self, freq: f64) -> Self {
        self.lo_freq = Some(freq);
        self
    }

    /// Set the sample rate in Hz
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
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

    /// Bypass the anti-alias filter
    pub fn with_bypass_filter(mut self, bypass: bool) -> Self {
        self.bypass_filter = bypass;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the plan before any device work.
    pub fn validate(&self) -> SdrResult<()> {
        self.device_config().validate()?;
        match self.mode {
            CaptureMode::Sine => match self.signal_freq {
                Some(freq) if freq.is_finite() => Ok(()),
                Some(freq) => Err(SdrError::InvalidConfig(format!(
                    "stimulus frequency must be finite, got {freq}"
                ))),
                None => Err(SdrError::InvalidConfig(
                    "sine capture records its stimulus frequency".to_string(),
                )),
            },
            CaptureMode::Noise => Ok(()),
            // LO presence is part of the device config check
            CaptureMode::IqMixer => Ok(()),
        }
    }

    /// Device configuration this plan asks for.
    pub fn device_config(&self) -> SdrConfig {
        let direct = self.mode != CaptureMode::IqMixer;
        SdrConfig {
            sample_rate: self.sample_rate,
            num_samples: self.num_samples,
            num_blocks: self.num_blocks,
            direct_sampling: direct,
            lo_freq: if direct { None } else { self.lo_freq },
            fir_coeffs: if self.bypass_filter {
                Some(PASSTHROUGH_FIR)
            } else {
                None
            },
        }
    }

    /// Metadata record for a capture taken now.
    pub fn metadata(&self) -> CaptureMeta {
        CaptureMeta {
            mode: self.mode,
            sample_rate: self.sample_rate,
            num_samples: self.num_samples,
            num_blocks: self.num_blocks,
            signal_freq: self.signal_freq,
            lo_freq: if self.mode == CaptureMode::IqMixer {
                self.lo_freq
            } else {
                None
            },
            direct_sampling: self.mode != CaptureMode::IqMixer,
            filter_bypassed: self.bypass_filter,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Read one capture under the retry policy.
///
/// Every failed attempt is logged with its path classification. When the
/// whole chain is exhausted the error reports how many attempts were
/// made.
pub fn capture_with_retry(
    device: &mut dyn SdrDevice,
    policy: &RetryPolicy,
) -> SdrResult<SampleBuffer> {
    let mut attempts = 0;
    let mut last_error = None;

    for attempt in 0..=policy.primary_retries {
        attempts += 1;
        match device.read_samples() {
            Ok(samples) => return Ok(samples),
            Err(err) => {
                warn!("primary read failed (attempt {}): {}", attempt + 1, err);
                last_error = Some(err);
            }
        }
    }

    if policy.use_fallback {
        attempts += 1;
        match device.capture_buffered() {
            Ok(samples) => return Ok(samples),
            Err(err) => {
                warn!("buffered read failed: {}", err);
                last_error = Some(err);
            }
        }
    }

    let reason = match last_error {
        Some(err) => err.to_string(),
        None => "no capture path enabled".to_string(),
    };
    Err(SdrError::CaptureFailed { attempts, reason })
}

/// Run one acquisition: validate, configure, warm up, capture, stamp.
pub fn run_capture(device: &mut dyn SdrDevice, plan: &CapturePlan) -> SdrResult<Capture> {
    plan.validate()?;
    device.configure(&plan.device_config())?;

    debug!(
        "warm-up capture at {} Hz ({} x {} samples)",
        plan.sample_rate, plan.num_blocks, plan.num_samples
    );
    let _ = capture_with_retry(device, &plan.retry)?;

    let data = capture_with_retry(device, &plan.retry)?;
    let capture = Capture::new(plan.metadata(), data)?;
    info!(
        "captured {} {} samples at {} Hz",
        capture.meta().total_samples(),
        plan.mode.as_str(),
        plan.sample_rate
    );
    Ok(capture)
}

/// Run a list of plans back to back on one device.
///
/// This is the loop behind the rate surveys: one parameterized routine
/// instead of a script per scenario.
pub fn run_capture_list(
    device: &mut dyn SdrDevice,
    plans: &[CapturePlan],
) -> SdrResult<Vec<Capture>> {
    let mut captures = Vec::with_capacity(plans.len());
    for plan in plans {
        captures.push(run_capture(device, plan)?);
    }
    Ok(captures)
}

/// Run one acquisition and persist it under its default archive name.
pub fn capture_to_dir(
    device: &mut dyn SdrDevice,
    plan: &CapturePlan,
    dir: &Path,
) -> SdrResult<(Capture, PathBuf)> {
    let capture = run_capture(device, plan)?;
    let path = dir.join(default_archive_name(capture.meta()));
    write_archive(&path, &capture)?;
    debug!("archived capture to {}", path.display());
    Ok((capture, path))
}
