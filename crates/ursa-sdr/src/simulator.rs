//! Simulated SDR Front End
//!
//! Software stand-in for the receiver dongle so every lab exercise runs
//! without bench hardware. The simulator reproduces the behaviors the
//! exercises are built around:
//!
//! 1. **Aliasing**: direct-sampling captures evaluate the source at the
//!    configured rate, so tones beyond Nyquist fold exactly as they do
//!    on the real ADC.
//! 2. **Anti-alias filter**: with the stock FIR a beyond-Nyquist tone is
//!    strongly attenuated; with the pass-through FIR it arrives at full
//!    strength.
//! 3. **Settling**: the first capture after a configuration change rides
//!    a decaying DC transient, which is why acquisition discards a
//!    warm-up capture.
//! 4. **Quantization**: samples are clamped and rounded to the ADC grid
//!    (8 bits by default, like the dongle).
//!
//! Phase is continuous from one capture to the next, so back-to-back
//! reads concatenate into one coherent record.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use ursa_core::types::{IQSample, SampleBuffer};

use crate::device::{SdrConfig, SdrDevice, SdrError, SdrResult};

/// Peak of the settling transient added to post-configure captures.
const SETTLE_PEAK: f64 = 0.5;

/// Stopband gain of the stock anti-alias filter.
const STOPBAND_GAIN: f64 = 0.02;

/// What the simulated front end is connected to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalSource {
    /// Sine stimulus from the bench signal generator
    Tone { freq: f64, amplitude: f64 },
    /// Broadband noise source (terminated amplifier chain)
    Noise { std: f64 },
}

impl Default for SignalSource {
    fn default() -> Self {
        Self::Tone {
            freq: 1e4,
            amplitude: 1.0,
        }
    }
}

/// Simulator configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    /// Signal at the antenna port
    pub source: SignalSource,
    /// Additive front-end noise standard deviation
    pub noise_std: f64,
    /// ADC bit depth; `None` models an ideal converter
    pub adc_bits: Option<u32>,
    /// Captures after `configure` that still carry the settling transient
    pub settle_captures: usize,
    /// RNG seed for reproducible runs; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            source: SignalSource::default(),
            noise_std: 0.01,
            adc_bits: Some(8),
            settle_captures: 1,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Connect a sine stimulus
    pub fn with_tone(mut self, freq: f64, amplitude: f64) -> Self {
        self.source = SignalSource::Tone { freq, amplitude };
        self
    }

    /// Connect a noise source
    pub fn with_noise_source(mut self, std: f64) -> Self {
        self.source = SignalSource::Noise { std };
        self
    }

    /// Set the front-end noise level
    pub fn with_noise_std(mut self, std: f64) -> Self {
        self.noise_std = std;
        self
    }

    /// Set the ADC bit depth, or `None` for an ideal converter
    pub fn with_adc_bits(mut self, bits: Option<u32>) -> Self {
        self.adc_bits = bits;
        self
    }

    /// Set how many post-configure captures carry the settling transient
    pub fn with_settle_captures(mut self, captures: usize) -> Self {
        self.settle_captures = captures;
        self
    }

    /// Seed the RNG for a reproducible run
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Software receiver implementing [`SdrDevice`].
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    sdr: Option<SdrConfig>,
    rng: StdRng,
    /// Running sample index, kept across captures for phase continuity
    sample_clock: u64,
    captures_taken: usize,
    captures_since_configure: usize,
    closed: bool,
}

impl Simulator {
    /// Create a simulator. The device still needs `configure` before it
    /// will produce samples.
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            sdr: None,
            rng,
            sample_clock: 0,
            captures_taken: 0,
            captures_since_configure: 0,
            closed: false,
        }
    }

    /// Total captures produced since creation
    pub fn captures_taken(&self) -> usize {
        self.captures_taken
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Clamp and round a voltage onto the ADC code grid.
    fn quantize(value: f64, bits: u32) -> f64 {
        let levels = (1u64 << (bits - 1)) as f64;
        (value.clamp(-1.0, 1.0 - 1.0 / levels) * levels).round() / levels
    }

    /// Tone gain through the anti-alias filter at the given baseband
    /// offset from DC.
    fn filter_gain(offset: f64, sample_rate: f64, bypassed: bool) -> f64 {
        if bypassed || offset.abs() <= sample_rate / 2.0 {
            1.0
        } else {
            STOPBAND_GAIN
        }
    }
}

impl SdrDevice for Simulator {
    fn configure(&mut self, config: &SdrConfig) -> SdrResult<()> {
        if self.closed {
            return Err(SdrError::Closed);
        }
        config.validate()?;
        if !self.config.noise_std.is_finite() || self.config.noise_std < 0.0 {
            return Err(SdrError::InvalidConfig(format!(
                "noise std must be non-negative, got {}",
                self.config.noise_std
            )));
        }
        if let Some(bits) = self.config.adc_bits {
            if !(1..=24).contains(&bits) {
                return Err(SdrError::InvalidConfig(format!(
                    "ADC depth must be between 1 and 24 bits, got {bits}"
                )));
            }
        }
        self.sdr = Some(config.clone());
        self.sample_clock = 0;
        self.captures_since_configure = 0;
        Ok(())
    }

    fn read_samples(&mut self) -> SdrResult<SampleBuffer> {
        if self.closed {
            return Err(SdrError::Closed);
        }
        let cfg = match &self.sdr {
            Some(cfg) => cfg.clone(),
            None => {
                return Err(SdrError::DeviceUnavailable(
                    "device not configured".to_string(),
                ));
            }
        };

        let total = cfg.total_samples();
        let dt = 1.0 / cfg.sample_rate;
        let settling = self.captures_since_configure < self.config.settle_captures;
        // The bias loop recenters within the first eighth of a capture
        let settle_tau = total as f64 / 8.0;
        let noise = Normal::new(0.0, self.config.noise_std)
            .map_err(|_| SdrError::InvalidConfig("noise std must be finite".to_string()))?;
        let unit = Normal::new(0.0, 1.0)
            .map_err(|_| SdrError::InvalidConfig("noise std must be finite".to_string()))?;
        let source = self.config.source;
        let adc_bits = self.config.adc_bits;
        let bypassed = cfg.is_filter_bypassed();

        let buffer = if cfg.direct_sampling {
            let mut samples = Vec::with_capacity(total);
            for n in 0..total {
                let t = (self.sample_clock + n as u64) as f64 * dt;
                let mut v = match source {
                    SignalSource::Tone { freq, amplitude } => {
                        let gain = Self::filter_gain(freq, cfg.sample_rate, bypassed);
                        gain * amplitude * (2.0 * PI * freq * t).sin()
                    }
                    SignalSource::Noise { std } => std * unit.sample(&mut self.rng),
                };
                v += noise.sample(&mut self.rng);
                if settling {
                    v += SETTLE_PEAK * (-(n as f64) / settle_tau).exp();
                }
                if let Some(bits) = adc_bits {
                    v = Self::quantize(v, bits);
                }
                samples.push(v);
            }
            SampleBuffer::Real(samples)
        } else {
            // lo_freq presence was checked by SdrConfig::validate
            let lo = cfg.lo_freq.ok_or_else(|| {
                SdrError::InvalidConfig("mixer capture requires an LO frequency".to_string())
            })?;
            let mut samples = Vec::with_capacity(total);
            for n in 0..total {
                let t = (self.sample_clock + n as u64) as f64 * dt;
                let (mut re, mut im) = match source {
                    SignalSource::Tone { freq, amplitude } => {
                        let offset = freq - lo;
                        let gain = Self::filter_gain(offset, cfg.sample_rate, bypassed);
                        let phase = 2.0 * PI * offset * t;
                        (gain * amplitude * phase.cos(), gain * amplitude * phase.sin())
                    }
                    SignalSource::Noise { std } => (
                        std * unit.sample(&mut self.rng),
                        std * unit.sample(&mut self.rng),
                    ),
                };
                re += noise.sample(&mut self.rng);
                im += noise.sample(&mut self.rng);
                if settling {
                    re += SETTLE_PEAK * (-(n as f64) / settle_tau).exp();
                }
                if let Some(bits) = adc_bits {
                    re = Self::quantize(re, bits);
                    im = Self::quantize(im, bits);
                }
                samples.push(IQSample::new(re, im));
            }
            SampleBuffer::Iq(samples)
        };

        self.sample_clock += total as u64;
        self.captures_taken += 1;
        self.captures_since_configure += 1;
        Ok(buffer)
    }

    fn close(&mut self) -> SdrResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PASSTHROUGH_FIR;

    fn quiet_tone(freq: f64) -> SimulatorConfig {
        SimulatorConfig::default()
            .with_tone(freq, 1.0)
            .with_noise_std(0.0)
            .with_adc_bits(None)
            .with_settle_captures(0)
            .with_seed(1)
    }

    fn direct_config(sample_rate: f64, num_samples: usize) -> SdrConfig {
        SdrConfig::default()
            .with_sample_rate(sample_rate)
            .with_num_samples(num_samples)
    }

    #[test]
    fn test_direct_capture_is_real() {
        let mut sim = Simulator::new(quiet_tone(10e3));
        sim.configure(&direct_config(100e3, 512).with_num_blocks(4))
            .unwrap();
        let samples = sim.read_samples().unwrap();
        assert!(!samples.is_complex());
        assert_eq!(samples.len(), 2048);
    }

    #[test]
    fn test_mixer_capture_is_complex_at_baseband_offset() {
        let config = SimulatorConfig::default()
            .with_tone(1.4204e9, 1.0)
            .with_noise_std(0.0)
            .with_adc_bits(None)
            .with_settle_captures(0)
            .with_seed(1);
        let mut sim = Simulator::new(config);
        sim.configure(
            &direct_config(1e6, 1024)
                .with_direct_sampling(false)
                .with_lo_freq(1.42e9),
        )
        .unwrap();
        let samples = sim.read_samples().unwrap();
        assert!(samples.is_complex());

        // 400 kHz offset rotates 0.4 cycles per sample at 1 MHz
        let iq = samples.as_iq().unwrap();
        let step = (iq[1] * iq[0].conj()).arg();
        assert!((step - 2.0 * PI * 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_phase_continuous_across_captures() {
        let mut split = Simulator::new(quiet_tone(10e3));
        split.configure(&direct_config(100e3, 64)).unwrap();
        let mut joined: Vec<f64> = split.read_samples().unwrap().as_real().unwrap().to_vec();
        joined.extend_from_slice(split.read_samples().unwrap().as_real().unwrap());

        let mut whole = Simulator::new(quiet_tone(10e3));
        whole.configure(&direct_config(100e3, 128)).unwrap();
        let reference = whole.read_samples().unwrap();

        for (a, b) in joined.iter().zip(reference.as_real().unwrap()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_settling_transient_only_in_first_capture() {
        let config = quiet_tone(10e3).with_settle_captures(1);
        let mut sim = Simulator::new(config);
        sim.configure(&direct_config(100e3, 4096)).unwrap();

        let mean = |buf: SampleBuffer| {
            let samples = buf.as_real().unwrap().to_vec();
            samples.iter().sum::<f64>() / samples.len() as f64
        };

        let first = mean(sim.read_samples().unwrap());
        let second = mean(sim.read_samples().unwrap());
        assert!(first > 0.02, "expected DC transient, mean = {first}");
        assert!(second.abs() < 0.005, "expected settled capture, mean = {second}");
    }

    #[test]
    fn test_beyond_nyquist_tone_attenuated_unless_bypassed() {
        let rms = |samples: &[f64]| {
            (samples.iter().map(|v| v * v).sum::<f64>() / samples.len() as f64).sqrt()
        };

        // 10 kHz tone sampled at 12 kHz sits past Nyquist
        let mut stock = Simulator::new(quiet_tone(10e3));
        stock.configure(&direct_config(12e3, 4096)).unwrap();
        let stock_rms = rms(stock.read_samples().unwrap().as_real().unwrap());

        let mut bypassed = Simulator::new(quiet_tone(10e3));
        bypassed
            .configure(&direct_config(12e3, 4096).with_fir_coeffs(PASSTHROUGH_FIR))
            .unwrap();
        let bypass_rms = rms(bypassed.read_samples().unwrap().as_real().unwrap());

        assert!(bypass_rms > 10.0 * stock_rms);
        assert!((bypass_rms - 0.707).abs() < 0.05);
    }

    #[test]
    fn test_seeded_noise_reproduces() {
        let config = SimulatorConfig::default()
            .with_noise_source(0.5)
            .with_adc_bits(None)
            .with_settle_captures(0)
            .with_seed(42);

        let capture = |config: SimulatorConfig| {
            let mut sim = Simulator::new(config);
            sim.configure(&direct_config(1e6, 256)).unwrap();
            sim.read_samples().unwrap().as_real().unwrap().to_vec()
        };

        assert_eq!(capture(config), capture(config));
    }

    #[test]
    fn test_adc_snaps_to_code_grid() {
        let config = quiet_tone(10e3).with_adc_bits(Some(8));
        let mut sim = Simulator::new(config);
        sim.configure(&direct_config(100e3, 1024)).unwrap();
        let samples = sim.read_samples().unwrap();
        for &v in samples.as_real().unwrap() {
            let code = v * 128.0;
            assert!((code - code.round()).abs() < 1e-9, "off-grid sample {v}");
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_read_requires_configure() {
        let mut sim = Simulator::new(SimulatorConfig::default());
        assert!(matches!(
            sim.read_samples(),
            Err(SdrError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_closed_device_rejects_operations() {
        let mut sim = Simulator::new(SimulatorConfig::default());
        sim.configure(&SdrConfig::default()).unwrap();
        sim.close().unwrap();
        assert!(matches!(sim.read_samples(), Err(SdrError::Closed)));
        assert!(matches!(
            sim.configure(&SdrConfig::default()),
            Err(SdrError::Closed)
        ));
    }
}
