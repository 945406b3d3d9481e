//! Nyquist Folding Demo
//!
//! Captures the same 10 kHz tone twice: once well oversampled at
//! 100 kHz, once undersampled at 12 kHz with the anti-alias filter
//! bypassed, and prints where the spectral peak lands each time.
//!
//! Run with: cargo run --example nyquist_demo -p ursa-sdr

use ursa_core::analysis::fold_frequency;
use ursa_core::SpectralEstimator;
use ursa_sdr::acquisition::{run_capture, CapturePlan};
use ursa_sdr::simulator::{Simulator, SimulatorConfig};

const TONE_HZ: f64 = 10e3;

fn main() {
    println!("Nyquist Folding Demo");
    println!("====================\n");

    for &(rate, bypass) in &[(100e3, false), (12e3, true)] {
        let mut sim = Simulator::new(
            SimulatorConfig::default()
                .with_tone(TONE_HZ, 1.0)
                .with_seed(1),
        );
        let plan = CapturePlan::default()
            .with_signal_freq(TONE_HZ)
            .with_sample_rate(rate)
            .with_num_samples(4096)
            .with_bypass_filter(bypass);

        let capture = run_capture(&mut sim, &plan).expect("capture failed");
        let spectrum = SpectralEstimator::new()
            .power(capture.samples(), rate)
            .expect("spectrum failed");
        let peak = spectrum.peak();

        println!("Sample rate: {:.0} Hz (Nyquist {:.0} Hz)", rate, rate / 2.0);
        println!("  Tone:           {:.0} Hz", TONE_HZ);
        println!("  Fold predicts:  {:.0} Hz", fold_frequency(TONE_HZ, rate));
        println!("  Measured peak:  {:.1} Hz\n", peak.frequency.abs());
    }
}
