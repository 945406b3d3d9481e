//! # Ursa SDR Acquisition
//!
//! This crate handles sample capture for the radio lab benches: a device
//! abstraction over the receiver dongle, a retry-aware acquisition layer,
//! and a software simulator so every exercise runs without hardware.
//!
//! ## Capture Paths
//!
//! - **Direct sampling**: real voltages straight off the ADC, no mixer.
//!   Tones above Nyquist fold; loading the pass-through FIR lets them
//!   through at full strength for the aliasing exercises.
//! - **I/Q mixer**: complex baseband samples after the tuner mixes the
//!   input against a local oscillator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Lab Tooling (ursa-cli)                  │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        Acquisition (plans, warm-up, retry policy)       │
//! │        run_capture, run_capture_list, capture_to_dir    │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              Device trait (SdrDevice)                   │
//! │        configure, read_samples, capture_buffered        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                     ┌────────────┐
//!                     │ Simulator  │
//!                     └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ursa_sdr::acquisition::{run_capture, CapturePlan};
//! use ursa_sdr::simulator::{Simulator, SimulatorConfig};
//!
//! let mut sim = Simulator::new(SimulatorConfig::default().with_seed(7));
//! let plan = CapturePlan::default()
//!     .with_sample_rate(100e3)
//!     .with_signal_freq(10e3)
//!     .with_num_samples(4096);
//!
//! let capture = run_capture(&mut sim, &plan).unwrap();
//! assert_eq!(capture.meta().total_samples(), 4096);
//! ```

pub mod acquisition;
pub mod device;
pub mod simulator;

// Re-exports
pub use acquisition::{
    capture_to_dir, capture_with_retry, run_capture, run_capture_list, CapturePlan, RetryPolicy,
};
pub use device::{CaptureSession, SdrConfig, SdrDevice, SdrError, SdrResult, PASSTHROUGH_FIR};
pub use simulator::{SignalSource, Simulator, SimulatorConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::acquisition::{run_capture, CapturePlan, RetryPolicy};
    pub use crate::device::{CaptureSession, SdrConfig, SdrDevice};
    pub use crate::simulator::{Simulator, SimulatorConfig};
}
