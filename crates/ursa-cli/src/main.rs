//! Radio Lab Command-Line Interface
//!
//! This CLI drives the sampling and noise exercises:
//! - Capturing sample archives from the (simulated) receiver
//! - Rate sweeps for the Nyquist and aliasing labs
//! - Analyzing archived captures: spectra, autocorrelation, statistics,
//!   histograms, SNR versus averaging
//!
//! Capture commands pause for bench cabling before touching the device;
//! pass `--yes` to skip the prompt in scripted runs.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

use ursa_core::analysis::{autocorrelation, fold_frequency, snr_vs_averaging};
use ursa_core::archive::{create_run_dir, read_archive};
use ursa_core::{
    Capture, CaptureMeta, CaptureMode, GaussianFit, NoiseStats, SpectralEstimator, SpectrumConfig,
    SpectrumMode,
};
use ursa_sdr::acquisition::{capture_to_dir, run_capture_list, CapturePlan};
use ursa_sdr::device::CaptureSession;
use ursa_sdr::simulator::{Simulator, SimulatorConfig};

#[derive(Parser)]
#[command(name = "ursa")]
#[command(author, version, about = "Radio lab capture and analysis CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture samples into a timestamped run directory
    Capture {
        /// Capture mode (sine, noise, iq-mixer)
        #[arg(long, default_value = "sine")]
        mode: String,

        /// Stimulus frequency in Hz
        #[arg(long, default_value = "10000.0")]
        freq: f64,

        /// Local oscillator frequency in Hz (iq-mixer mode)
        #[arg(long)]
        lo: Option<f64>,

        /// Sample rate in Hz
        #[arg(long, default_value = "2200000.0")]
        rate: f64,

        /// Samples per block
        #[arg(long, default_value = "2048")]
        samples: usize,

        /// Blocks per capture
        #[arg(long, default_value = "1")]
        blocks: usize,

        /// Load the pass-through FIR so tones beyond Nyquist alias at full strength
        #[arg(long)]
        bypass_filter: bool,

        /// Stimulus amplitude (sine and iq-mixer modes)
        #[arg(long, default_value = "1.0")]
        amplitude: f64,

        /// Noise source standard deviation (noise mode)
        #[arg(long, default_value = "0.5")]
        noise_std: f64,

        /// RNG seed for a reproducible capture
        #[arg(long)]
        seed: Option<u64>,

        /// Base directory for run directories
        #[arg(short, long, default_value = "captures")]
        out: PathBuf,

        /// Run directory label
        #[arg(long, default_value = "capture")]
        label: String,

        /// Skip the bench-ready prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Sweep sample rates, capturing with and without the anti-alias filter
    Nyquist {
        /// Stimulus frequency in Hz
        #[arg(long, default_value = "10000.0")]
        freq: f64,

        /// First sample rate in Hz
        #[arg(long, default_value = "4000.0")]
        start: f64,

        /// Last sample rate in Hz
        #[arg(long, default_value = "24000.0")]
        stop: f64,

        /// Rate step in Hz
        #[arg(long, default_value = "2000.0")]
        step: f64,

        /// Samples per capture
        #[arg(long, default_value = "4096")]
        samples: usize,

        /// RNG seed for a reproducible sweep
        #[arg(long)]
        seed: Option<u64>,

        /// Base directory for run directories
        #[arg(short, long, default_value = "captures")]
        out: PathBuf,

        /// Run directory label
        #[arg(long, default_value = "nyquist")]
        label: String,

        /// Skip the bench-ready prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Tabulate measured spectral peaks against the folding prediction
    ///
    /// The sweep runs with the filter bypassed so folding is visible.
    Survey {
        /// Stimulus frequency in Hz
        #[arg(long, default_value = "10000.0")]
        freq: f64,

        /// First sample rate in Hz
        #[arg(long, default_value = "4000.0")]
        start: f64,

        /// Last sample rate in Hz
        #[arg(long, default_value = "24000.0")]
        stop: f64,

        /// Rate step in Hz
        #[arg(long, default_value = "2000.0")]
        step: f64,

        /// Samples per capture
        #[arg(long, default_value = "4096")]
        samples: usize,

        /// RNG seed for a reproducible sweep
        #[arg(long)]
        seed: Option<u64>,

        /// Write the table as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Skip the bench-ready prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Analyze an archived capture
    Analyze {
        /// Archive file (.ursa)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis mode (spectrum, voltage, acf, stats, hist, snr)
        #[arg(long, default_value = "spectrum")]
        mode: String,

        /// Spectral method (fft, dft)
        #[arg(long, default_value = "fft")]
        method: String,

        /// Grid densification factor for the dft method
        #[arg(long, default_value = "1")]
        oversampling: usize,

        /// Subtract the mean before the transform
        #[arg(long)]
        remove_dc: bool,

        /// Maximum autocorrelation lag (acf mode)
        #[arg(long)]
        max_lag: Option<usize>,

        /// Histogram bin count (hist mode)
        #[arg(long, default_value = "40")]
        bins: usize,

        /// Lower edge of the peak readout band in Hz (spectrum modes)
        #[arg(long)]
        band_low: Option<f64>,

        /// Upper edge of the peak readout band in Hz (spectrum modes)
        #[arg(long)]
        band_high: Option<f64>,

        /// Output format (text, json, csv)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a PNG chart here (requires the plot feature)
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Print an archive's metadata record
    Info {
        /// Archive file (.ursa)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

struct CaptureArgs {
    mode: String,
    freq: f64,
    lo: Option<f64>,
    rate: f64,
    samples: usize,
    blocks: usize,
    bypass_filter: bool,
    amplitude: f64,
    noise_std: f64,
    seed: Option<u64>,
    out: PathBuf,
    label: String,
    yes: bool,
}

struct AnalyzeArgs {
    input: PathBuf,
    mode: String,
    method: String,
    oversampling: usize,
    remove_dc: bool,
    max_lag: Option<usize>,
    bins: usize,
    band_low: Option<f64>,
    band_high: Option<f64>,
    format: String,
    output: Option<PathBuf>,
    plot: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Capture {
            mode,
            freq,
            lo,
            rate,
            samples,
            blocks,
            bypass_filter,
            amplitude,
            noise_std,
            seed,
            out,
            label,
            yes,
        } => cmd_capture(CaptureArgs {
            mode,
            freq,
            lo,
            rate,
            samples,
            blocks,
            bypass_filter,
            amplitude,
            noise_std,
            seed,
            out,
            label,
            yes,
        }),

        Commands::Nyquist {
            freq,
            start,
            stop,
            step,
            samples,
            seed,
            out,
            label,
            yes,
        } => cmd_nyquist(freq, start, stop, step, samples, seed, out, label, yes),

        Commands::Survey {
            freq,
            start,
            stop,
            step,
            samples,
            seed,
            csv,
            yes,
        } => cmd_survey(freq, start, stop, step, samples, seed, csv, yes),

        Commands::Analyze {
            input,
            mode,
            method,
            oversampling,
            remove_dc,
            max_lag,
            bins,
            band_low,
            band_high,
            format,
            output,
            plot,
        } => cmd_analyze(AnalyzeArgs {
            input,
            mode,
            method,
            oversampling,
            remove_dc,
            max_lag,
            bins,
            band_low,
            band_high,
            format,
            output,
            plot,
        }),

        Commands::Info { input } => cmd_info(input),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn parse_capture_mode(mode: &str) -> Result<CaptureMode> {
    match mode.to_lowercase().as_str() {
        "sine" => Ok(CaptureMode::Sine),
        "noise" => Ok(CaptureMode::Noise),
        "iq-mixer" | "iq_mixer" | "mixer" => Ok(CaptureMode::IqMixer),
        _ => anyhow::bail!("Unknown capture mode: {}. Use sine, noise, or iq-mixer", mode),
    }
}

fn validate_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        anyhow::bail!("Sample rate must be positive, got {}", rate)
    }
}

fn validate_sweep(start: f64, stop: f64, step: f64) -> Result<()> {
    validate_rate(start)?;
    validate_rate(stop)?;
    if !step.is_finite() || step <= 0.0 {
        anyhow::bail!("Rate step must be positive, got {}", step);
    }
    if stop < start {
        anyhow::bail!("Stop rate {} is below start rate {}", stop, start);
    }
    Ok(())
}

fn sweep_rates(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = ((stop - start) / step).floor() as usize + 1;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Wait for the bench to be cabled unless the prompt was waived.
fn confirm_bench_ready(yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    print!("Cable the bench (generator -> attenuator -> receiver), then press Enter: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

fn build_simulator(
    mode: CaptureMode,
    freq: f64,
    amplitude: f64,
    noise_std: f64,
    seed: Option<u64>,
) -> Simulator {
    let mut config = match mode {
        CaptureMode::Noise => SimulatorConfig::default().with_noise_source(noise_std),
        _ => SimulatorConfig::default().with_tone(freq, amplitude),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    Simulator::new(config)
}

fn print_meta(meta: &CaptureMeta) {
    println!("  mode:            {}", meta.mode.as_str());
    println!("  sample rate:     {} Hz", meta.sample_rate);
    println!("  samples:         {} x {}", meta.num_blocks, meta.num_samples);
    if let Some(freq) = meta.signal_freq {
        println!("  stimulus:        {} Hz", freq);
    }
    if let Some(lo) = meta.lo_freq {
        println!("  LO:              {} Hz", lo);
    }
    println!("  direct sampling: {}", meta.direct_sampling);
    println!("  filter bypassed: {}", meta.filter_bypassed);
    println!("  timestamp:       {}", meta.timestamp);
}

fn write_output(text: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {:?}", path))?;
            println!("Output written to {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(feature = "plot")]
fn write_chart(path: &std::path::Path, png: Vec<u8>) -> Result<()> {
    std::fs::write(path, png).with_context(|| format!("writing {:?}", path))?;
    println!("Chart written to {:?}", path);
    Ok(())
}

fn require_real(capture: &Capture) -> Result<&[f64]> {
    capture
        .real_samples()
        .ok_or_else(|| anyhow::anyhow!("this analysis needs a real capture, not I/Q"))
}

fn cmd_capture(args: CaptureArgs) -> Result<()> {
    let mode = parse_capture_mode(&args.mode)?;
    validate_rate(args.rate)?;
    if mode == CaptureMode::IqMixer && args.lo.is_none() {
        anyhow::bail!("iq-mixer capture requires --lo");
    }
    confirm_bench_ready(args.yes)?;

    let mut plan = CapturePlan::default()
        .with_mode(mode)
        .with_sample_rate(args.rate)
        .with_num_samples(args.samples)
        .with_num_blocks(args.blocks)
        .with_bypass_filter(args.bypass_filter);
    plan.signal_freq = match mode {
        CaptureMode::Noise => None,
        _ => Some(args.freq),
    };
    if let Some(lo) = args.lo {
        plan = plan.with_lo_freq(lo);
    }

    let run_dir = create_run_dir(&args.out, &args.label).context("creating run directory")?;
    info!("run directory {}", run_dir.display());

    let mut session = CaptureSession::new(build_simulator(
        mode,
        args.freq,
        args.amplitude,
        args.noise_std,
        args.seed,
    ));
    let (capture, path) = capture_to_dir(session.device_mut()?, &plan, &run_dir)?;
    session.close()?;

    println!("Saved {:?}", path);
    print_meta(capture.meta());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_nyquist(
    freq: f64,
    start: f64,
    stop: f64,
    step: f64,
    samples: usize,
    seed: Option<u64>,
    out: PathBuf,
    label: String,
    yes: bool,
) -> Result<()> {
    validate_sweep(start, stop, step)?;
    confirm_bench_ready(yes)?;

    let run_dir = create_run_dir(&out, &label).context("creating run directory")?;
    info!("run directory {}", run_dir.display());

    let mut session = CaptureSession::new(build_simulator(CaptureMode::Sine, freq, 1.0, 0.5, seed));
    for rate in sweep_rates(start, stop, step) {
        for bypass in [false, true] {
            let plan = CapturePlan::default()
                .with_signal_freq(freq)
                .with_sample_rate(rate)
                .with_num_samples(samples)
                .with_bypass_filter(bypass);
            let (_, path) = capture_to_dir(session.device_mut()?, &plan, &run_dir)?;
            println!(
                "{:>9.0} Hz  {}  -> {}",
                rate,
                if bypass { "bypassed" } else { "filtered" },
                path.file_name().and_then(|n| n.to_str()).unwrap_or("?")
            );
        }
    }
    session.close()?;

    println!("Sweep saved under {:?}", run_dir);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_survey(
    freq: f64,
    start: f64,
    stop: f64,
    step: f64,
    samples: usize,
    seed: Option<u64>,
    csv: Option<PathBuf>,
    yes: bool,
) -> Result<()> {
    validate_sweep(start, stop, step)?;
    confirm_bench_ready(yes)?;

    let plans: Vec<CapturePlan> = sweep_rates(start, stop, step)
        .into_iter()
        .map(|rate| {
            CapturePlan::default()
                .with_signal_freq(freq)
                .with_sample_rate(rate)
                .with_num_samples(samples)
                .with_bypass_filter(true)
        })
        .collect();

    let mut session = CaptureSession::new(build_simulator(CaptureMode::Sine, freq, 1.0, 0.5, seed));
    let captures = run_capture_list(session.device_mut()?, &plans)?;
    session.close()?;

    let estimator = SpectralEstimator::new();
    println!("=== Aliasing Survey: {} Hz tone ===", freq);
    println!(
        "{:>12} {:>12} {:>14} {:>14}",
        "rate (Hz)", "Nyquist", "predicted (Hz)", "measured (Hz)"
    );

    let mut rows = Vec::with_capacity(captures.len());
    for capture in &captures {
        let rate = capture.meta().sample_rate;
        let spectrum = estimator.power(capture.samples(), rate)?;
        let measured = spectrum.peak().frequency.abs();
        let predicted = fold_frequency(freq, rate);
        println!(
            "{:>12.0} {:>12.0} {:>14.1} {:>14.1}",
            rate,
            rate / 2.0,
            predicted,
            measured
        );
        rows.push((rate, predicted, measured));
    }

    if let Some(path) = csv {
        let mut text = String::from("sample_rate_hz,predicted_hz,measured_hz\n");
        for (rate, predicted, measured) in &rows {
            text.push_str(&format!("{},{},{}\n", rate, predicted, measured));
        }
        std::fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
        println!("Survey written to {:?}", path);
    }
    Ok(())
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    let capture =
        read_archive(&args.input).with_context(|| format!("reading {:?}", args.input))?;
    let sample_rate = capture.meta().sample_rate;

    #[cfg(not(feature = "plot"))]
    if args.plot.is_some() {
        anyhow::bail!("--plot requires building with the plot feature");
    }

    match args.mode.as_str() {
        "spectrum" | "voltage" => {
            let config = SpectrumConfig::default()
                .with_mode(args.method.parse::<SpectrumMode>()?)
                .with_oversampling(args.oversampling)
                .with_remove_dc(args.remove_dc);
            let estimator = SpectralEstimator::with_config(config);
            let power = args.mode == "spectrum";
            let spectrum = if power {
                estimator.power(capture.samples(), sample_rate)?
            } else {
                estimator.voltage(capture.samples(), sample_rate)?
            };

            let output_text = match args.format.as_str() {
                "json" => spectrum.to_json(),
                "csv" => spectrum.to_csv(),
                _ => spectrum.to_text(),
            };
            write_output(&output_text, args.output.as_ref())?;

            if args.band_low.is_some() || args.band_high.is_some() {
                match spectrum.peak_in_band(args.band_low, args.band_high) {
                    Some(peak) => {
                        println!("Band peak: {:.1} Hz ({:.6e})", peak.frequency, peak.value)
                    }
                    None => println!("Band peak: none in range"),
                }
            }

            #[cfg(feature = "plot")]
            if let Some(path) = &args.plot {
                write_chart(path, ursa_core::plot::spectrum_png(&spectrum, power))?;
            }
        }

        "acf" => {
            let acf = autocorrelation(require_real(&capture)?, args.max_lag)?;
            let output_text = match args.format.as_str() {
                "csv" => acf.to_csv(),
                _ => acf.to_text(),
            };
            write_output(&output_text, args.output.as_ref())?;

            #[cfg(feature = "plot")]
            if args.plot.is_some() {
                anyhow::bail!("no chart for acf output; export csv instead");
            }
        }

        "stats" => {
            let samples = require_real(&capture)?;
            let stats = NoiseStats::compute(samples)?;
            let output_text = match args.format.as_str() {
                "json" => stats.to_json(),
                _ => stats.to_text(),
            };
            write_output(&output_text, args.output.as_ref())?;

            #[cfg(feature = "plot")]
            if let Some(path) = &args.plot {
                write_chart(
                    path,
                    ursa_core::plot::time_series_png(samples, sample_rate, 2000),
                )?;
            }
        }

        "hist" => {
            let fit = GaussianFit::compute(require_real(&capture)?, args.bins)?;
            let output_text = match args.format.as_str() {
                "csv" => fit.to_csv(),
                _ => fit.to_text(),
            };
            write_output(&output_text, args.output.as_ref())?;

            #[cfg(feature = "plot")]
            if let Some(path) = &args.plot {
                write_chart(path, ursa_core::plot::histogram_png(&fit))?;
            }
        }

        "snr" => {
            let blocks = capture
                .real_blocks()
                .ok_or_else(|| anyhow::anyhow!("SNR sweep needs a real capture, not I/Q"))?;
            let sweep = snr_vs_averaging(&blocks, sample_rate)?;
            let output_text = match args.format.as_str() {
                "csv" => sweep.to_csv(),
                _ => sweep.to_text(),
            };
            write_output(&output_text, args.output.as_ref())?;

            #[cfg(feature = "plot")]
            if let Some(path) = &args.plot {
                write_chart(path, ursa_core::plot::snr_sweep_png(&sweep))?;
            }
        }

        _ => anyhow::bail!(
            "Unknown analysis mode: {}. Use spectrum, voltage, acf, stats, hist, or snr",
            args.mode
        ),
    }
    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    let capture = read_archive(&input).with_context(|| format!("reading {:?}", input))?;
    println!("=== Capture Archive ===");
    println!("File: {:?}", input);
    println!("Samples on disk: {}", capture.samples().len());
    print_meta(capture.meta());
    Ok(())
}
