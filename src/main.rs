//! Command-line harness for the sidereal rate converter.
//!
//! Derives the accumulator constants, runs the accumulator on a dedicated
//! sampling thread for a simulated number of solar seconds, and prints the
//! periodic drift reports it publishes.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sidereal_clock::{
    derive, spawn, AccumulatorWidth, ClockConfig, CsvDriftLog, DriftObserver, DriftSample,
    FrequencyPair, PinMode, PinOutput, PulseCounter, RunBudget, Word,
};
#[cfg(feature = "export-wav")]
use sidereal_clock::WavPulseWriter;

#[derive(Parser)]
#[command(name = "sidereal-clock")]
#[command(about = "Simulate a Bresenham sidereal timebase driven by a timer overflow")]
struct Args {
    /// JSON clock configuration (defaults to the ATmega328 sidereal preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated run length in solar seconds
    #[arg(short, long)]
    seconds: Option<u64>,

    /// Drift report interval in solar seconds
    #[arg(short, long)]
    report_every: Option<u64>,

    /// Accumulator width in bits (8, 16, 32 or 64)
    #[arg(short, long)]
    width: Option<u32>,

    /// Fixed scale factor applied to both rates
    #[arg(long, conflicts_with = "auto_scale")]
    scale: Option<f64>,

    /// Pick the largest scale factor the accumulator width allows
    #[arg(long)]
    auto_scale: bool,

    /// Output pin behaviour on each pulse (toggle or strobe)
    #[arg(long, default_value = "toggle", value_parser = parse_pin_mode)]
    pin: PinMode,

    /// Write every drift report to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Render the output pin to a WAV file at the sampling rate
    #[cfg(feature = "export-wav")]
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_pin_mode(value: &str) -> Result<PinMode, String> {
    PinMode::from_str(value).ok_or_else(|| format!("unknown pin mode '{}' (toggle|strobe)", value))
}

#[cfg(feature = "export-wav")]
type Output = (PinOutput, Option<WavPulseWriter>);
#[cfg(not(feature = "export-wav"))]
type Output = PinOutput;

#[cfg(feature = "export-wav")]
fn output_sink(args: &Args, pair: &FrequencyPair) -> anyhow::Result<Output> {
    let wav = args
        .wav
        .as_ref()
        .map(|path| WavPulseWriter::create(path, pair.sampling_rate(), args.pin))
        .transpose()
        .context("failed to open WAV output")?;
    Ok((PinOutput::new(args.pin), wav))
}

#[cfg(not(feature = "export-wav"))]
fn output_sink(args: &Args, _pair: &FrequencyPair) -> anyhow::Result<Output> {
    Ok(PinOutput::new(args.pin))
}

#[cfg(feature = "export-wav")]
fn output_pin(output: &Output) -> &PinOutput {
    &output.0
}

#[cfg(not(feature = "export-wav"))]
fn output_pin(output: &Output) -> &PinOutput {
    output
}

fn load_config(args: &Args) -> anyhow::Result<ClockConfig> {
    let mut config = match &args.config {
        Some(path) => ClockConfig::load(path)
            .with_context(|| format!("failed to load configuration '{}'", path.display()))?,
        None => ClockConfig::sidereal_atmega328(),
    };
    if let Some(seconds) = args.seconds {
        config.test_seconds = seconds;
    }
    if let Some(every) = args.report_every {
        config.report_every_seconds = every;
    }
    if let Some(bits) = args.width {
        config.width = AccumulatorWidth::try_from(bits)?;
    }
    if args.auto_scale {
        config.scale_factor = None;
    } else if let Some(scale) = args.scale {
        config.scale_factor = Some(scale);
    }
    Ok(config)
}

fn run<W: Word>(args: &Args, config: &ClockConfig, pair: FrequencyPair) -> anyhow::Result<()> {
    let scaled = derive::<W>(&pair, config.scale()).with_context(|| {
        format!(
            "cannot derive {} accumulator constants for {:.4} Hz from {:.4} Hz",
            config.width,
            pair.target_rate(),
            pair.sampling_rate()
        )
    })?;

    println!("Sidereal Bresenham Timebase");
    println!("===========================\n");
    println!("Target rate:       {:.7} ticks/s", pair.target_rate());
    println!("Sampling rate:     {:.3} events/s", pair.sampling_rate());
    println!("Accumulator:       {}", scaled.width());
    println!("Scale factor:      {}", scaled.scale_factor());
    println!("Increment:         {}", scaled.increment());
    println!("Limit:             {}", scaled.limit());
    println!(
        "Effective rate:    {:.7} ticks/s ({:+.3} ppb)",
        scaled.effective_rate(pair.sampling_rate()),
        scaled.rate_error_ppb(&pair)
    );
    println!("Output pin:        {}", args.pin);

    let observer = DriftObserver::new(pair, config.solar_ticks, config.report_every_events())?;
    println!("Report interval:   {} events\n", observer.report_every());
    let mut csv_log = args
        .csv
        .as_ref()
        .map(|path| CsvDriftLog::create(path))
        .transpose()
        .context("failed to open CSV drift log")?;
    let sink = (PulseCounter::new(), output_sink(args, &pair)?);

    let handle = spawn(
        scaled,
        observer,
        sink,
        RunBudget::Events(config.test_events()),
    )?;

    for sample in handle.reports().iter() {
        print_report(&sample);
        if let Some(log) = csv_log.as_mut() {
            log.record(&sample)?;
        }
    }

    let (stats, (counter, output), observer) = handle.join()?;
    if let Some(log) = csv_log.as_mut() {
        log.flush()?;
        tracing::info!(rows = log.rows(), "drift log written");
    }

    let (gap_lo, gap_hi) = scaled.pulse_gap_bounds();
    println!("\n=== Run Statistics ===");
    println!("Sampling events:   {}", stats.events);
    println!("Pulses emitted:    {}", counter.pulses());
    println!("Pin rising edges:  {}", output_pin(&output).rising_edges());
    if let Some((lo, hi)) = counter.gap_range() {
        println!("Pulse spacing:     {}..={} events (ideal {}..={})", lo, hi, gap_lo, gap_hi);
    }
    if let Some((lo, hi)) = stats.pulse_remainder_range {
        println!("Pulse remainder:   {}..={} of limit {}", lo, hi, scaled.limit());
    }
    if let Some((lo, hi)) = observer.phase_error_range() {
        println!("Phase error:       {:+.6} .. {:+.6} pulses", lo, hi);
    }

    let multiplier = config.sidereal_multiplier;
    println!(
        "\nA timer algorithm to produce {} clock pulses every sidereal second.",
        config.solar_ticks
    );
    println!(
        "Note: ticks at any power of 10 solar seconds are {:.10} times that power of 10",
        pair.target_rate()
    );
    if multiplier > 1.0 {
        println!(
            "Note: you gain 1 sidereal second every {:.2} solar seconds.",
            1.0 / (multiplier - 1.0)
        );
    }
    Ok(())
}

fn print_report(sample: &DriftSample) {
    println!(
        "elapsed solar sec {:.0} elapsed sidereal ticks {} extra sidereal secs {:.6} phase error {:+.4}",
        sample.elapsed_sampling_units,
        sample.emitted_pulses,
        sample.computed_offset,
        sample.phase_error_pulses
    );
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the reports
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    let pair = config
        .frequency_pair()
        .context("invalid clock configuration")?;

    match config.width {
        AccumulatorWidth::W8 => run::<u8>(&args, &config, pair),
        AccumulatorWidth::W16 => run::<u16>(&args, &config, pair),
        AccumulatorWidth::W32 => run::<u32>(&args, &config, pair),
        AccumulatorWidth::W64 => run::<u64>(&args, &config, pair),
    }
}
