//! Sidereal Clock Rate Converter
//!
//! Derives a pulse train at an arbitrary target frequency from a fixed-rate
//! sampling clock, such as a microcontroller timer overflow. The reference
//! use case produces 32768 ticks per sidereal second from an ATmega328 8-bit
//! timer (16 MHz / 256 = 62500 overflows per second).
//!
//! The conversion is a Bresenham / DDA error accumulator: every sampling event
//! adds a fixed increment to an integer error term and emits a pulse whenever
//! the term crosses a fixed limit. Rounding never accumulates, so the emitted
//! pulse train stays within one sampling interval of the ideal schedule for
//! any run length.
//!
//! # Components
//! - [`deriver`]: turns the two real-valued rates into integer constants
//! - [`accumulator`]: the integer-only per-event state machine
//! - [`observer`]: drift bookkeeping used to verify long runs
//! - [`driver`]: sampling loops and output sinks around the accumulator
//! - [`config`]: JSON-loadable clock configuration
//!
//! # Crate feature flags
//! - `cli` (default): `sidereal-clock` command-line harness
//! - `export-wav` (opt-in): render the simulated output pin to a WAV file
//!
//! # Quick start
//! ```
//! use sidereal_clock::{derive, FrequencyPair, ScaleFactor, TickAccumulator};
//!
//! let pair = FrequencyPair::new(32_857.715_813_580_8, 62_500.0).unwrap();
//! let config = derive::<u32>(&pair, ScaleFactor::Auto).unwrap();
//! let mut acc = TickAccumulator::new(config);
//!
//! let pulses = (0..62_500).filter(|_| acc.clock()).count();
//! assert_eq!(pulses, 32_857);
//! ```

#![warn(missing_docs)]

pub mod accumulator;
pub mod config;
pub mod constants;
pub mod deriver;
pub mod driver;
pub mod observer;

/// Reasons a configuration is rejected before the sampling loop may start
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A rate is zero, negative, NaN or infinite
    #[error("{name} must be a positive finite frequency, got {value}")]
    NonPositiveRate {
        /// Which rate was rejected
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// At most one pulse per sampling event can be emitted
    #[error("target rate {target} Hz must be below the sampling rate {sampling} Hz")]
    TargetNotBelowSampling {
        /// Requested pulse rate
        target: f64,
        /// Sampling event rate
        sampling: f64,
    },

    /// Fixed scale factor is zero, negative, NaN or infinite
    #[error("scale factor must be positive and finite, got {0}")]
    InvalidScaleFactor(f64),

    /// Scaled limit leaves no headroom for the increment in the accumulator word
    #[error("scaled limit {limit} exceeds the {bits}-bit safe bound {bound}")]
    LimitOverflow {
        /// Rounded limit (may exceed any integer width)
        limit: f64,
        /// Accumulator width in bits
        bits: u32,
        /// Largest admissible limit, 2^(bits-1)
        bound: u64,
    },

    /// The accumulator would never reach the limit
    #[error("scaled increment rounds to zero; the accumulator would never pulse")]
    ZeroIncrement,

    /// More than one pulse per sampling event would be required
    #[error("increment {increment} exceeds limit {limit}")]
    IncrementExceedsLimit {
        /// Scaled increment
        increment: u64,
        /// Scaled limit
        limit: u64,
    },

    /// Accumulator width other than 8, 16, 32 or 64 bits
    #[error("unsupported accumulator width: {0} bits")]
    UnsupportedWidth(u32),

    /// Drift report interval of zero events
    #[error("report interval must be at least one sampling event")]
    ZeroReportInterval,

    /// Target unit base used by the drift observer is not usable
    #[error("target unit base must be positive and finite, got {0}")]
    InvalidUnitBase(f64),
}

/// Error types for clock derivation, driving and diagnostics
#[derive(thiserror::Error, Debug)]
pub enum SiderealError {
    /// Rejected clock configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Error while parsing a configuration file
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error from filesystem or thread spawning
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing the drift log
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error writing the rendered output pin
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for clock operations
pub type Result<T> = std::result::Result<T, SiderealError>;

// Public API exports
pub use accumulator::{step, AccumulatorState, TickAccumulator};
pub use config::ClockConfig;
pub use deriver::{derive, AccumulatorWidth, FrequencyPair, ScaleFactor, ScaledConfig, Word};
pub use driver::{
    spawn, DriverHandle, DriverStats, PinMode, PinOutput, PulseCounter, PulseSink, RunBudget,
    SamplingDriver,
};
#[cfg(feature = "export-wav")]
pub use driver::wav::WavPulseWriter;
pub use observer::{CsvDriftLog, DriftObserver, DriftSample};
