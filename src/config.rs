//! Clock Configuration
//!
//! Startup constants for the rate converter, loadable from JSON. Only plain
//! values live here; validation happens when the frequency pair and scaled
//! constants are derived.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ATMEGA328_CPU_HZ, REFERENCE_SCALE_FACTOR, SIDEREAL_MULTIPLIER, SOLAR_TICKS_PER_SECOND,
    TIMER8_OVERFLOW_TICKS,
};
use crate::deriver::{AccumulatorWidth, FrequencyPair, ScaleFactor};
use crate::{ConfigError, Result, SiderealError};

/// Clock configuration
///
/// Missing fields take the reference ATmega328 sidereal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    /// Output ticks per target second (32768 for a watch crystal)
    pub solar_ticks: f64,
    /// Target seconds per solar second
    pub sidereal_multiplier: f64,
    /// CPU clock feeding the timer
    pub cpu_hz: f64,
    /// Timer prescaler
    pub prescaler: f64,
    /// Timer counts per overflow
    pub timer_ticks: f64,
    /// Accumulator width
    pub width: AccumulatorWidth,
    /// Fixed scale factor; `None` picks the largest safe one
    pub scale_factor: Option<f64>,
    /// Drift report interval in solar seconds
    pub report_every_seconds: u64,
    /// Simulated run length in solar seconds
    pub test_seconds: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::sidereal_atmega328()
    }
}

impl ClockConfig {
    /// 32768 ticks per sidereal second from a 16 MHz ATmega328 8-bit timer
    pub fn sidereal_atmega328() -> Self {
        Self {
            solar_ticks: SOLAR_TICKS_PER_SECOND,
            sidereal_multiplier: SIDEREAL_MULTIPLIER,
            cpu_hz: ATMEGA328_CPU_HZ,
            prescaler: 1.0,
            timer_ticks: TIMER8_OVERFLOW_TICKS,
            width: AccumulatorWidth::W64,
            scale_factor: Some(REFERENCE_SCALE_FACTOR),
            report_every_seconds: 10,
            test_seconds: 1000,
        }
    }

    /// Parse a JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SiderealError::ParseError(e.to_string()))
    }

    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded clock configuration");
        Ok(config)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SiderealError::Other(e.to_string()))
    }

    /// Desired output pulses per solar second
    pub fn target_rate(&self) -> f64 {
        self.solar_ticks * self.sidereal_multiplier
    }

    /// Timer overflows per solar second
    pub fn sampling_rate(&self) -> f64 {
        self.cpu_hz / (self.prescaler * self.timer_ticks)
    }

    /// Validated frequency pair
    pub fn frequency_pair(&self) -> std::result::Result<FrequencyPair, ConfigError> {
        FrequencyPair::new(self.target_rate(), self.sampling_rate())
    }

    /// Scale factor selection
    pub fn scale(&self) -> ScaleFactor {
        ScaleFactor::from_option(self.scale_factor)
    }

    /// Sampling events per drift report
    pub fn report_every_events(&self) -> u64 {
        (self.sampling_rate() * self.report_every_seconds as f64).round() as u64
    }

    /// Sampling events in the whole simulated run
    pub fn test_events(&self) -> u64 {
        (self.sampling_rate() * self.test_seconds as f64).round() as u64
    }

    /// Set accumulator width
    pub fn width(mut self, width: AccumulatorWidth) -> Self {
        self.width = width;
        self
    }

    /// Set or clear the fixed scale factor
    pub fn scale_factor(mut self, scale_factor: Option<f64>) -> Self {
        self.scale_factor = scale_factor;
        self
    }
}
