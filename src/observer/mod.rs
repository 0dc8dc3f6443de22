//! Drift Observation
//!
//! Diagnostic bookkeeping over the pulse stream. Compares elapsed time measured
//! in sampling events with elapsed time measured in emitted pulses, every
//! `report_every` events. Never touches accumulator state.

mod csv_log;

pub use csv_log::CsvDriftLog;

use serde::Serialize;

use crate::deriver::FrequencyPair;
use crate::ConfigError;

/// One periodic drift report
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftSample {
    /// Sampling events seen so far
    pub elapsed_sampling_events: u64,
    /// Pulses emitted so far
    pub emitted_pulses: u64,
    /// Elapsed time in sampling units (seconds of the sampling clock)
    pub elapsed_sampling_units: f64,
    /// Elapsed time in target units (pulses / target unit base)
    pub elapsed_target_units: f64,
    /// `elapsed_target_units - elapsed_sampling_units`
    pub computed_offset: f64,
    /// Ideal pulse count at the nominal rates minus pulses emitted
    pub phase_error_pulses: f64,
}

/// Tracks elapsed events and pulses over a long run
#[derive(Debug, Clone)]
pub struct DriftObserver {
    pair: FrequencyPair,
    target_unit_base: f64,
    report_every: u64,
    events: u64,
    pulses: u64,
    until_report: u64,
    /// Most negative and most positive phase error seen at report points
    phase_error_range: Option<(f64, f64)>,
}

impl DriftObserver {
    /// Create an observer
    ///
    /// `target_unit_base` is the number of pulses that make up one target unit;
    /// 32768 turns pulse counts into sidereal seconds.
    pub fn new(
        pair: FrequencyPair,
        target_unit_base: f64,
        report_every: u64,
    ) -> Result<Self, ConfigError> {
        if report_every == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }
        if !(target_unit_base.is_finite() && target_unit_base > 0.0) {
            return Err(ConfigError::InvalidUnitBase(target_unit_base));
        }
        Ok(DriftObserver {
            pair,
            target_unit_base,
            report_every,
            events: 0,
            pulses: 0,
            until_report: report_every,
            phase_error_range: None,
        })
    }

    /// Observer whose target unit is one second of the target rate
    ///
    /// With this base the offset is the pure conversion drift and stays within
    /// one sampling interval plus the constants' rounding.
    pub fn for_pair(pair: FrequencyPair, report_every: u64) -> Result<Self, ConfigError> {
        Self::new(pair, pair.target_rate(), report_every)
    }

    /// Record one sampling event
    /// Returns a sample every `report_every` events
    pub fn observe(&mut self, pulse: bool) -> Option<DriftSample> {
        self.events += 1;
        if pulse {
            self.pulses += 1;
        }
        self.until_report -= 1;
        if self.until_report > 0 {
            return None;
        }
        self.until_report = self.report_every;

        let sample = self.sample();
        self.phase_error_range = Some(match self.phase_error_range {
            Some((lo, hi)) => (
                lo.min(sample.phase_error_pulses),
                hi.max(sample.phase_error_pulses),
            ),
            None => (sample.phase_error_pulses, sample.phase_error_pulses),
        });
        Some(sample)
    }

    /// Compute a sample at the current position
    pub fn sample(&self) -> DriftSample {
        let elapsed_sampling_units = self.events as f64 / self.pair.sampling_rate();
        let elapsed_target_units = self.pulses as f64 / self.target_unit_base;
        DriftSample {
            elapsed_sampling_events: self.events,
            emitted_pulses: self.pulses,
            elapsed_sampling_units,
            elapsed_target_units,
            computed_offset: elapsed_target_units - elapsed_sampling_units,
            phase_error_pulses: elapsed_sampling_units * self.pair.target_rate()
                - self.pulses as f64,
        }
    }

    /// Extreme phase errors over all reports so far
    pub fn phase_error_range(&self) -> Option<(f64, f64)> {
        self.phase_error_range
    }

    /// Sampling events observed
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Pulses observed
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Report interval in sampling events
    pub fn report_every(&self) -> u64 {
        self.report_every
    }
}
