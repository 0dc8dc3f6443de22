//! Sampling Drivers and Output Sinks
//!
//! A driver is the sole caller of the accumulator: it delivers sampling events
//! at the configured cadence and hands every pulse decision to a [`PulseSink`]
//! standing in for the physical output pin.
//!
//! ## Sinks
//!
//! - [`PulseCounter`]: pulse totals and spacing statistics
//! - [`PinOutput`]: simulated clock output pin
//! - `WavPulseWriter` (`export-wav`): pin level rendered to a WAV file

mod threaded;
#[cfg(feature = "export-wav")]
pub mod wav;

pub use threaded::{spawn, DriverHandle, DriverStats, RunBudget};

use crate::accumulator::TickAccumulator;
use crate::deriver::{ScaledConfig, Word};
use crate::observer::{DriftObserver, DriftSample};

/// Consumer of the per-event pulse decision
pub trait PulseSink {
    /// Called once per sampling event
    fn on_event(&mut self, pulse: bool) -> crate::Result<()>;

    /// Called once when the driver stops
    fn finish(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

impl<S: PulseSink + ?Sized> PulseSink for &mut S {
    fn on_event(&mut self, pulse: bool) -> crate::Result<()> {
        (**self).on_event(pulse)
    }

    fn finish(&mut self) -> crate::Result<()> {
        (**self).finish()
    }
}

impl<A: PulseSink, B: PulseSink> PulseSink for (A, B) {
    fn on_event(&mut self, pulse: bool) -> crate::Result<()> {
        self.0.on_event(pulse)?;
        self.1.on_event(pulse)
    }

    fn finish(&mut self) -> crate::Result<()> {
        self.0.finish()?;
        self.1.finish()
    }
}

impl<S: PulseSink> PulseSink for Option<S> {
    fn on_event(&mut self, pulse: bool) -> crate::Result<()> {
        match self {
            Some(sink) => sink.on_event(pulse),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> crate::Result<()> {
        match self {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }
}

/// Discards every event
impl PulseSink for () {
    fn on_event(&mut self, _pulse: bool) -> crate::Result<()> {
        Ok(())
    }
}

/// Counts pulses and the spacing between them
#[derive(Debug, Clone, Default)]
pub struct PulseCounter {
    events: u64,
    pulses: u64,
    /// Event index of the last pulse
    last_pulse_at: Option<u64>,
    /// Shortest and longest gap in sampling events between consecutive pulses
    gap_range: Option<(u64, u64)>,
}

impl PulseCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Sampling events seen
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Pulses seen
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Shortest and longest pulse spacing, once two pulses have been seen
    pub fn gap_range(&self) -> Option<(u64, u64)> {
        self.gap_range
    }
}

impl PulseSink for PulseCounter {
    #[inline]
    fn on_event(&mut self, pulse: bool) -> crate::Result<()> {
        self.events += 1;
        if pulse {
            self.pulses += 1;
            if let Some(last) = self.last_pulse_at {
                let gap = self.events - last;
                self.gap_range = Some(match self.gap_range {
                    Some((lo, hi)) => (lo.min(gap), hi.max(gap)),
                    None => (gap, gap),
                });
            }
            self.last_pulse_at = Some(self.events);
        }
        Ok(())
    }
}

/// How a pulse drives the simulated output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinMode {
    /// Invert the pin on every pulse (square wave at half the pulse rate)
    #[default]
    Toggle,
    /// Drive the pin high for the sampling event that pulsed, low otherwise
    Strobe,
}

impl PinMode {
    /// Parse pin mode from string argument.
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "toggle" => Some(PinMode::Toggle),
            "strobe" => Some(PinMode::Strobe),
            _ => None,
        }
    }

    /// Get string representation of pin mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            PinMode::Toggle => "toggle",
            PinMode::Strobe => "strobe",
        }
    }
}

impl std::fmt::Display for PinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated clock output pin
#[derive(Debug, Clone, Default)]
pub struct PinOutput {
    mode: PinMode,
    level: bool,
    rising_edges: u64,
}

impl PinOutput {
    /// Pin starting low
    pub fn new(mode: PinMode) -> Self {
        PinOutput {
            mode,
            level: false,
            rising_edges: 0,
        }
    }

    /// Current pin level
    pub fn level(&self) -> bool {
        self.level
    }

    /// Low-to-high transitions so far
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }

    /// Update the level for one event and return it
    #[inline]
    pub fn drive(&mut self, pulse: bool) -> bool {
        let next = match self.mode {
            PinMode::Toggle => self.level ^ pulse,
            PinMode::Strobe => pulse,
        };
        if next && !self.level {
            self.rising_edges += 1;
        }
        self.level = next;
        next
    }
}

impl PulseSink for PinOutput {
    #[inline]
    fn on_event(&mut self, pulse: bool) -> crate::Result<()> {
        self.drive(pulse);
        Ok(())
    }
}

/// Synchronous driver running the accumulator in the caller's context
#[derive(Debug, Clone)]
pub struct SamplingDriver<W: Word> {
    accumulator: TickAccumulator<W>,
    events: u64,
    pulse_remainder_range: Option<(W, W)>,
}

impl<W: Word> SamplingDriver<W> {
    /// Create a driver with a fresh accumulator
    pub fn new(config: ScaledConfig<W>) -> Self {
        SamplingDriver {
            accumulator: TickAccumulator::new(config),
            events: 0,
            pulse_remainder_range: None,
        }
    }

    /// Deliver `events` sampling events to the accumulator and sink
    ///
    /// On a sink error the failing event stays counted, since the accumulator
    /// has already advanced past it.
    pub fn run<S: PulseSink>(&mut self, events: u64, sink: &mut S) -> crate::Result<()> {
        for _ in 0..events {
            let pulse = self.tick();
            sink.on_event(pulse)?;
        }
        Ok(())
    }

    /// Like [`SamplingDriver::run`], also feeding an observer
    ///
    /// `on_report` receives every sample the observer produces. The observer
    /// sees each event before the sink does, so it stays in step with
    /// [`SamplingDriver::events`] when the sink fails.
    pub fn run_observed<S, F>(
        &mut self,
        events: u64,
        sink: &mut S,
        observer: &mut DriftObserver,
        mut on_report: F,
    ) -> crate::Result<()>
    where
        S: PulseSink,
        F: FnMut(DriftSample) -> crate::Result<()>,
    {
        for _ in 0..events {
            let pulse = self.tick();
            let report = observer.observe(pulse);
            sink.on_event(pulse)?;
            if let Some(sample) = report {
                on_report(sample)?;
            }
        }
        Ok(())
    }

    #[inline]
    fn tick(&mut self) -> bool {
        let pulse = self.accumulator.clock();
        self.events += 1;
        if pulse {
            let remainder = self.accumulator.error();
            self.pulse_remainder_range = Some(match self.pulse_remainder_range {
                Some((lo, hi)) => (lo.min(remainder), hi.max(remainder)),
                None => (remainder, remainder),
            });
        }
        pulse
    }

    /// Sampling events delivered so far
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Smallest and largest error term left right after a pulse
    pub fn pulse_remainder_range(&self) -> Option<(W, W)> {
        self.pulse_remainder_range
    }

    /// Get the accumulator
    pub fn accumulator(&self) -> &TickAccumulator<W> {
        &self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_gaps_match_bounds() {
        let config = ScaledConfig::<u8>::from_parts(10, 32).unwrap();
        let mut driver = SamplingDriver::new(config);
        let mut counter = PulseCounter::new();
        driver.run(3200, &mut counter).unwrap();

        assert_eq!(counter.events(), 3200);
        assert_eq!(counter.pulses(), 1000);
        let (lo, hi) = counter.gap_range().unwrap();
        assert_eq!((lo, hi), config.pulse_gap_bounds());
    }

    #[test]
    fn test_pin_toggle_halves_rate() {
        let mut pin = PinOutput::new(PinMode::Toggle);
        for pulse in [true, false, true, true, false, true] {
            pin.drive(pulse);
        }
        assert_eq!(pin.rising_edges(), 2);
        assert!(!pin.level());
    }

    #[test]
    fn test_pin_strobe_follows_pulse() {
        let mut pin = PinOutput::new(PinMode::Strobe);
        assert!(pin.drive(true));
        assert!(pin.drive(true));
        assert!(!pin.drive(false));
        assert!(pin.drive(true));
        assert_eq!(pin.rising_edges(), 2);
    }

    #[test]
    fn test_pair_sink_and_observer() {
        let config = ScaledConfig::<u16>::from_parts(10, 32).unwrap();
        let pair = crate::deriver::FrequencyPair::new(10.0, 32.0).unwrap();
        let mut observer = DriftObserver::for_pair(pair, 32).unwrap();
        let mut sink = (PulseCounter::new(), PinOutput::new(PinMode::Strobe));
        let mut reports = Vec::new();

        let mut driver = SamplingDriver::new(config);
        driver
            .run_observed(320, &mut sink, &mut observer, |s| {
                reports.push(s);
                Ok(())
            })
            .unwrap();

        assert_eq!(driver.events(), 320);
        assert_eq!(sink.0.pulses(), 100);
        assert_eq!(sink.1.rising_edges(), 100);
        assert_eq!(reports.len(), 10);
        assert!(reports.iter().all(|s| s.phase_error_pulses == 0.0));
    }

    /// Accepts `ok` events, then fails every call
    struct FailAfter(u64);

    impl PulseSink for FailAfter {
        fn on_event(&mut self, _pulse: bool) -> crate::Result<()> {
            if self.0 == 0 {
                return Err(crate::SiderealError::Other("pin driver offline".into()));
            }
            self.0 -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_keeps_event_count() {
        let config = ScaledConfig::<u8>::from_parts(10, 32).unwrap();
        let mut driver = SamplingDriver::new(config);

        assert!(driver.run(10, &mut FailAfter(4)).is_err());
        assert_eq!(driver.events(), 5);
        assert_eq!(driver.accumulator().error(), 18);

        // Resuming continues the same event sequence
        driver.run(3, &mut PulseCounter::new()).unwrap();
        assert_eq!(driver.events(), 8);
        assert_eq!(driver.accumulator().error(), 16);
    }

    #[test]
    fn test_observer_in_step_after_sink_failure() {
        let config = ScaledConfig::<u8>::from_parts(10, 32).unwrap();
        let pair = crate::deriver::FrequencyPair::new(10.0, 32.0).unwrap();
        let mut observer = DriftObserver::for_pair(pair, 4).unwrap();
        let mut driver = SamplingDriver::new(config);

        let result = driver.run_observed(32, &mut FailAfter(6), &mut observer, |_| Ok(()));
        assert!(result.is_err());
        assert_eq!(driver.events(), 7);
        assert_eq!(observer.events(), 7);
        assert_eq!(observer.pulses(), 2);
    }

    #[test]
    fn test_pulse_remainder_range() {
        let config = ScaledConfig::<u8>::from_parts(10, 32).unwrap();
        let mut driver = SamplingDriver::new(config);
        assert_eq!(driver.pulse_remainder_range(), None);

        // Remainders after the first pulses: 8, 6, 4, 2, 0
        driver.run(16, &mut ()).unwrap();
        assert_eq!(driver.pulse_remainder_range(), Some((0, 8)));
        driver.run(32, &mut ()).unwrap();
        assert_eq!(driver.pulse_remainder_range(), Some((0, 8)));
    }

    #[test]
    fn test_pin_mode_parse() {
        assert_eq!(PinMode::from_str("STROBE"), Some(PinMode::Strobe));
        assert_eq!(PinMode::from_str("pwm"), None);
        assert_eq!(PinMode::Toggle.to_string(), "toggle");
    }
}
