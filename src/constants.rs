//! Reference Clock Constants
//!
//! Values for the reference build: an ATmega328 at 16 MHz whose 8-bit timer
//! overflow drives the accumulator, generating the 32768 Hz timebase of a
//! sidereal clock.

/// Ticks per second of a standard watch crystal
pub const SOLAR_TICKS_PER_SECOND: f64 = 32_768.0;

/// Ratio of solar to sidereal second length
///
/// A sidereal second is `1 / SIDEREAL_MULTIPLIER` solar seconds, so a sidereal
/// clock gains roughly one second every 366.25 solar seconds.
pub const SIDEREAL_MULTIPLIER: f64 = 1.002_737_909_35;

/// ATmega328 CPU clock
pub const ATMEGA328_CPU_HZ: f64 = 16_000_000.0;

/// Counts per overflow of an 8-bit timer
pub const TIMER8_OVERFLOW_TICKS: f64 = 256.0;

/// Scale factor used by the reference sketch
///
/// Only safe with a 64-bit accumulator: `62500 * 70000 = 4_375_000_000` is
/// above the 32-bit headroom bound of 2^31.
pub const REFERENCE_SCALE_FACTOR: f64 = 70_000.0;

/// Sidereal ticks per solar second for the reference build
#[inline]
pub fn sidereal_ticks_per_solar_second() -> f64 {
    SOLAR_TICKS_PER_SECOND * SIDEREAL_MULTIPLIER
}

/// Timer overflows per second for the reference build
#[inline]
pub fn atmega328_overflows_per_second() -> f64 {
    ATMEGA328_CPU_HZ / TIMER8_OVERFLOW_TICKS
}
