//! Parameter Derivation
//!
//! Converts the real-valued target and sampling rates into the integer
//! increment/limit pair consumed by the accumulator. All rounding happens
//! here, once, off the hot path.

mod word;

pub use word::{AccumulatorWidth, Word};

use num_traits::NumCast;

use crate::ConfigError;

/// Target pulse rate and sampling event rate, in the same time base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyPair {
    target_rate: f64,
    sampling_rate: f64,
}

impl FrequencyPair {
    /// Validate and create a frequency pair
    ///
    /// Both rates must be positive and finite, and the target must be strictly
    /// below the sampling rate since at most one pulse is emitted per event.
    pub fn new(target_rate: f64, sampling_rate: f64) -> Result<Self, ConfigError> {
        check_rate("target rate", target_rate)?;
        check_rate("sampling rate", sampling_rate)?;
        if target_rate >= sampling_rate {
            return Err(ConfigError::TargetNotBelowSampling {
                target: target_rate,
                sampling: sampling_rate,
            });
        }
        Ok(FrequencyPair {
            target_rate,
            sampling_rate,
        })
    }

    /// Desired output pulse rate
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Rate of sampling events
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Ideal pulses per sampling event
    pub fn ratio(&self) -> f64 {
        self.target_rate / self.sampling_rate
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveRate { name, value })
    }
}

/// How the deriver picks the scale factor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScaleFactor {
    /// Largest factor that keeps the limit within the word's headroom
    #[default]
    Auto,
    /// Integrator-chosen constant, validated against the word width
    Fixed(f64),
}

impl ScaleFactor {
    /// `Fixed` when a constant is given, `Auto` otherwise
    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(ScaleFactor::Auto, ScaleFactor::Fixed)
    }
}

/// Immutable integer constants for the accumulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledConfig<W: Word> {
    increment: W,
    limit: W,
    scale_factor: f64,
}

impl<W: Word> ScaledConfig<W> {
    /// Build a config from raw integers
    ///
    /// Applies the same checks as [`derive`]: `0 < increment <= limit <= 2^(W-1)`.
    /// The scale factor is recorded as 1.
    pub fn from_parts(increment: W, limit: W) -> Result<Self, ConfigError> {
        let bound = W::safe_limit();
        if limit > bound {
            return Err(limit_overflow::<W>(to_u64(limit) as f64));
        }
        Self::validated(increment, limit, 1.0)
    }

    fn validated(increment: W, limit: W, scale_factor: f64) -> Result<Self, ConfigError> {
        if increment.is_zero() {
            return Err(ConfigError::ZeroIncrement);
        }
        if increment > limit {
            return Err(ConfigError::IncrementExceedsLimit {
                increment: to_u64(increment),
                limit: to_u64(limit),
            });
        }
        if increment == limit {
            tracing::warn!(
                increment = %increment,
                "increment equals limit; every sampling event will pulse"
            );
        }
        Ok(ScaledConfig {
            increment,
            limit,
            scale_factor,
        })
    }

    /// Amount added to the error term every sampling event
    #[inline]
    pub fn increment(&self) -> W {
        self.increment
    }

    /// Error threshold at which a pulse is emitted
    #[inline]
    pub fn limit(&self) -> W {
        self.limit
    }

    /// Scale factor applied to both rates before rounding
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Accumulator width this config was validated for
    pub fn width(&self) -> AccumulatorWidth {
        W::WIDTH
    }

    /// True for the legal but pointless 1:1 conversion
    pub fn is_passthrough(&self) -> bool {
        self.increment == self.limit
    }

    /// Pulses per sampling event actually realized by the integer constants
    pub fn ratio(&self) -> f64 {
        to_u64(self.increment) as f64 / to_u64(self.limit) as f64
    }

    /// Output rate realized at the given sampling rate
    pub fn effective_rate(&self, sampling_rate: f64) -> f64 {
        sampling_rate * self.ratio()
    }

    /// Rounding error of the realized rate versus the nominal target, in parts per billion
    pub fn rate_error_ppb(&self, pair: &FrequencyPair) -> f64 {
        (self.ratio() / pair.ratio() - 1.0) * 1e9
    }

    /// Shortest and longest run of sampling events between two pulses
    pub fn pulse_gap_bounds(&self) -> (u64, u64) {
        let inc = to_u64(self.increment);
        let limit = to_u64(self.limit);
        (limit / inc, limit.div_ceil(inc))
    }
}

/// Derive accumulator constants for a frequency pair
///
/// `increment = round(target * s)` and `limit = round(sampling * s)`, where `s`
/// is either the largest factor keeping `limit <= 2^(W-1)` or the given fixed
/// factor. Fails if the fixed factor overflows the word or the rounded
/// constants are degenerate.
pub fn derive<W: Word>(pair: &FrequencyPair, scale: ScaleFactor) -> Result<ScaledConfig<W>, ConfigError> {
    let bound = W::WIDTH.safe_limit() as f64;
    let s = match scale {
        ScaleFactor::Auto => bound / pair.sampling_rate,
        ScaleFactor::Fixed(s) => s,
    };
    if !(s.is_finite() && s > 0.0) {
        return Err(ConfigError::InvalidScaleFactor(s));
    }

    let limit = (pair.sampling_rate * s).round();
    let increment = (pair.target_rate * s).round();
    if limit > bound {
        return Err(limit_overflow::<W>(limit));
    }

    let limit_word = <W as NumCast>::from(limit).ok_or_else(|| limit_overflow::<W>(limit))?;
    let increment_word = <W as NumCast>::from(increment).ok_or(ConfigError::IncrementExceedsLimit {
        increment: increment as u64,
        limit: limit as u64,
    })?;

    let config = ScaledConfig::validated(increment_word, limit_word, s)?;
    tracing::debug!(
        width = %W::WIDTH,
        scale_factor = s,
        increment = %config.increment,
        limit = %config.limit,
        "derived accumulator constants"
    );
    Ok(config)
}

fn limit_overflow<W: Word>(limit: f64) -> ConfigError {
    ConfigError::LimitOverflow {
        limit,
        bits: W::WIDTH.bits(),
        bound: W::WIDTH.safe_limit(),
    }
}

#[inline]
pub(crate) fn to_u64<W: Word>(value: W) -> u64 {
    // Every supported word fits in u64
    value.to_u64().unwrap_or(u64::MAX)
}
