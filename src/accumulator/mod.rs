//! Bresenham Tick Accumulator
//!
//! Invoked once per sampling event. Adds the scaled target rate to an integer
//! error term and emits a pulse whenever the term reaches the scaled sampling
//! rate. Integer-only, allocation-free and total, so it can run from a timer
//! interrupt.

use crate::deriver::{ScaledConfig, Word};

/// Error term carried between sampling events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorState<W: Word> {
    error: W,
}

impl<W: Word> AccumulatorState<W> {
    /// Power-on state (error term zero)
    pub fn new() -> Self {
        AccumulatorState { error: W::zero() }
    }

    /// Current error term, always below the config's limit
    #[inline]
    pub fn error(&self) -> W {
        self.error
    }
}

impl<W: Word> Default for AccumulatorState<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the accumulator by one sampling event
///
/// Returns the next state and whether a pulse is emitted. Keeps
/// `0 <= error < limit`; the sum cannot overflow because the config
/// guarantees `increment <= limit <= 2^(W-1)`.
#[inline]
pub fn step<W: Word>(state: AccumulatorState<W>, config: &ScaledConfig<W>) -> (AccumulatorState<W>, bool) {
    let error = state.error + config.increment();
    if error >= config.limit() {
        (
            AccumulatorState {
                error: error - config.limit(),
            },
            true,
        )
    } else {
        (AccumulatorState { error }, false)
    }
}

/// Accumulator owning its config and state
///
/// Meant to be owned by the single context that receives sampling events.
#[derive(Debug, Clone)]
pub struct TickAccumulator<W: Word> {
    config: ScaledConfig<W>,
    state: AccumulatorState<W>,
}

impl<W: Word> TickAccumulator<W> {
    /// Create an accumulator in power-on state
    pub fn new(config: ScaledConfig<W>) -> Self {
        TickAccumulator {
            config,
            state: AccumulatorState::new(),
        }
    }

    /// Clock by one sampling event
    /// Returns true if a pulse should be emitted
    #[inline]
    pub fn clock(&mut self) -> bool {
        let (state, pulse) = step(self.state, &self.config);
        self.state = state;
        pulse
    }

    /// Current error term
    #[inline]
    pub fn error(&self) -> W {
        self.state.error()
    }

    /// Copy of the current state
    pub fn state(&self) -> AccumulatorState<W> {
        self.state
    }

    /// Return to power-on state
    pub fn reset(&mut self) {
        self.state = AccumulatorState::new();
    }
}
