//! Long-run behaviour of the rate converter.
//!
//! Checks the bounded-error invariant on random configurations, the absence of
//! drift on the reference sidereal constants, determinism and invariance
//! under integer scaling.

use approx::assert_abs_diff_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sidereal_clock::constants::{
    atmega328_overflows_per_second, sidereal_ticks_per_solar_second, REFERENCE_SCALE_FACTOR,
    SOLAR_TICKS_PER_SECOND,
};
use sidereal_clock::{
    derive, step, AccumulatorState, DriftObserver, FrequencyPair, PulseCounter, SamplingDriver,
    ScaleFactor, ScaledConfig, TickAccumulator,
};

fn reference_pair() -> FrequencyPair {
    FrequencyPair::new(sidereal_ticks_per_solar_second(), atmega328_overflows_per_second()).unwrap()
}

fn pulse_sequence<W: sidereal_clock::Word>(config: ScaledConfig<W>, events: usize) -> Vec<bool> {
    let mut acc = TickAccumulator::new(config);
    (0..events).map(|_| acc.clock()).collect()
}

#[test]
fn error_stays_below_limit_for_random_configs() {
    let mut rng = SmallRng::seed_from_u64(0x5EED_0001);

    for _ in 0..2_000 {
        let limit: u32 = rng.random_range(2..=(1u32 << 31));
        let increment: u32 = rng.random_range(1..=limit);
        let config = ScaledConfig::from_parts(increment, limit).unwrap();

        let mut state = AccumulatorState::new();
        let mut pulses = 0u64;
        for _ in 0..2_000 {
            let (next, pulse) = step(state, &config);
            state = next;
            pulses += pulse as u64;
            assert!(state.error() < limit, "error {} >= limit {}", state.error(), limit);
        }
        // pulses = floor(n * increment / limit)
        assert_eq!(pulses, 2_000 * increment as u64 / limit as u64);
    }
}

#[test]
fn narrow_words_never_overflow() {
    let mut rng = SmallRng::seed_from_u64(0x5EED_0002);

    for _ in 0..500 {
        let limit: u8 = rng.random_range(1..=128);
        let increment: u8 = rng.random_range(1..=limit);
        let config = ScaledConfig::from_parts(increment, limit).unwrap();
        let mut acc = TickAccumulator::new(config);
        for _ in 0..10_000 {
            acc.clock();
            assert!(acc.error() < limit);
        }
    }
}

#[test]
fn reference_constants_do_not_drift() {
    let pair = reference_pair();
    let config = derive::<u64>(&pair, ScaleFactor::Fixed(REFERENCE_SCALE_FACTOR)).unwrap();
    let increment = config.increment() as u128;
    let limit = config.limit() as u128;

    let mut driver = SamplingDriver::new(config);
    let mut counter = PulseCounter::new();
    let mut done = 0u64;

    for checkpoint in [100_000u64, 1_000_000, 10_000_000] {
        driver.run(checkpoint - done, &mut counter).unwrap();
        done = checkpoint;

        let n = checkpoint as u128;
        let pulses = counter.pulses() as u128;
        // Emitted pulses lag the exact integer schedule by less than one pulse
        assert!(pulses * limit <= n * increment);
        assert!(n * increment < (pulses + 1) * limit);
        assert_eq!(
            driver.accumulator().error() as u128,
            n * increment - pulses * limit
        );

        let rate_error = (counter.pulses() as f64 / checkpoint as f64 - pair.ratio()).abs();
        assert!(rate_error < 1.0 / checkpoint as f64 + 1.0 / limit as f64);
    }

    assert_eq!(counter.gap_range(), Some(config.pulse_gap_bounds()));
}

#[test]
fn sidereal_offset_grows_at_sidereal_rate() {
    let pair = reference_pair();
    let config = derive::<u64>(&pair, ScaleFactor::Fixed(REFERENCE_SCALE_FACTOR)).unwrap();
    let report_every = 625_000; // 10 solar seconds

    let mut sidereal = DriftObserver::new(pair, SOLAR_TICKS_PER_SECOND, report_every).unwrap();
    let mut target = DriftObserver::for_pair(pair, report_every).unwrap();
    let mut acc = TickAccumulator::new(config);
    let mut last = None;

    for _ in 0..report_every * 10 {
        let pulse = acc.clock();
        target.observe(pulse);
        if let Some(sample) = sidereal.observe(pulse) {
            last = Some(sample);
        }
    }

    let sample = last.unwrap();
    assert_eq!(sample.elapsed_sampling_events, 6_250_000);
    assert_abs_diff_eq!(sample.elapsed_sampling_units, 100.0);
    // About one extra sidereal second per 365 solar seconds
    assert_abs_diff_eq!(sample.computed_offset, 0.273_790_935, epsilon = 1.0 / 32_768.0);

    // Measured in target seconds, the conversion itself shows no drift
    let (lo, hi) = target.phase_error_range().unwrap();
    assert!(lo > -1.0 && hi < 1.0, "phase error range {lo}..{hi}");
    assert!(target.sample().computed_offset.abs() < 1.0 / pair.target_rate());
}

#[test]
fn pulse_sequence_is_deterministic() {
    let config = derive::<u32>(&reference_pair(), ScaleFactor::Auto).unwrap();
    let first = pulse_sequence(config, 200_000);
    let second = pulse_sequence(config, 200_000);
    assert_eq!(first, second);
}

#[test]
fn integer_scaling_preserves_sequence() {
    let mut rng = SmallRng::seed_from_u64(0x5EED_0003);

    for _ in 0..200 {
        let limit: u16 = rng.random_range(2..=(1u16 << 15));
        let increment: u16 = rng.random_range(1..limit);
        let base = ScaledConfig::<u16>::from_parts(increment, limit).unwrap();
        let expected = pulse_sequence(base, 5_000);

        let k: u64 = rng.random_range(1..=(1u64 << 47));
        let scaled =
            ScaledConfig::<u64>::from_parts(increment as u64 * k, limit as u64 * k).unwrap();
        assert_eq!(pulse_sequence(scaled, 5_000), expected);
    }
}

#[test]
fn auto_scale_widths_agree_over_short_runs() {
    // Wider words only refine the ratio; the first few hundred pulses match
    let pair = reference_pair();
    let seq32 = pulse_sequence(derive::<u32>(&pair, ScaleFactor::Auto).unwrap(), 1_000);
    let seq64 = pulse_sequence(derive::<u64>(&pair, ScaleFactor::Auto).unwrap(), 1_000);
    assert_eq!(seq32, seq64);
}
