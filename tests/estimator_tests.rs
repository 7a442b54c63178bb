// Rate estimator invariants: bootstrap, interval gate, reset clamp, passthrough

use ratewatch::estimator::RateEstimator;
use ratewatch::models::{RawSample, Reading};

fn counters(rx_bytes: u64, tx_bytes: u64, captured_at: u64) -> Reading {
    Reading::Counters(RawSample {
        rx_bytes,
        tx_bytes,
        captured_at,
    })
}

#[test]
fn first_sample_only_establishes_baseline() {
    let mut est = RateEstimator::new();
    assert!(est.update(counters(123_456, 789_000, 5_000)).is_none());
    assert_eq!(est.last_sample().map(|s| s.rx_bytes), Some(123_456));
}

#[test]
fn consecutive_samples_yield_bits_per_second() {
    // (rx=1000, t=0) then (rx=1800, t=1000ms) => rx_bps = 800*8/1.0 = 6400
    let mut est = RateEstimator::new();
    assert!(est.update(counters(1000, 500, 0)).is_none());
    let obs = est.update(counters(1800, 700, 1000)).expect("observation");
    assert_eq!(obs.rx_bps, 6400.0);
    assert_eq!(obs.tx_bps, 1600.0);
    assert_eq!(obs.observed_at, 1000);

    let wire = ratewatch::models::ObservationMessage::from(obs);
    assert_eq!(wire.rx_mbps, 0.0064);
}

#[test]
fn rates_are_never_negative_for_monotonic_counters() {
    let mut est = RateEstimator::new();
    est.update(counters(5000, 5000, 0));
    let obs = est.update(counters(5000, 9000, 2000)).expect("observation");
    assert!(obs.rx_bps >= 0.0);
    assert!(obs.tx_bps >= 0.0);
    assert_eq!(obs.rx_bps, 0.0); // no traffic, not negative noise
}

#[test]
fn counter_reset_clamps_rate_to_zero() {
    // Device rebooted: counters restarted below the previous values.
    let mut est = RateEstimator::new();
    est.update(counters(1_000_000, 2_000_000, 0));
    let obs = est.update(counters(400, 999, 1000)).expect("observation");
    assert_eq!(obs.rx_bps, 0.0);
    assert_eq!(obs.tx_bps, 0.0);
    // The reset sample becomes the new baseline.
    assert_eq!(est.last_sample().map(|s| s.rx_bytes), Some(400));
}

#[test]
fn near_zero_interval_yields_nothing_and_keeps_state() {
    let mut est = RateEstimator::new();
    est.update(counters(1000, 1000, 0));
    // 50 ms < 0.1 s gate: rejected, and the rejected sample is NOT stored.
    assert!(est.update(counters(9_999_999, 9_999_999, 50)).is_none());
    assert_eq!(est.last_sample().map(|s| s.rx_bytes), Some(1000));

    // The next sample still diffs against the original baseline.
    let obs = est.update(counters(1800, 1000, 1000)).expect("observation");
    assert_eq!(obs.rx_bps, 6400.0);
}

#[test]
fn min_interval_is_parameterizable() {
    let mut est = RateEstimator::with_min_interval(1.0);
    est.update(counters(0, 0, 0));
    assert!(est.update(counters(100, 100, 500)).is_none());
    assert!(est.update(counters(100, 100, 1000)).is_some());
}

#[test]
fn already_computed_rates_pass_through_unchanged() {
    let mut est = RateEstimator::new();
    let reading = Reading::Rates {
        rx_bps: 5_000_000.0,
        tx_bps: 2_000_000.0,
        captured_at: 42,
    };
    // Always yields, from the very first call, and never touches state.
    let obs = est.update(reading).expect("observation");
    assert_eq!(obs.rx_bps, 5_000_000.0);
    assert_eq!(obs.tx_bps, 2_000_000.0);
    assert_eq!(obs.observed_at, 42);
    assert!(est.last_sample().is_none());

    let again = est.update(reading).expect("observation");
    assert_eq!(again.rx_bps, 5_000_000.0);
}

#[test]
fn clock_going_backwards_is_gated() {
    let mut est = RateEstimator::new();
    est.update(counters(1000, 1000, 10_000));
    // Earlier timestamp than the baseline: elapsed saturates to zero.
    assert!(est.update(counters(2000, 2000, 9_000)).is_none());
    assert_eq!(est.last_sample().map(|s| s.captured_at), Some(10_000));
}
