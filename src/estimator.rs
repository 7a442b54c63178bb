// Counter-to-rate estimation

use crate::models::{RateObservation, RawSample, Reading};

/// Minimum seconds between two counter samples before a rate is computed.
/// Back-to-back ticks below this produce no observation rather than noise
/// from a near-zero divisor.
pub const DEFAULT_MIN_INTERVAL_SECS: f64 = 0.1;

/// Turns successive readings into bandwidth observations.
///
/// Cumulative-counter readings are diffed against the previously stored
/// sample; already-computed rates (the scrape variant) pass straight through
/// and never touch stored state. One estimator belongs to exactly one
/// subscriber; the previous-sample state must not be shared.
#[derive(Debug)]
pub struct RateEstimator {
    min_interval_secs: f64,
    last: Option<RawSample>,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::with_min_interval(DEFAULT_MIN_INTERVAL_SECS)
    }

    pub fn with_min_interval(min_interval_secs: f64) -> Self {
        Self {
            min_interval_secs,
            last: None,
        }
    }

    /// Consumes one reading; returns an observation when one is defined.
    pub fn update(&mut self, reading: Reading) -> Option<RateObservation> {
        match reading {
            Reading::Rates {
                rx_bps,
                tx_bps,
                captured_at,
            } => Some(RateObservation {
                rx_bps,
                tx_bps,
                observed_at: captured_at,
            }),
            Reading::Counters(sample) => self.update_counters(sample),
        }
    }

    fn update_counters(&mut self, sample: RawSample) -> Option<RateObservation> {
        let Some(prev) = self.last else {
            // First sample only establishes the baseline.
            self.last = Some(sample);
            return None;
        };

        let elapsed_secs = sample.captured_at.saturating_sub(prev.captured_at) as f64 / 1000.0;
        if elapsed_secs < self.min_interval_secs {
            // State untouched: the next sample still diffs against `prev`.
            return None;
        }

        // A counter that went backwards reset or wrapped; the interval's true
        // rate is unrecoverable and reported as zero.
        let delta_rx = sample.rx_bytes.saturating_sub(prev.rx_bytes);
        let delta_tx = sample.tx_bytes.saturating_sub(prev.tx_bytes);

        let rx_bps = delta_rx as f64 * 8.0 / elapsed_secs;
        let tx_bps = delta_tx as f64 * 8.0 / elapsed_secs;

        self.last = Some(sample);
        Some(RateObservation {
            rx_bps,
            tx_bps,
            observed_at: sample.captured_at,
        })
    }

    /// Last successfully stored counter sample, if any.
    pub fn last_sample(&self) -> Option<RawSample> {
        self.last
    }
}
