//! Per-metric debounce.
//!
//! A metric only alerts after `threshold` consecutive bad verdicts. Any good
//! or initializing verdict resets the streak to zero; there is no partial
//! decay.

use crate::health::verdict::HealthVerdict;

/// Default number of consecutive bad samples before alerting.
pub const DEFAULT_ALERT_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisTracker {
    consecutive_bad: u32,
    threshold: u32,
}

impl HysteresisTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_bad: 0,
            threshold,
        }
    }

    pub fn record_bad(&mut self) {
        self.consecutive_bad = self.consecutive_bad.saturating_add(1);
    }

    pub fn record_good_or_reset(&mut self) {
        self.consecutive_bad = 0;
    }

    /// Feed one verdict.
    pub fn record(&mut self, verdict: HealthVerdict) {
        match verdict {
            HealthVerdict::Bad => self.record_bad(),
            HealthVerdict::Good | HealthVerdict::Initializing => self.record_good_or_reset(),
        }
    }

    pub fn is_alerting(&self) -> bool {
        self.consecutive_bad >= self.threshold
    }

    pub fn bad_count(&self) -> u32 {
        self.consecutive_bad
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Change the threshold, keeping the current streak.
    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold;
    }
}

impl Default for HysteresisTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerts_at_threshold() {
        let mut tracker = HysteresisTracker::default();
        for _ in 0..4 {
            tracker.record_bad();
        }
        assert_eq!(tracker.bad_count(), 4);
        assert!(!tracker.is_alerting());

        tracker.record_bad();
        assert!(tracker.is_alerting());
    }

    #[test]
    fn test_good_and_initializing_reset_streak() {
        for reset in [HealthVerdict::Good, HealthVerdict::Initializing] {
            let mut tracker = HysteresisTracker::default();
            for _ in 0..12 {
                tracker.record(HealthVerdict::Bad);
            }
            assert!(tracker.is_alerting());

            tracker.record(reset);
            assert_eq!(tracker.bad_count(), 0);
            assert!(!tracker.is_alerting());
        }
    }

    #[test]
    fn test_reset_on_zero_stays_zero() {
        let mut tracker = HysteresisTracker::new(1);
        tracker.record_good_or_reset();
        tracker.record_good_or_reset();
        assert_eq!(tracker.bad_count(), 0);
        tracker.record_bad();
        assert!(tracker.is_alerting());
    }

    #[test]
    fn test_interleaved_good_prevents_alert() {
        let mut tracker = HysteresisTracker::default();
        for _ in 0..10 {
            for _ in 0..4 {
                tracker.record(HealthVerdict::Bad);
            }
            tracker.record(HealthVerdict::Good);
        }
        assert!(!tracker.is_alerting());
    }
}
