//! Health classification rules.
//!
//! Each rule maps raw windowed counts to a [`HealthVerdict`]. Rules are pure:
//! the same counts under the same policy always produce the same verdict.
//! All thresholds are inclusive.

use std::time::Duration;

use crate::config::PolicyConfig;
use crate::health::verdict::HealthVerdict;
use crate::tracer::TracerSummary;

/// Socket exception categories, each judged by its own rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCategory {
    Read,
    Write,
    Connect,
}

impl ExceptionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionCategory::Read => "read",
            ExceptionCategory::Write => "write",
            ExceptionCategory::Connect => "connect",
        }
    }
}

/// Tracer outcomes over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracerTally {
    /// Tracers that count toward the success rate.
    pub total: u64,
    /// Tracers that completed within the slow-tracer cutoff.
    pub successful: u64,
    /// Malformed tracers, left out of the rate.
    pub invalid: u64,
}

impl TracerTally {
    /// Tally summaries observed at `now`.
    ///
    /// Invalid tracers are excluded from the rate. In-flight tracers only
    /// count, as failures, once they are older than `cutoff`; younger ones
    /// may still complete in time.
    pub fn from_summaries(summaries: &[TracerSummary], cutoff: Duration, now: tokio::time::Instant) -> Self {
        let mut tally = TracerTally::default();
        for summary in summaries {
            match summary {
                TracerSummary::Invalid { .. } => tally.invalid += 1,
                TracerSummary::Completed { duration, .. } => {
                    tally.total += 1;
                    if *duration <= cutoff {
                        tally.successful += 1;
                    }
                }
                TracerSummary::InFlight { created_at, .. } => {
                    if now.saturating_duration_since(*created_at) > cutoff {
                        tally.total += 1;
                    }
                }
            }
        }
        tally
    }
}

/// Stateless classifier parameterised by a policy.
#[derive(Debug, Clone)]
pub struct HealthClassifier {
    policy: PolicyConfig,
}

impl HealthClassifier {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Cutoff above which a completed tracer counts as a failure.
    pub fn slow_tracer_cutoff(&self) -> Duration {
        Duration::from_millis(self.policy.slow_tracer_cutoff_ms)
    }

    /// Share of device reads that made it off the device-to-network queue.
    pub fn throughput(&self, inputs: u64, drained: u64) -> HealthVerdict {
        if inputs < self.policy.throughput_warmup_inputs {
            return HealthVerdict::Initializing;
        }
        if ratio(drained, inputs) >= self.policy.throughput_min_ratio {
            HealthVerdict::Good
        } else {
            HealthVerdict::Bad
        }
    }

    /// Socket exceptions of one category. No warm-up.
    pub fn exceptions(&self, category: ExceptionCategory, count: u64) -> HealthVerdict {
        tracing::trace!(category = category.as_str(), count, "Socket exceptions in window");
        if count >= self.policy.exception_limit {
            HealthVerdict::Bad
        } else {
            HealthVerdict::Good
        }
    }

    /// Share of tracers that completed within the slow-tracer cutoff.
    pub fn tracer_success(&self, total: u64, successful: u64) -> HealthVerdict {
        if total < self.policy.tracer_warmup_total {
            return HealthVerdict::Initializing;
        }
        if ratio(successful, total) >= self.policy.tracer_min_success_ratio {
            HealthVerdict::Good
        } else {
            HealthVerdict::Bad
        }
    }
}

impl Default for HealthClassifier {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}
