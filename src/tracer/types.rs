//! Tracer probe data model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Identifier carried by a tracer packet through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TracerId(String);

impl TracerId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TracerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TracerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TracerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle stage a tracer passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TracerStage {
    Created,
    AddedToDeviceToNetworkQueue,
    RemovedFromDeviceToNetworkQueue,
    AddedToNetworkToDeviceQueue,
    RemovedFromNetworkToDeviceQueue,
    WrittenToDevice,
}

impl TracerStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TracerStage::Created => "CREATED",
            TracerStage::AddedToDeviceToNetworkQueue => "ADDED_TO_DEVICE_TO_NETWORK_QUEUE",
            TracerStage::RemovedFromDeviceToNetworkQueue => "REMOVED_FROM_DEVICE_TO_NETWORK_QUEUE",
            TracerStage::AddedToNetworkToDeviceQueue => "ADDED_TO_NETWORK_TO_DEVICE_QUEUE",
            TracerStage::RemovedFromNetworkToDeviceQueue => "REMOVED_FROM_NETWORK_TO_DEVICE_QUEUE",
            TracerStage::WrittenToDevice => "WRITTEN_TO_DEVICE",
        }
    }
}

impl fmt::Display for TracerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerEvent {
    pub stage: TracerStage,
    pub at: Instant,
}

impl TracerEvent {
    pub fn new(stage: TracerStage, at: Instant) -> Self {
        Self { stage, at }
    }
}

/// Every event recorded for one tracer, in arrival order.
#[derive(Debug, Clone)]
pub struct TracerProbe {
    pub id: TracerId,
    /// Timestamp of the first event ever recorded for this id.
    pub created_at: Instant,
    pub events: Vec<TracerEvent>,
}

impl TracerProbe {
    pub fn new(id: TracerId, first: TracerEvent) -> Self {
        Self {
            id,
            created_at: first.at,
            events: vec![first],
        }
    }

    /// Classify this probe.
    ///
    /// A probe whose first event is not `CREATED` is invalid for good; later
    /// events cannot repair it. When `completion_stage` is set, valid probes
    /// that have not reached it yet are reported as in flight.
    pub fn classify(&self, completion_stage: Option<TracerStage>) -> TracerSummary {
        let Some(first) = self.events.first() else {
            return TracerSummary::Invalid {
                id: self.id.clone(),
                created_at: Some(self.created_at),
                reason: "no data".to_string(),
            };
        };

        if first.stage != TracerStage::Created {
            return TracerSummary::Invalid {
                id: self.id.clone(),
                created_at: Some(self.created_at),
                reason: format!(
                    "first event for tracer {} is not CREATED; it is {}",
                    self.id, first.stage
                ),
            };
        }

        if let Some(stage) = completion_stage {
            if !self.events.iter().any(|e| e.stage == stage) {
                return TracerSummary::InFlight {
                    id: self.id.clone(),
                    created_at: first.at,
                };
            }
        }

        // events is non-empty here
        let last = self.events.last().map_or(first.at, |e| e.at);
        TracerSummary::Completed {
            id: self.id.clone(),
            created_at: first.at,
            duration: last.saturating_duration_since(first.at),
            events: self.events.clone(),
        }
    }
}

/// Read-only classification of a [`TracerProbe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracerSummary {
    Completed {
        id: TracerId,
        created_at: Instant,
        duration: Duration,
        events: Vec<TracerEvent>,
    },
    Invalid {
        id: TracerId,
        /// `None` when the id is unknown to the registry.
        created_at: Option<Instant>,
        reason: String,
    },
    InFlight {
        id: TracerId,
        created_at: Instant,
    },
}

impl TracerSummary {
    pub fn id(&self) -> &TracerId {
        match self {
            TracerSummary::Completed { id, .. }
            | TracerSummary::Invalid { id, .. }
            | TracerSummary::InFlight { id, .. } => id,
        }
    }

    pub fn created_at(&self) -> Option<Instant> {
        match self {
            TracerSummary::Completed { created_at, .. } | TracerSummary::InFlight { created_at, .. } => {
                Some(*created_at)
            }
            TracerSummary::Invalid { created_at, .. } => *created_at,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, TracerSummary::Invalid { .. })
    }

    /// Completed within `cutoff`.
    pub fn completed_within(&self, cutoff: Duration) -> bool {
        matches!(self, TracerSummary::Completed { duration, .. } if *duration <= cutoff)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TracerSummary::Completed { .. } => "completed",
            TracerSummary::Invalid { .. } => "invalid",
            TracerSummary::InFlight { .. } => "in_flight",
        }
    }
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

impl fmt::Display for TracerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracerSummary::Completed { id, created_at, duration, events } => {
                writeln!(
                    f,
                    "Tracer {} flow: {} steps, total time {:.2} ms ({} ns)",
                    id,
                    events.len(),
                    as_millis_f64(*duration),
                    duration.as_nanos()
                )?;
                write!(f, "---> CREATED")?;
                for event in events.iter().filter(|e| e.stage != TracerStage::Created) {
                    let offset = event.at.saturating_duration_since(*created_at);
                    write!(
                        f,
                        "\n---> {} {:.2} ms ({} ns) after creation",
                        event.stage,
                        as_millis_f64(offset),
                        offset.as_nanos()
                    )?;
                }
                Ok(())
            }
            TracerSummary::Invalid { id, reason, .. } => {
                write!(f, "Tracer {} invalid: {}", id, reason)
            }
            TracerSummary::InFlight { id, .. } => write!(f, "Tracer {} in flight", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(stages: &[(TracerStage, u64)]) -> TracerProbe {
        let base = Instant::now();
        let mut iter = stages.iter();
        let (stage, ms) = iter.next().unwrap();
        let mut probe = TracerProbe::new(
            TracerId::from("t1"),
            TracerEvent::new(*stage, base + Duration::from_millis(*ms)),
        );
        for (stage, ms) in iter {
            probe.events.push(TracerEvent::new(*stage, base + Duration::from_millis(*ms)));
        }
        probe
    }

    #[test]
    fn test_created_only_is_completed_with_zero_duration() {
        let summary = probe(&[(TracerStage::Created, 0)]).classify(None);
        match summary {
            TracerSummary::Completed { duration, events, .. } => {
                assert_eq!(duration, Duration::ZERO);
                assert_eq!(events.len(), 1);
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[test]
    fn test_duration_spans_first_to_last_event() {
        let summary = probe(&[
            (TracerStage::Created, 0),
            (TracerStage::AddedToDeviceToNetworkQueue, 5),
            (TracerStage::WrittenToDevice, 40),
        ])
        .classify(None);
        match summary {
            TracerSummary::Completed { duration, .. } => assert_eq!(duration, Duration::from_millis(40)),
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_first_event_names_stage() {
        let summary = probe(&[
            (TracerStage::AddedToDeviceToNetworkQueue, 0),
            (TracerStage::Created, 1),
        ])
        .classify(None);
        match summary {
            TracerSummary::Invalid { reason, .. } => {
                assert!(reason.contains("ADDED_TO_DEVICE_TO_NETWORK_QUEUE"), "reason: {}", reason);
            }
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_probe_has_no_data() {
        let mut p = probe(&[(TracerStage::Created, 0)]);
        p.events.clear();
        match p.classify(None) {
            TracerSummary::Invalid { reason, .. } => assert_eq!(reason, "no data"),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_completion_stage_marks_unfinished_in_flight() {
        let p = probe(&[(TracerStage::Created, 0), (TracerStage::AddedToDeviceToNetworkQueue, 2)]);
        assert!(matches!(
            p.classify(Some(TracerStage::WrittenToDevice)),
            TracerSummary::InFlight { .. }
        ));
        assert!(matches!(
            p.classify(Some(TracerStage::AddedToDeviceToNetworkQueue)),
            TracerSummary::Completed { .. }
        ));
    }

    #[test]
    fn test_display_lists_stage_offsets() {
        let summary = probe(&[(TracerStage::Created, 0), (TracerStage::WrittenToDevice, 3)]).classify(None);
        let text = summary.to_string();
        assert!(text.contains("2 steps"));
        assert!(text.contains("WRITTEN_TO_DEVICE 3.00 ms"));
    }
}
