//! Bounded tracer registry.
//!
//! # Responsibilities
//! - Append lifecycle events per tracer id, atomically and in arrival order
//! - Bound memory with least-recently-touched eviction
//! - Answer windowed summary queries for the monitor
//!
//! # Design Decisions
//! - One mutex over the whole structure. Probes are shared (`Arc`), so
//!   `summaries` only bumps reference counts under the lock and classifies
//!   after it is released; `record` copies a probe on write if a snapshot
//!   still holds it
//! - Recency is an intrusive doubly-linked list threaded through a slab,
//!   indexed by a hash map (no allocation per touch)
//! - `record` and `lookup` touch an entry, `summaries` does not

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use crate::tracer::types::{TracerEvent, TracerId, TracerProbe, TracerStage, TracerSummary};

/// Default number of tracers kept in memory.
pub const DEFAULT_CAPACITY: usize = 1_000;

const NIL: usize = usize::MAX;

struct Node {
    probe: Arc<TracerProbe>,
    prev: usize,
    next: usize,
}

/// Fixed-capacity LRU map from tracer id to probe.
struct LruProbes {
    index: HashMap<TracerId, usize>,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    /// Most recently touched.
    head: usize,
    /// Least recently touched.
    tail: usize,
    capacity: usize,
}

impl LruProbes {
    fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, slot: usize) -> &Node {
        self.slots[slot].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        self.slots[slot].as_mut().expect("linked slot is occupied")
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(slot);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn touch(&mut self, slot: usize) {
        if self.head != slot {
            self.unlink(slot);
            self.push_front(slot);
        }
    }

    /// Returns the touched probe, if present.
    fn get(&mut self, id: &TracerId) -> Option<&mut Arc<TracerProbe>> {
        let slot = *self.index.get(id)?;
        self.touch(slot);
        Some(&mut self.node_mut(slot).probe)
    }

    /// Inserts a new probe as most recent, evicting the least recent one when
    /// full. Returns the evicted id.
    fn insert(&mut self, probe: TracerProbe) -> Option<TracerId> {
        let mut evicted = None;
        if self.len() >= self.capacity {
            evicted = self.pop_back();
        }

        let id = probe.id.clone();
        let node = Node {
            probe: Arc::new(probe),
            prev: NIL,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.push_front(slot);
        self.index.insert(id, slot);
        evicted
    }

    fn pop_back(&mut self) -> Option<TracerId> {
        let slot = self.tail;
        if slot == NIL {
            return None;
        }
        self.unlink(slot);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        self.index.remove(&node.probe.id);
        Some(node.probe.id.clone())
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<TracerProbe>> {
        self.slots.iter().flatten().map(|node| &node.probe)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// Thread-safe store of tracer lifecycles, shared by the pipeline stages and
/// the health monitor.
pub struct TracerRegistry {
    probes: Mutex<LruProbes>,
    completion_stage: Option<TracerStage>,
    evictions: AtomicU64,
}

impl TracerRegistry {
    /// Create a registry holding at most `capacity` tracers (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self::with_completion_stage(capacity, None)
    }

    /// Like [`TracerRegistry::new`], but valid tracers that have not reached
    /// `completion_stage` are summarised as in flight.
    pub fn with_completion_stage(capacity: usize, completion_stage: Option<TracerStage>) -> Self {
        Self {
            probes: Mutex::new(LruProbes::new(capacity.max(1))),
            completion_stage,
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruProbes> {
        // A panic while holding the lock cannot leave the list half-linked in
        // a way later callers observe, so recover the guard.
        self.probes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `stage` to the tracer `id`, creating it if unknown.
    pub fn record(&self, id: &TracerId, stage: TracerStage, at: Instant) {
        let event = TracerEvent::new(stage, at);
        let evicted = {
            let mut probes = self.lock();
            if let Some(probe) = probes.get(id) {
                Arc::make_mut(probe).events.push(event);
                None
            } else {
                probes.insert(TracerProbe::new(id.clone(), event))
            }
        };

        tracing::trace!(tracer = %id, stage = %stage, "Tracer event recorded");
        if let Some(evicted) = evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tracer = %evicted, "Tracer evicted from registry");
        }
    }

    /// Record `stage` at the current instant.
    pub fn record_now(&self, id: &TracerId, stage: TracerStage) {
        self.record(id, stage, Instant::now());
    }

    /// Summaries of every tracer created at or after `since`.
    pub fn summaries(&self, since: Instant) -> Vec<TracerSummary> {
        let snapshot: Vec<Arc<TracerProbe>> = {
            let probes = self.lock();
            probes.iter().filter(|p| p.created_at >= since).cloned().collect()
        };

        snapshot
            .iter()
            .map(|probe| probe.classify(self.completion_stage))
            .collect()
    }

    /// Summary of a single tracer.
    pub fn lookup(&self, id: &TracerId) -> TracerSummary {
        let probe = self.lock().get(id).cloned();
        match probe {
            Some(probe) => probe.classify(self.completion_stage),
            None => TracerSummary::Invalid {
                id: id.clone(),
                created_at: None,
                reason: "not found".to_string(),
            },
        }
    }

    /// Drop every tracer.
    pub fn clear(&self) {
        self.lock().clear();
        tracing::info!("Tracer registry cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Total evictions since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl Default for TracerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(n: usize) -> TracerId {
        TracerId::from(format!("tracer-{}", n))
    }

    #[test]
    fn test_record_appends_in_order() {
        let registry = TracerRegistry::new(10);
        let t = id(1);
        let base = Instant::now();
        registry.record(&t, TracerStage::Created, base);
        registry.record(&t, TracerStage::AddedToDeviceToNetworkQueue, base + Duration::from_millis(3));
        registry.record(&t, TracerStage::WrittenToDevice, base + Duration::from_millis(9));

        match registry.lookup(&t) {
            TracerSummary::Completed { duration, events, .. } => {
                assert_eq!(duration, Duration::from_millis(9));
                let stages: Vec<_> = events.iter().map(|e| e.stage).collect();
                assert_eq!(
                    stages,
                    vec![
                        TracerStage::Created,
                        TracerStage::AddedToDeviceToNetworkQueue,
                        TracerStage::WrittenToDevice
                    ]
                );
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[test]
    fn test_eviction_removes_least_recently_touched() {
        let capacity = 4;
        let registry = TracerRegistry::new(capacity);
        for n in 0..capacity {
            registry.record_now(&id(n), TracerStage::Created);
        }
        // Touch tracer-0 so tracer-1 becomes the oldest.
        registry.lookup(&id(0));

        registry.record_now(&id(capacity), TracerStage::Created);

        assert_eq!(registry.len(), capacity);
        assert_eq!(registry.evictions(), 1);
        match registry.lookup(&id(1)) {
            TracerSummary::Invalid { reason, created_at, .. } => {
                assert_eq!(reason, "not found");
                assert!(created_at.is_none());
            }
            other => panic!("expected evicted tracer, got {:?}", other),
        }
        for n in [0, 2, 3, capacity] {
            assert!(!registry.lookup(&id(n)).is_invalid(), "tracer-{} should remain", n);
        }
    }

    #[test]
    fn test_record_on_existing_id_touches_entry() {
        let registry = TracerRegistry::new(2);
        registry.record_now(&id(0), TracerStage::Created);
        registry.record_now(&id(1), TracerStage::Created);
        registry.record_now(&id(0), TracerStage::AddedToDeviceToNetworkQueue);
        registry.record_now(&id(2), TracerStage::Created);

        assert!(registry.lookup(&id(1)).is_invalid());
        assert!(!registry.lookup(&id(0)).is_invalid());
    }

    #[test]
    fn test_summaries_filter_by_creation_time() {
        let registry = TracerRegistry::new(10);
        let base = Instant::now();
        registry.record(&id(0), TracerStage::Created, base);
        registry.record(&id(1), TracerStage::Created, base + Duration::from_secs(5));
        registry.record(&id(2), TracerStage::Created, base + Duration::from_secs(10));

        let summaries = registry.summaries(base + Duration::from_secs(5));
        let mut ids: Vec<_> = summaries.iter().map(|s| s.id().to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["tracer-1", "tracer-2"]);
    }

    #[test]
    fn test_out_of_order_first_event_stays_invalid() {
        let registry = TracerRegistry::new(10);
        let t = id(7);
        registry.record_now(&t, TracerStage::RemovedFromDeviceToNetworkQueue);
        registry.record_now(&t, TracerStage::Created);

        match registry.lookup(&t) {
            TracerSummary::Invalid { reason, .. } => {
                assert!(reason.contains("REMOVED_FROM_DEVICE_TO_NETWORK_QUEUE"));
            }
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_empties_and_slots_are_reused() {
        let registry = TracerRegistry::new(3);
        for n in 0..3 {
            registry.record_now(&id(n), TracerStage::Created);
        }
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.lookup(&id(0)).is_invalid());

        for n in 10..20 {
            registry.record_now(&id(n), TracerStage::Created);
        }
        assert_eq!(registry.len(), 3);
        for n in 17..20 {
            assert!(!registry.lookup(&id(n)).is_invalid());
        }
    }

    #[test]
    fn test_capacity_one() {
        let registry = TracerRegistry::new(0);
        assert_eq!(registry.capacity(), 1);
        registry.record_now(&id(0), TracerStage::Created);
        registry.record_now(&id(1), TracerStage::Created);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&id(0)).is_invalid());
        assert!(!registry.lookup(&id(1)).is_invalid());
    }

    #[test]
    fn test_summary_snapshot_unaffected_by_later_records() {
        let registry = TracerRegistry::new(10);
        let t = id(3);
        let base = Instant::now();
        registry.record(&t, TracerStage::Created, base);
        registry.record(&t, TracerStage::AddedToDeviceToNetworkQueue, base + Duration::from_millis(2));

        let before = registry.summaries(base);
        registry.record(&t, TracerStage::WrittenToDevice, base + Duration::from_millis(8));
        let after = registry.summaries(base);

        match (&before[0], &after[0]) {
            (
                TracerSummary::Completed { events: old, duration: old_duration, .. },
                TracerSummary::Completed { events: new, duration: new_duration, .. },
            ) => {
                assert_eq!(old.len(), 2);
                assert_eq!(*old_duration, Duration::from_millis(2));
                assert_eq!(new.len(), 3);
                assert_eq!(*new_duration, Duration::from_millis(8));
            }
            other => panic!("expected completed summaries, got {:?}", other),
        }
    }
}
