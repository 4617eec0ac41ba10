//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use tunnel_health::config::{MonitorConfig, PolicyConfig};
use tunnel_health::health::{Collaborators, HealthMonitor};
use tunnel_health::pipeline::{CounterStore, CounterStoreError, EventKind, NotificationGateway, WorkQueue};
use tunnel_health::tracer::{TracerPacket, TracerRegistry, UuidProbeBuilder};

/// Counter store returning fixed per-kind counts regardless of the window.
#[derive(Default)]
pub struct FakeCounters {
    counts: Mutex<HashMap<EventKind, u64>>,
    failing: AtomicBool,
    panicking: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakeCounters {
    pub fn set(&self, kind: EventKind, count: u64) {
        self.counts.lock().unwrap().insert(kind, count);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn panic(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Block the calling thread for `delay` on every query.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

impl CounterStore for FakeCounters {
    fn count(&self, kind: EventKind, _since: Instant) -> Result<u64, CounterStoreError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.panicking.load(Ordering::SeqCst) {
            panic!("counter store exploded");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CounterStoreError::Unavailable("offline".into()));
        }
        Ok(self.counts.lock().unwrap().get(&kind).copied().unwrap_or(0))
    }
}

/// Notification gateway counting calls.
#[derive(Default)]
pub struct RecordingNotifier {
    pub shows: AtomicUsize,
    pub hides: AtomicUsize,
}

impl RecordingNotifier {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }
}

impl NotificationGateway for RecordingNotifier {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}

/// Work queue keeping every accepted packet.
pub struct RecordingQueue {
    pub packets: Mutex<Vec<TracerPacket>>,
    accept: AtomicBool,
}

impl Default for RecordingQueue {
    fn default() -> Self {
        Self {
            packets: Mutex::new(Vec::new()),
            accept: AtomicBool::new(true),
        }
    }
}

impl RecordingQueue {
    pub fn len(&self) -> usize {
        self.packets.lock().unwrap().len()
    }

    pub fn set_accepting(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }
}

impl WorkQueue for RecordingQueue {
    fn offer(&self, packet: TracerPacket) -> bool {
        if !self.accept.load(Ordering::SeqCst) {
            return false;
        }
        self.packets.lock().unwrap().push(packet);
        true
    }
}

/// A monitor wired to fakes.
pub struct Harness {
    pub monitor: HealthMonitor,
    pub counters: Arc<FakeCounters>,
    pub registry: Arc<TracerRegistry>,
    pub queue: Arc<RecordingQueue>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        let counters = Arc::new(FakeCounters::default());
        let registry = Arc::new(TracerRegistry::new(1_000));
        let queue = Arc::new(RecordingQueue::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let monitor = HealthMonitor::new(
            config,
            PolicyConfig::default(),
            Collaborators {
                counters: counters.clone(),
                registry: registry.clone(),
                probe_builder: Arc::new(UuidProbeBuilder),
                work_queue: queue.clone(),
                notifier: notifier.clone(),
            },
        )
        .expect("inside a runtime");

        Self {
            monitor,
            counters,
            registry,
            queue,
            notifier,
        }
    }
}
