//! Health monitor orchestration.
//!
//! # Responsibilities
//! - Periodically sample windowed counters and tracer summaries
//! - Debounce per-metric verdicts and publish the aggregate health
//! - Periodically inject tracer packets into the pipeline
//! - Drive the bad-health notification
//!
//! # Design Decisions
//! - Sampling and injection are independent conflated periodic tasks
//! - Every publication checks the lifecycle epoch under the lifecycle lock,
//!   so nothing is published once `stop()` has returned
//! - The notification gateway is only called with no monitor lock held; it
//!   may call back into the monitor, including `stop()`
//! - `stop()` never takes the sampling lock, so it does not wait for a
//!   cycle blocked in a collaborator
//! - Counter store failures degrade to a zero count for that cycle

use arc_swap::ArcSwap;
use futures_util::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{MonitorConfig, PolicyConfig};
use crate::health::classifier::{ExceptionCategory, HealthClassifier, TracerTally};
use crate::health::hysteresis::HysteresisTracker;
use crate::health::verdict::{HealthMetric, HealthVerdict, OverallHealth};
use crate::lifecycle::periodic::spawn_periodic;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::pipeline::counters::{CounterStore, EventKind};
use crate::pipeline::notification::NotificationGateway;
use crate::pipeline::queue::WorkQueue;
use crate::tracer::{ProbeBuilder, TracerId, TracerRegistry, TracerStage, TracerSummary};

/// Errors raised by the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("the health monitor must be created inside a tokio runtime")]
    NoRuntime,
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// External collaborators the monitor reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub counters: Arc<dyn CounterStore>,
    pub registry: Arc<TracerRegistry>,
    pub probe_builder: Arc<dyn ProbeBuilder>,
    pub work_queue: Arc<dyn WorkQueue>,
    pub notifier: Arc<dyn NotificationGateway>,
}

/// Debounce status of one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricStatus {
    pub metric: HealthMetric,
    pub last_verdict: Option<HealthVerdict>,
    pub consecutive_bad: u32,
    pub threshold: u32,
    pub alerting: bool,
}

/// Point-in-time view of the monitor for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub running: bool,
    pub health: OverallHealth,
    pub forced_state: Option<HealthVerdict>,
    pub notifications_enabled: bool,
    pub metrics: Vec<MetricStatus>,
}

struct MetricSlot {
    metric: HealthMetric,
    tracker: HysteresisTracker,
    last_verdict: Option<HealthVerdict>,
}

/// State mutated only by sampling cycles. Held for a whole cycle so cycles
/// from an old and a new run never interleave.
struct SamplingState {
    slots: Vec<MetricSlot>,
    definitive: bool,
    forced: Option<HealthVerdict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notification {
    Show,
    Hide,
}

impl SamplingState {
    fn new(threshold: u32) -> Self {
        Self {
            slots: HealthMetric::ALL
                .iter()
                .map(|metric| MetricSlot {
                    metric: *metric,
                    tracker: HysteresisTracker::new(threshold),
                    last_verdict: None,
                })
                .collect(),
            definitive: false,
            forced: None,
        }
    }

    fn slot_mut(&mut self, metric: HealthMetric) -> Option<&mut MetricSlot> {
        self.slots.iter_mut().find(|slot| slot.metric == metric)
    }

    fn aggregate(&self) -> OverallHealth {
        let alerting: Vec<HealthMetric> = self
            .slots
            .iter()
            .filter(|slot| slot.tracker.is_alerting())
            .map(|slot| slot.metric)
            .collect();

        let state = if !alerting.is_empty() {
            HealthVerdict::Bad
        } else if self.definitive {
            HealthVerdict::Good
        } else {
            HealthVerdict::Initializing
        };

        OverallHealth { state, alerting }
    }
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    /// Bumped by every start and stop; cycles carry the epoch they were
    /// spawned under.
    epoch: u64,
    shutdown: Option<Shutdown>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    config: MonitorConfig,
    classifier: ArcSwap<HealthClassifier>,
    collaborators: Collaborators,
    state: Mutex<SamplingState>,
    lifecycle: Mutex<Lifecycle>,
    notifications_enabled: AtomicBool,
    /// Whether the gateway was last told to show. Only flipped with `swap`,
    /// so each transition is delivered once.
    notification_visible: AtomicBool,
    health_tx: watch::Sender<OverallHealth>,
    runtime: Handle,
    created_at: Instant,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SamplingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in lifecycle.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Self-monitoring for the packet pipeline.
///
/// Cheap to clone; all clones drive the same monitor.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

impl HealthMonitor {
    /// Create a stopped monitor. Must be called within a tokio runtime; the
    /// periodic tasks are spawned onto that runtime.
    pub fn new(
        config: MonitorConfig,
        policy: PolicyConfig,
        collaborators: Collaborators,
    ) -> Result<Self, MonitorError> {
        for (field, value) in [
            ("monitor.sampling_interval_ms", config.sampling_interval_ms),
            ("monitor.injection_interval_ms", config.injection_interval_ms),
            ("monitor.alert_threshold", u64::from(config.alert_threshold)),
        ] {
            if value == 0 {
                return Err(MonitorError::Zero { field });
            }
        }

        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        let (health_tx, _) = watch::channel(OverallHealth::initializing());

        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SamplingState::new(config.alert_threshold)),
                notifications_enabled: AtomicBool::new(config.notifications_enabled),
                notification_visible: AtomicBool::new(false),
                config,
                classifier: ArcSwap::from_pointee(HealthClassifier::new(policy)),
                collaborators,
                lifecycle: Mutex::new(Lifecycle::default()),
                health_tx,
                runtime,
                created_at: Instant::now(),
            }),
        })
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Arm the sampling and injection tasks. No-op if already running.
    pub fn start(&self) {
        let mut lifecycle = self.inner.lifecycle();
        if lifecycle.running {
            return;
        }
        lifecycle.running = true;
        lifecycle.epoch += 1;
        let epoch = lifecycle.epoch;
        let shutdown = Shutdown::new();

        tracing::info!(
            sampling_interval_ms = self.inner.config.sampling_interval_ms,
            window_secs = self.inner.config.window_secs,
            injection_interval_ms = self.inner.config.injection_interval_ms,
            "Health monitor starting"
        );

        let weak = Arc::downgrade(&self.inner);
        let sampling = spawn_periodic(
            &self.inner.runtime,
            "health-sampling",
            self.inner.config.sampling_interval(),
            shutdown.subscribe(),
            move || -> Result<(), Infallible> {
                if let Some(monitor) = Self::from_weak(&weak) {
                    monitor.sample(epoch);
                }
                Ok(())
            },
        );

        let weak = Arc::downgrade(&self.inner);
        let injection = spawn_periodic(
            &self.inner.runtime,
            "tracer-injection",
            self.inner.config.injection_interval(),
            shutdown.subscribe(),
            move || -> Result<(), Infallible> {
                if let Some(monitor) = Self::from_weak(&weak) {
                    if monitor.is_current(epoch) {
                        monitor.inject_one();
                    }
                }
                Ok(())
            },
        );

        lifecycle.tasks = vec![sampling, injection];
        lifecycle.shutdown = Some(shutdown);
    }

    /// Cancel both tasks. No publication happens after this returns; a
    /// cycle already executing may finish but its result is discarded.
    pub fn stop(&self) {
        let tasks = {
            let mut lifecycle = self.inner.lifecycle();
            if !lifecycle.running {
                return;
            }
            lifecycle.running = false;
            lifecycle.epoch += 1;
            if let Some(shutdown) = lifecycle.shutdown.take() {
                shutdown.trigger();
            }
            std::mem::take(&mut lifecycle.tasks)
        };
        for task in tasks {
            task.abort();
        }

        if let Some(notification) = self.toggle_notification(false) {
            self.deliver(notification);
        }

        tracing::info!("Health monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle().running
    }

    fn is_current(&self, epoch: u64) -> bool {
        let lifecycle = self.inner.lifecycle();
        lifecycle.running && lifecycle.epoch == epoch
    }

    /// Latest health, replayed to every new subscriber.
    pub fn subscribe(&self) -> watch::Receiver<OverallHealth> {
        self.inner.health_tx.subscribe()
    }

    /// Stream of health updates, starting with the current value.
    pub fn health_stream(&self) -> impl Stream<Item = OverallHealth> + Send + 'static {
        let rx = self.subscribe();
        futures_util::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let health = rx.borrow_and_update().clone();
            Some((health, (rx, false)))
        })
    }

    /// Most recently published health.
    pub fn current(&self) -> OverallHealth {
        self.inner.health_tx.borrow().clone()
    }

    /// Replace live throughput sampling with a fixed verdict, or restore it
    /// with `None`. For test harnesses and diagnostics.
    pub fn force_state(&self, forced: Option<HealthVerdict>) {
        match forced {
            Some(verdict) => tracing::info!(verdict = %verdict, "Pretending throughput health"),
            None => tracing::info!("Throughput health back to live sampling"),
        }
        self.inner.state().forced = forced;
    }

    /// Toggle the user-visible notification. Sampling and publication are
    /// unaffected; disabling hides an alert that is currently shown.
    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.inner.notifications_enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "Bad health notifications toggled");
        if !enabled {
            if let Some(notification) = self.toggle_notification(false) {
                self.deliver(notification);
            }
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.inner.notifications_enabled.load(Ordering::SeqCst)
    }

    /// Apply a reloaded policy and alert threshold. Streaks are kept.
    pub fn update_policy(&self, policy: PolicyConfig, alert_threshold: u32) {
        self.inner.classifier.store(Arc::new(HealthClassifier::new(policy)));
        let mut state = self.inner.state();
        for slot in state.slots.iter_mut() {
            slot.tracker.set_threshold(alert_threshold);
        }
        tracing::info!(alert_threshold, "Health policy updated");
    }

    pub fn registry(&self) -> &Arc<TracerRegistry> {
        &self.inner.collaborators.registry
    }

    /// Summaries of tracers created within the last `window`.
    pub fn tracer_summaries(&self, window: Duration) -> Vec<TracerSummary> {
        self.inner.collaborators.registry.summaries(self.window_start(window))
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let running = self.is_running();
        let state = self.inner.state();
        MonitorSnapshot {
            running,
            health: self.current(),
            forced_state: state.forced,
            notifications_enabled: self.notifications_enabled(),
            metrics: state
                .slots
                .iter()
                .map(|slot| MetricStatus {
                    metric: slot.metric,
                    last_verdict: slot.last_verdict,
                    consecutive_bad: slot.tracker.bad_count(),
                    threshold: slot.tracker.threshold(),
                    alerting: slot.tracker.is_alerting(),
                })
                .collect(),
        }
    }

    /// Manufacture `n` tracers on demand. Returns how many the work queue
    /// accepted.
    pub fn inject_probes(&self, n: usize) -> usize {
        let accepted = (0..n).filter(|_| self.inject_one()).count();
        tracing::info!(requested = n, accepted, "Injected tracers on demand");
        accepted
    }

    fn inject_one(&self) -> bool {
        let collaborators = &self.inner.collaborators;
        let packet = collaborators.probe_builder.build();
        let id: TracerId = packet.tracer_id.clone();

        collaborators.registry.record_now(&id, TracerStage::Created);
        collaborators
            .registry
            .record_now(&id, TracerStage::AddedToDeviceToNetworkQueue);

        let accepted = collaborators.work_queue.offer(packet);
        if accepted {
            tracing::debug!(tracer = %id, "Tracer injected");
        } else {
            tracing::warn!(tracer = %id, "Work queue rejected tracer");
        }
        metrics::record_tracer_injected(accepted);
        accepted
    }

    fn window_start(&self, window: Duration) -> Instant {
        Instant::now()
            .checked_sub(window)
            .unwrap_or(self.inner.created_at)
    }

    fn windowed_count(&self, kind: EventKind, since: Instant) -> u64 {
        match self.inner.collaborators.counters.count(kind, since) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(event = %kind, error = %e, "Counter query failed, assuming zero");
                0
            }
        }
    }

    /// One sampling cycle.
    fn sample(&self, epoch: u64) {
        let mut state = self.inner.state();
        if !self.is_current(epoch) {
            return;
        }

        let now = Instant::now();
        let since = self.window_start(self.inner.config.window());
        let classifier = self.inner.classifier.load();

        let throughput = match state.forced {
            Some(verdict) => verdict,
            None => classifier.throughput(
                self.windowed_count(EventKind::TunRead, since),
                self.windowed_count(EventKind::RemoveFromDeviceToNetworkQueue, since),
            ),
        };
        let read = classifier.exceptions(
            ExceptionCategory::Read,
            self.windowed_count(EventKind::SocketChannelReadException, since),
        );
        let write = classifier.exceptions(
            ExceptionCategory::Write,
            self.windowed_count(EventKind::SocketChannelWriteException, since),
        );
        let connect = classifier.exceptions(
            ExceptionCategory::Connect,
            self.windowed_count(EventKind::SocketChannelConnectException, since),
        );

        let registry = &self.inner.collaborators.registry;
        let summaries = registry.summaries(since);
        let tally = TracerTally::from_summaries(&summaries, classifier.slow_tracer_cutoff(), now);
        let tracer = classifier.tracer_success(tally.total, tally.successful);
        metrics::record_tracer_registry(registry.len(), registry.evictions());

        let verdicts = [
            (HealthMetric::TunReadQueueRatio, throughput),
            (HealthMetric::SocketReadExceptions, read),
            (HealthMetric::SocketWriteExceptions, write),
            (HealthMetric::SocketConnectExceptions, connect),
            (HealthMetric::TracerSuccessRate, tracer),
        ];

        for (metric, verdict) in verdicts {
            state.definitive |= verdict.is_definitive();
            if let Some(slot) = state.slot_mut(metric) {
                slot.tracker.record(verdict);
                slot.last_verdict = Some(verdict);
                metrics::record_metric_verdict(metric, verdict, slot.tracker.bad_count());
            }
        }

        let health = state.aggregate();
        tracing::debug!(
            state = %health.state,
            alerting = ?health.alerting,
            tracers_total = tally.total,
            tracers_successful = tally.successful,
            tracers_invalid = tally.invalid,
            "Health sampled"
        );

        drop(state);

        let Some(notification) = self.publish(epoch, health) else {
            return;
        };
        self.deliver(notification);

        // A `stop()` racing with the show above has already hidden the
        // notification; hide again so the gateway ends up hidden.
        if notification == Notification::Show && !self.is_current(epoch) {
            self.inner.collaborators.notifier.hide();
        }
    }

    /// Publish under the lifecycle lock so a concurrent `stop()` either
    /// happens-before (and the result is dropped) or after. Returns the
    /// notification transition for the caller to deliver once the lock is
    /// released.
    fn publish(&self, epoch: u64, health: OverallHealth) -> Option<Notification> {
        let lifecycle = self.inner.lifecycle();
        if !lifecycle.running || lifecycle.epoch != epoch {
            tracing::debug!("Monitor stopped during cycle, discarding sample");
            return None;
        }

        let previous = self.inner.health_tx.borrow().state;
        if previous != health.state {
            match health.state {
                HealthVerdict::Bad => {
                    tracing::warn!(alerting = ?health.alerting, "Health check caught sustained problem(s)")
                }
                _ => tracing::info!(state = %health.state, "Health state changed"),
            }
        }

        let show = health.is_bad() && self.notifications_enabled();
        metrics::record_overall_health(health.state);
        self.inner.health_tx.send_replace(health);
        self.toggle_notification(show)
    }

    /// Record the wanted visibility; returns the transition, if any.
    fn toggle_notification(&self, show: bool) -> Option<Notification> {
        let was_visible = self.inner.notification_visible.swap(show, Ordering::SeqCst);
        match (was_visible, show) {
            (false, true) => Some(Notification::Show),
            (true, false) => Some(Notification::Hide),
            _ => None,
        }
    }

    /// Call the gateway. Never invoked with a monitor lock held.
    fn deliver(&self, notification: Notification) {
        let notifier = &self.inner.collaborators.notifier;
        match notification {
            Notification::Show => notifier.show(),
            Notification::Hide => notifier.hide(),
        }
    }
}
