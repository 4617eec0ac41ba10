//! User-visible bad-health alert.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shows and hides the bad-health alert.
pub trait NotificationGateway: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Gateway that surfaces the alert through the log.
#[derive(Debug, Default)]
pub struct LogNotifier {
    visible: AtomicBool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}

impl NotificationGateway for LogNotifier {
    fn show(&self) {
        self.visible.store(true, Ordering::Relaxed);
        tracing::warn!("Tunnel health degraded: traffic may not be flowing");
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::Relaxed);
        tracing::info!("Tunnel health alert cleared");
    }
}
