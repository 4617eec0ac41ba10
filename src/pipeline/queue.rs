//! Hand-off of tracer packets into the pipeline's work queue.

use tokio::sync::mpsc;

use crate::tracer::TracerPacket;

/// Non-blocking sink for synthetic packets.
pub trait WorkQueue: Send + Sync {
    /// Returns `false` when the packet could not be accepted.
    fn offer(&self, packet: TracerPacket) -> bool;
}

/// Bounded device-to-network queue backed by a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelWorkQueue {
    tx: mpsc::Sender<TracerPacket>,
}

impl ChannelWorkQueue {
    /// Create a queue with room for `capacity` packets, returning the consumer side.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TracerPacket>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl WorkQueue for ChannelWorkQueue {
    fn offer(&self, packet: TracerPacket) -> bool {
        match self.tx.try_send(packet) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(packet)) => {
                tracing::warn!(tracer = %packet.tracer_id, "Device-to-network queue full, tracer dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(packet)) => {
                tracing::warn!(tracer = %packet.tracer_id, "Device-to-network queue closed, tracer dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::{ProbeBuilder, UuidProbeBuilder};

    #[test]
    fn test_offer_fails_when_full_or_closed() {
        let (queue, rx) = ChannelWorkQueue::new(1);
        assert!(queue.offer(UuidProbeBuilder.build()));
        assert!(!queue.offer(UuidProbeBuilder.build()));

        drop(rx);
        assert!(!queue.offer(UuidProbeBuilder.build()));
    }
}
