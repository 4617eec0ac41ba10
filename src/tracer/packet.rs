//! Tracer packets and how they are manufactured.

use crate::tracer::types::TracerId;

/// Prefix identifying a synthetic payload to the pipeline stages.
pub const TRACER_MARKER: &[u8] = b"TUNNEL-HEALTH-TRACER:";

/// A synthetic packet injected into the device-to-network path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerPacket {
    pub tracer_id: TracerId,
    pub payload: Vec<u8>,
}

impl TracerPacket {
    pub fn new(tracer_id: TracerId) -> Self {
        let mut payload = Vec::with_capacity(TRACER_MARKER.len() + tracer_id.as_str().len());
        payload.extend_from_slice(TRACER_MARKER);
        payload.extend_from_slice(tracer_id.as_str().as_bytes());
        Self { tracer_id, payload }
    }

    /// Recover the tracer id from a payload produced by [`TracerPacket::new`].
    pub fn parse_tracer_id(payload: &[u8]) -> Option<TracerId> {
        let rest = payload.strip_prefix(TRACER_MARKER)?;
        let id = std::str::from_utf8(rest).ok()?;
        if id.is_empty() {
            return None;
        }
        Some(TracerId::from(id))
    }
}

/// Manufactures tracer packets with fresh ids.
pub trait ProbeBuilder: Send + Sync {
    fn build(&self) -> TracerPacket;
}

/// Builds packets with random UUID v4 tracer ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidProbeBuilder;

impl ProbeBuilder for UuidProbeBuilder {
    fn build(&self) -> TracerPacket {
        TracerPacket::new(TracerId::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_unique_ids() {
        let builder = UuidProbeBuilder;
        let a = builder.build();
        let b = builder.build();
        assert_ne!(a.tracer_id, b.tracer_id);
    }

    #[test]
    fn test_payload_carries_tracer_id() {
        let packet = UuidProbeBuilder.build();
        assert_eq!(TracerPacket::parse_tracer_id(&packet.payload), Some(packet.tracer_id.clone()));
        assert_eq!(TracerPacket::parse_tracer_id(b"GET / HTTP/1.1"), None);
        assert_eq!(TracerPacket::parse_tracer_id(TRACER_MARKER), None);
    }
}
