use crate::types::CadenceEvent;

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<CadenceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: CadenceEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CadenceEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunId;

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(CadenceEvent::RunCancelled {
            run_id: RunId("r1".into()),
        });

        assert!(matches!(a.recv().await, Ok(CadenceEvent::RunCancelled { .. })));
        assert!(matches!(b.recv().await, Ok(CadenceEvent::RunCancelled { .. })));
    }

    #[tokio::test]
    async fn zero_capacity_still_delivers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(CadenceEvent::RunCancelled {
            run_id: RunId("r0".into()),
        });
        assert!(matches!(rx.recv().await, Ok(CadenceEvent::RunCancelled { .. })));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(CadenceEvent::StatusesReset {
            run_id: RunId::new(),
        });
    }
}
