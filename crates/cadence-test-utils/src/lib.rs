//! Shared fixtures for Cadence integration tests.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use cadence_core::config::SimulatorConfig;
use cadence_core::event::EventBus;
use cadence_core::types::{CadenceEvent, NodeStatus};

/// Simulator timings short enough for real-clock tests.
pub fn fast_config() -> SimulatorConfig {
    SimulatorConfig {
        email_dwell_ms: 20,
        wait_dwell_ms: 40,
        settle_ms: 5,
        hold_ms: 10,
    }
}

/// A bus plus a receiver subscribed before anything is published.
pub fn bus_with_receiver() -> (Arc<EventBus>, Receiver<CadenceEvent>) {
    let bus = Arc::new(EventBus::default());
    let rx = bus.subscribe();
    (bus, rx)
}

/// Receive events until `stop` matches one (inclusive), or the bus closes.
///
/// Panics after `timeout` so a stuck run fails the test instead of hanging.
pub async fn collect_until(
    rx: &mut Receiver<CadenceEvent>,
    timeout: Duration,
    stop: impl Fn(&CadenceEvent) -> bool,
) -> Vec<CadenceEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("timed out waiting for cadence events");
        match event {
            Ok(event) => {
                let done = stop(&event);
                events.push(event);
                if done {
                    return events;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return events,
        }
    }
}

/// `(node id, status)` pairs of every status change in `events`.
pub fn transitions(events: &[CadenceEvent]) -> Vec<(String, NodeStatus)> {
    events
        .iter()
        .filter_map(|e| match e {
            CadenceEvent::StatusChanged {
                node_id, status, ..
            } => Some((node_id.0.clone(), *status)),
            _ => None,
        })
        .collect()
}

/// Write `content` to a temporary TOML file.
pub fn temp_config(content: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp file");
    tmp.write_all(content.as_bytes()).expect("write toml");
    tmp
}
