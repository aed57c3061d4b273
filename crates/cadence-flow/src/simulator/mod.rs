//! "Test Workflow" execution simulator.
//!
//! A run takes one `GraphSnapshot`, freezes its traversal order, and walks
//! it: each step is marked `executing`, dwells for a per-kind duration,
//! is marked `complete`, and settles briefly before the next step. The
//! dwell can be skipped or the whole run stopped at any time. Every status
//! change is published on the `EventBus`.

pub mod dwell;
pub mod traversal;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cadence_core::config::SimulatorConfig;
use cadence_core::event::EventBus;
use cadence_core::types::{CadenceEvent, NodeId, NodeStatus, RunId, RunState, StepKind};

use crate::graph::GraphSnapshot;
use dwell::{dwell, pause, DwellOutcome, SkipSignal};

pub use traversal::{find_start, traversal_order};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step in the order completed.
    Completed { executed: Vec<NodeId> },
    /// `stop()` ended the run.
    Cancelled,
}

/// Handle to an in-flight run.
pub struct RunHandle {
    run_id: RunId,
    handle: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Wait for the run to end, including the completion hold.
    pub async fn finished(self) -> RunOutcome {
        self.handle.await.unwrap_or(RunOutcome::Cancelled)
    }
}

#[derive(Debug, Clone)]
struct Step {
    id: NodeId,
    dwell: Duration,
}

#[derive(Clone)]
struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
    skip: Arc<SkipSignal>,
}

struct Slot {
    state: RunState,
    run: Option<ActiveRun>,
    /// Node ids of the snapshot the run was started from, in node order.
    nodes: Vec<NodeId>,
    statuses: HashMap<NodeId, NodeStatus>,
}

impl Slot {
    /// Set every non-idle status back to idle, publishing each change.
    fn reset_statuses(&mut self, run_id: &RunId, event_bus: &EventBus) {
        for id in &self.nodes {
            if let Some(status) = self.statuses.get_mut(id) {
                if *status != NodeStatus::Idle {
                    *status = NodeStatus::Idle;
                    event_bus.publish(CadenceEvent::StatusChanged {
                        run_id: run_id.clone(),
                        node_id: id.clone(),
                        status: NodeStatus::Idle,
                    });
                }
            }
        }
        event_bus.publish(CadenceEvent::StatusesReset {
            run_id: run_id.clone(),
        });
    }
}

struct Inner {
    config: SimulatorConfig,
    event_bus: Arc<EventBus>,
    slot: Mutex<Slot>,
}

/// Runs at most one simulated traversal at a time.
pub struct Simulator {
    inner: Arc<Inner>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                event_bus,
                slot: Mutex::new(Slot {
                    state: RunState::Idle,
                    run: None,
                    nodes: Vec::new(),
                    statuses: HashMap::new(),
                }),
            }),
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    /// Start a run over `snapshot`.
    ///
    /// Returns `None` while another run is still active (running or in its
    /// completion hold). Must be called from within a tokio runtime.
    pub fn start(&self, snapshot: &GraphSnapshot) -> Option<RunHandle> {
        let mut slot = self.inner.slot.lock().unwrap();
        if matches!(slot.state, RunState::Running | RunState::Completed) {
            debug!("Run already active, start ignored");
            return None;
        }

        let order = traversal_order(snapshot);
        let steps: Vec<Step> = order
            .iter()
            .filter_map(|id| snapshot.node(id))
            .map(|node| Step {
                id: node.id.clone(),
                dwell: self.dwell_for(node.kind),
            })
            .collect();

        let run = ActiveRun {
            run_id: RunId::new(),
            cancel: CancellationToken::new(),
            skip: Arc::new(SkipSignal::new()),
        };

        slot.state = RunState::Running;
        slot.run = Some(run.clone());
        slot.nodes = snapshot.nodes.iter().map(|n| n.id.clone()).collect();
        slot.statuses = slot
            .nodes
            .iter()
            .map(|id| (id.clone(), NodeStatus::Idle))
            .collect();

        info!(run_id = %run.run_id, steps = steps.len(), "Test run started");
        self.inner.event_bus.publish(CadenceEvent::RunStarted {
            run_id: run.run_id.clone(),
            order,
            started_at: Utc::now(),
        });
        drop(slot);

        let run_id = run.run_id.clone();
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.execute(run, steps).await });

        Some(RunHandle { run_id, handle })
    }

    /// Stop the active run and reset every status to idle.
    ///
    /// Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let mut slot = self.inner.slot.lock().unwrap();
        if !matches!(slot.state, RunState::Running | RunState::Completed) {
            return false;
        }
        let Some(run) = slot.run.take() else {
            return false;
        };

        run.cancel.cancel();
        slot.state = RunState::Cancelled;
        info!(run_id = %run.run_id, "Test run stopped");
        self.inner.event_bus.publish(CadenceEvent::RunCancelled {
            run_id: run.run_id.clone(),
        });
        slot.reset_statuses(&run.run_id, &self.inner.event_bus);
        true
    }

    /// Cut the current step's dwell short. Returns whether a dwell was
    /// in progress.
    pub fn skip(&self) -> bool {
        let slot = self.inner.slot.lock().unwrap();
        if slot.state != RunState::Running {
            return false;
        }
        slot.run.as_ref().is_some_and(|run| run.skip.trigger())
    }

    pub fn run_state(&self) -> RunState {
        self.inner.slot.lock().unwrap().state
    }

    /// Whether a run is executing or holding its completed display.
    pub fn is_active(&self) -> bool {
        matches!(self.run_state(), RunState::Running | RunState::Completed)
    }

    /// Status of `id`; unknown nodes are idle.
    pub fn status(&self, id: &NodeId) -> NodeStatus {
        self.inner
            .slot
            .lock()
            .unwrap()
            .statuses
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> HashMap<NodeId, NodeStatus> {
        self.inner.slot.lock().unwrap().statuses.clone()
    }

    fn dwell_for(&self, kind: StepKind) -> Duration {
        match kind {
            StepKind::Email => self.inner.config.email_dwell(),
            StepKind::Wait => self.inner.config.wait_dwell(),
        }
    }
}

impl Inner {
    async fn execute(self: Arc<Self>, run: ActiveRun, steps: Vec<Step>) -> RunOutcome {
        let mut executed = Vec::with_capacity(steps.len());
        let last = steps.len().saturating_sub(1);

        for (index, step) in steps.into_iter().enumerate() {
            let skip = run.skip.arm();
            if !self.set_status(&run, &step.id, NodeStatus::Executing) {
                return RunOutcome::Cancelled;
            }
            debug!(run_id = %run.run_id, node_id = %step.id, dwell_ms = step.dwell.as_millis() as u64, "Step executing");

            match dwell(step.dwell, &run.cancel, skip).await {
                DwellOutcome::Cancelled => return RunOutcome::Cancelled,
                DwellOutcome::Skipped => {
                    if !self.publish_if_active(&run, || CadenceEvent::StepSkipped {
                        run_id: run.run_id.clone(),
                        node_id: step.id.clone(),
                    }) {
                        return RunOutcome::Cancelled;
                    }
                    debug!(run_id = %run.run_id, node_id = %step.id, "Step skipped");
                }
                DwellOutcome::Elapsed => {}
            }

            if !self.set_status(&run, &step.id, NodeStatus::Complete) {
                return RunOutcome::Cancelled;
            }
            executed.push(step.id);

            if index < last && !pause(self.config.settle(), &run.cancel).await {
                return RunOutcome::Cancelled;
            }
        }

        {
            let mut slot = self.slot.lock().unwrap();
            if run.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            slot.state = RunState::Completed;
            info!(run_id = %run.run_id, executed = executed.len(), "Test run completed");
            self.event_bus.publish(CadenceEvent::RunCompleted {
                run_id: run.run_id.clone(),
                executed: executed.len(),
            });
        }

        if !pause(self.config.hold(), &run.cancel).await {
            return RunOutcome::Cancelled;
        }

        let mut slot = self.slot.lock().unwrap();
        if run.cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        slot.reset_statuses(&run.run_id, &self.event_bus);
        slot.state = RunState::Idle;
        slot.run = None;

        RunOutcome::Completed { executed }
    }

    /// Write a status unless the run was stopped. The check and the write
    /// happen under the slot lock, so nothing lands after a reset.
    fn set_status(&self, run: &ActiveRun, id: &NodeId, status: NodeStatus) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if run.cancel.is_cancelled() {
            return false;
        }
        slot.statuses.insert(id.clone(), status);
        self.event_bus.publish(CadenceEvent::StatusChanged {
            run_id: run.run_id.clone(),
            node_id: id.clone(),
            status,
        });
        true
    }

    fn publish_if_active(&self, run: &ActiveRun, event: impl FnOnce() -> CadenceEvent) -> bool {
        let _slot = self.slot.lock().unwrap();
        if run.cancel.is_cancelled() {
            return false;
        }
        self.event_bus.publish(event());
        true
    }
}
