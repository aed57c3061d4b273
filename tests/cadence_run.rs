use std::time::Duration;

use cadence_core::traits::GraphEditor;
use cadence_core::types::{CadenceEvent, EmailDraft, NodeId, NodeStatus, RunState, StepKind};
use cadence_flow::simulator::traversal_order;
use cadence_flow::{node_views, CadenceLibrary, RunOutcome, Simulator};
use cadence_test_utils::{bus_with_receiver, collect_until, fast_config, transitions};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn edit_then_run_welcome_sequence() {
    let mut library = CadenceLibrary::with_samples();
    let graph = &mut library.active_mut().graph;

    // Add a wait after the first email, then drop the final email.
    let editor: &mut dyn GraphEditor = graph;
    let wait = editor
        .add_node_after(&NodeId::from("n1"), StepKind::Wait)
        .expect("n1 exists");
    editor.delete_node(&NodeId::from("n5"));
    editor
        .edit_payload(
            &NodeId::from("n3"),
            EmailDraft {
                to: "lead@acme.io".into(),
                subject: "Circling back".into(),
                body: "Any thoughts?".into(),
            }
            .into(),
        )
        .expect("n3 exists");

    let snapshot = library.active().graph.snapshot();
    let order: Vec<String> = traversal_order(&snapshot)
        .into_iter()
        .map(|id| id.0)
        .collect();
    assert_eq!(order, vec!["n1", wait.as_str(), "n2", "n3", "n4"]);

    let (bus, mut rx) = bus_with_receiver();
    let simulator = Simulator::new(fast_config(), bus);
    let handle = simulator.start(&snapshot).expect("run starts");

    let events = collect_until(&mut rx, TIMEOUT, |e| {
        matches!(e, CadenceEvent::StatusesReset { .. })
    })
    .await;
    assert!(matches!(
        handle.finished().await,
        RunOutcome::Completed { ref executed } if executed.len() == 5
    ));

    let executing: Vec<String> = transitions(&events)
        .into_iter()
        .filter(|(_, s)| *s == NodeStatus::Executing)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(executing, order);
    assert_eq!(simulator.run_state(), RunState::Idle);

    let views = node_views(&snapshot, &simulator.statuses());
    let n3 = views.iter().find(|v| v.id.as_str() == "n3").unwrap();
    assert_eq!(n3.payload.subtitle.as_deref(), Some("Circling back"));
    assert!(views.iter().all(|v| v.status == NodeStatus::Idle));
}

#[tokio::test]
async fn stop_mid_run_then_restart() {
    let library = CadenceLibrary::with_samples();
    let snapshot = library.find("Cold Outreach").unwrap().graph.snapshot();

    let (bus, mut rx) = bus_with_receiver();
    let simulator = Simulator::new(fast_config(), bus);
    let handle = simulator.start(&snapshot).expect("run starts");

    collect_until(&mut rx, TIMEOUT, |e| {
        matches!(
            e,
            CadenceEvent::StatusChanged { node_id, status: NodeStatus::Executing, .. }
                if node_id.as_str() == "n2"
        )
    })
    .await;

    assert!(simulator.stop());
    assert_eq!(handle.finished().await, RunOutcome::Cancelled);
    assert!(simulator
        .statuses()
        .values()
        .all(|s| *s == NodeStatus::Idle));

    // A fresh run is accepted after a stop.
    let again = simulator.start(&snapshot).expect("restart");
    assert!(matches!(again.finished().await, RunOutcome::Completed { .. }));
}
