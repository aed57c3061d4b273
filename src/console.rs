use std::collections::HashMap;
use std::io::{self, BufRead};

use tokio::sync::mpsc;

use cadence_core::types::{CadenceEvent, NodeId, NodeStatus};
use cadence_flow::simulator::traversal_order;
use cadence_flow::{node_views, Cadence, GraphSnapshot, Simulator};

/// Forward stdin lines to a channel from a dedicated thread.
///
/// One reader serves the whole process so the REPL and a running test
/// share stdin.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn status_marker(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Idle => " ",
        NodeStatus::Executing => ">",
        NodeStatus::Complete => "x",
    }
}

/// Print a cadence in traversal order, followed by any unreachable steps.
pub fn print_cadence(cadence: &Cadence, statuses: &HashMap<NodeId, NodeStatus>) {
    let snapshot = cadence.graph.snapshot();
    let order = traversal_order(&snapshot);
    let views = node_views(&snapshot, statuses);

    println!("{} ({} steps)", cadence.name, cadence.steps());
    for (index, id) in order.iter().enumerate() {
        if let Some(view) = views.iter().find(|v| &v.id == id) {
            let subtitle = view
                .payload
                .subtitle
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| format!(" - {}", s))
                .unwrap_or_default();
            println!(
                "  [{}] {}. {:<4} {:<6} {}{}",
                status_marker(view.status),
                index + 1,
                view.id.as_str(),
                view.kind.to_string(),
                view.payload.title,
                subtitle
            );
        }
    }

    let detached: Vec<_> = views.iter().filter(|v| !order.contains(&v.id)).collect();
    if !detached.is_empty() {
        println!("  not reachable from start:");
        for view in detached {
            println!(
                "      {:<4} {:<6} {}",
                view.id.as_str(),
                view.kind.to_string(),
                view.payload.title
            );
        }
    }
}

/// Print one simulator event, either as a JSON line or human-readable.
pub fn print_event(event: &CadenceEvent, snapshot: &GraphSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let title = |id: &NodeId| {
        snapshot
            .node(id)
            .map(|n| n.payload.title.clone())
            .unwrap_or_else(|| id.to_string())
    };

    match event {
        CadenceEvent::RunStarted { order, .. } => {
            println!("Test run started ({} steps)", order.len());
        }
        CadenceEvent::StatusChanged {
            node_id, status, ..
        } if *status != NodeStatus::Idle => {
            println!("  [{}] {} {}", status_marker(*status), title(node_id), status);
        }
        CadenceEvent::StatusChanged { .. } => {}
        CadenceEvent::StepSkipped { node_id, .. } => {
            println!("  skipped wait on {}", title(node_id));
        }
        CadenceEvent::RunCompleted { executed, .. } => {
            println!("Test run complete: {} steps executed", executed);
        }
        CadenceEvent::RunCancelled { .. } => println!("Test run stopped"),
        CadenceEvent::StatusesReset { .. } => {}
    }
    Ok(())
}

/// Drive one test run: print events, forward skip/stop from stdin, stop on Ctrl-C.
///
/// Returns once the run has fully ended.
pub async fn drive_run(
    simulator: &Simulator,
    snapshot: &GraphSnapshot,
    lines: &mut mpsc::Receiver<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut events = simulator.event_bus().subscribe();
    let Some(handle) = simulator.start(snapshot) else {
        println!("A test run is already in progress.");
        return Ok(());
    };
    if !json {
        println!("Type 's' to skip the current step, 'q' to stop.");
    }

    let finished = handle.finished();
    tokio::pin!(finished);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = &mut finished => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, snapshot, json)?,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            line = lines.recv(), if stdin_open => match line.as_deref().map(str::trim) {
                Some("s") | Some("skip") => {
                    if !simulator.skip() {
                        println!("  nothing to skip right now");
                    }
                }
                Some("q") | Some("stop") => {
                    simulator.stop();
                }
                Some(_) => {}
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                simulator.stop();
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        print_event(&event, snapshot, json)?;
    }
    Ok(())
}
