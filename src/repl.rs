use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::warn;

use cadence_core::traits::GraphEditor;
use cadence_core::types::{EdgeId, NodeId, PayloadPatch, Position, StepKind};
use cadence_flow::{CadenceLibrary, Simulator};

use crate::console::{drive_run, print_cadence};

const HELP: &str = "\
Commands:
  list                          List cadences
  use <name|id>                 Switch the active cadence
  new <name>                    Create a cadence and switch to it
  show                          Show the active cadence in run order
  add <after-id> <email|wait>   Insert a step after another step
  del <id>                      Delete a step, reconnecting its neighbours
  edit <id> key=value ...       Edit title/to/subject/body of a step
  connect <source> <target>     Add an edge between two steps
  disconnect <edge-id>          Remove an edge (e.g. en1-n2)
  move <id> <x> <y>             Move a step on the canvas
  run                           Test the active cadence (s = skip, q = stop)
  help                          Show this help
  quit                          Exit";

/// Parse `key=value` tokens into a patch. Tokens without `=` continue the
/// previous value, so `subject=Quick question` works unquoted.
pub fn parse_patch(tokens: &[&str]) -> Result<PayloadPatch, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
            None => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(token);
                }
                None => return Err(format!("expected key=value, got '{}'", token)),
            },
        }
    }

    let mut patch = PayloadPatch::default();
    for (key, value) in pairs {
        match key.as_str() {
            "title" => patch.title = Some(value),
            "to" => patch.to = Some(value),
            "subject" => patch.subject = Some(value),
            "body" => patch.body = Some(value),
            other => return Err(format!("unknown field '{}'", other)),
        }
    }
    Ok(patch)
}

/// Interactive cadence editor.
pub async fn run_repl(
    library: &mut CadenceLibrary,
    simulator: &Simulator,
    lines: &mut mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    println!("Cadence v{}", env!("CARGO_PKG_VERSION"));
    println!("Editing: {}", library.active().name);
    println!("Type help for commands, quit to exit.\n");

    let mut stdout = io::stdout();

    loop {
        print!("{}> ", library.active().name);
        stdout.flush()?;

        let Some(input) = lines.recv().await else {
            break; // EOF
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts[0] {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" | "?" => println!("{}", HELP),
            "list" => {
                let active = library.active().id.clone();
                for cadence in library.list() {
                    let marker = if cadence.id == active { "*" } else { " " };
                    println!(
                        " {} {:<3} {:<20} {} steps",
                        marker,
                        cadence.id,
                        cadence.name,
                        cadence.steps()
                    );
                }
            }
            "use" => match parts.get(1..).filter(|rest| !rest.is_empty()) {
                Some(rest) => match library.select(&rest.join(" ")) {
                    Ok(cadence) => println!("Editing: {}", cadence.name),
                    Err(e) => println!("{}", e),
                },
                None => println!("Usage: use <name|id>"),
            },
            "new" => {
                if parts.len() < 2 {
                    println!("Usage: new <name>");
                } else {
                    let cadence = library.create(parts[1..].join(" "));
                    println!("Created: {} ({})", cadence.name, cadence.id);
                }
            }
            "show" => print_cadence(library.active(), &simulator.statuses()),
            "add" => match (parts.get(1), parts.get(2).map(|k| k.parse::<StepKind>())) {
                (Some(after), Some(Ok(kind))) => {
                    let graph: &mut dyn GraphEditor = &mut library.active_mut().graph;
                    match graph.add_node_after(&NodeId::from(*after), kind) {
                        Ok(id) => println!("Added {} step {}", kind, id),
                        Err(e) => println!("{}", e),
                    }
                }
                (_, Some(Err(e))) => println!("{}", e),
                _ => println!("Usage: add <after-id> <email|wait>"),
            },
            "del" | "delete" => match parts.get(1) {
                Some(id) => {
                    let graph: &mut dyn GraphEditor = &mut library.active_mut().graph;
                    graph.delete_node(&NodeId::from(*id));
                    println!("Deleted {}", id);
                }
                None => println!("Usage: del <id>"),
            },
            "edit" => {
                if parts.len() < 3 {
                    println!("Usage: edit <id> key=value ...");
                    continue;
                }
                match parse_patch(&parts[2..]) {
                    Ok(patch) => {
                        let graph: &mut dyn GraphEditor = &mut library.active_mut().graph;
                        match graph.edit_payload(&NodeId::from(parts[1]), patch) {
                            Ok(()) => println!("Updated {}", parts[1]),
                            Err(e) => println!("{}", e),
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            "connect" => match (parts.get(1), parts.get(2)) {
                (Some(source), Some(target)) => {
                    let graph = &mut library.active_mut().graph;
                    match graph.connect(&NodeId::from(*source), &NodeId::from(*target)) {
                        Ok(edge) => println!("Connected {}", edge),
                        Err(e) => println!("{}", e),
                    }
                }
                _ => println!("Usage: connect <source> <target>"),
            },
            "disconnect" => match parts.get(1) {
                Some(edge) => {
                    let graph = &mut library.active_mut().graph;
                    if graph.disconnect(&EdgeId(edge.to_string())) {
                        println!("Disconnected {}", edge);
                    } else {
                        println!("No edge {}", edge);
                    }
                }
                None => println!("Usage: disconnect <edge-id>"),
            },
            "move" => {
                let coords = (
                    parts.get(2).and_then(|v| v.parse::<f64>().ok()),
                    parts.get(3).and_then(|v| v.parse::<f64>().ok()),
                );
                match (parts.get(1), coords) {
                    (Some(id), (Some(x), Some(y))) => {
                        let graph = &mut library.active_mut().graph;
                        if let Err(e) = graph.move_node(&NodeId::from(*id), Position::new(x, y)) {
                            println!("{}", e);
                        }
                    }
                    _ => println!("Usage: move <id> <x> <y>"),
                }
            }
            "run" | "test" => {
                let snapshot = library.active().graph.snapshot();
                if let Err(e) = drive_run(simulator, &snapshot, lines, false).await {
                    warn!(error = %e, "Test run output failed");
                }
            }
            other => println!("Unknown command: {}. Type help for commands.", other),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patch_joins_words() {
        let patch = parse_patch(&["subject=Quick", "question", "to=a@b.io"]).unwrap();
        assert_eq!(patch.subject.as_deref(), Some("Quick question"));
        assert_eq!(patch.to.as_deref(), Some("a@b.io"));
        assert!(patch.body.is_none());
    }

    #[test]
    fn test_parse_patch_rejects_unknown_field() {
        assert!(parse_patch(&["color=red"]).is_err());
        assert!(parse_patch(&["loose"]).is_err());
    }

    #[test]
    fn test_parse_patch_empty_value() {
        let patch = parse_patch(&["subject="]).unwrap();
        assert_eq!(patch.subject.as_deref(), Some(""));
    }
}
