use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Dwell of an `email` step during a test run.
pub const EMAIL_DWELL: Duration = Duration::from_millis(1500);
/// Dwell of a `wait` step during a test run. Longer than [`EMAIL_DWELL`].
pub const WAIT_DWELL: Duration = Duration::from_millis(3000);
/// Pause after a step completes, before the next one starts.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);
/// How long a completed run stays on screen before statuses reset.
pub const HOLD_DELAY: Duration = Duration::from_millis(1500);

/// Top-level Cadence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Timings of the "Test Workflow" simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_email_dwell_ms")]
    pub email_dwell_ms: u64,
    #[serde(default = "default_wait_dwell_ms")]
    pub wait_dwell_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            email_dwell_ms: default_email_dwell_ms(),
            wait_dwell_ms: default_wait_dwell_ms(),
            settle_ms: default_settle_ms(),
            hold_ms: default_hold_ms(),
        }
    }
}

impl SimulatorConfig {
    pub fn email_dwell(&self) -> Duration {
        Duration::from_millis(self.email_dwell_ms)
    }

    pub fn wait_dwell(&self) -> Duration {
        Duration::from_millis(self.wait_dwell_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

fn default_email_dwell_ms() -> u64 { EMAIL_DWELL.as_millis() as u64 }
fn default_wait_dwell_ms() -> u64 { WAIT_DWELL.as_millis() as u64 }
fn default_settle_ms() -> u64 { SETTLE_DELAY.as_millis() as u64 }
fn default_hold_ms() -> u64 { HOLD_DELAY.as_millis() as u64 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity of the event bus.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize { 256 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String { "cadence=info,warn".to_string() }

impl CadenceConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CadenceError::ConfigNotFound(path.display().to_string()),
            _ => CadenceError::Io(e),
        })?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| CadenceError::Config(e.to_string()))
    }

    /// Load config from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(CadenceError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CadenceError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Unset vars are left as written
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let sim = SimulatorConfig::default();
        assert_eq!(sim.email_dwell(), EMAIL_DWELL);
        assert_eq!(sim.wait_dwell(), WAIT_DWELL);
        assert!(sim.wait_dwell() > sim.email_dwell());
        assert_eq!(sim.settle(), SETTLE_DELAY);
        assert_eq!(sim.hold(), HOLD_DELAY);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: CadenceConfig = toml::from_str("[simulator]\nemail_dwell_ms = 10\n").unwrap();
        assert_eq!(config.simulator.email_dwell_ms, 10);
        assert_eq!(config.simulator.wait_dwell_ms, 3000);
        assert_eq!(config.events.capacity, 256);
        assert_eq!(config.log.filter, "cadence=info,warn");
    }

    #[test]
    fn test_expand_env_vars_keeps_unknown() {
        let out = expand_env_vars("filter = \"${CADENCE_SURELY_UNSET_VAR}\"");
        assert_eq!(out, "filter = \"${CADENCE_SURELY_UNSET_VAR}\"");
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let config = CadenceConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: CadenceConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.simulator, config.simulator);
    }
}
