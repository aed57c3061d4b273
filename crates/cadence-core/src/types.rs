use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a step node within one cadence graph.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of an edge. Derived from its endpoints, see [`EdgeId::between`].
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn between(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("e{}-{}", source, target))
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of one simulator run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a cadence step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Email,
    Wait,
}

impl StepKind {
    /// Title given to a freshly inserted step of this kind.
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Email => "New Email",
            Self::Wait => "Wait 1 day",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

impl std::str::FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" | "cadence" => Ok(Self::Email),
            "wait" | "delay" => Ok(Self::Wait),
            other => Err(format!("unknown step kind: {other}")),
        }
    }
}

/// Transient execution status of a node during a test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Executing,
    Complete,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Executing => write!(f, "executing"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Layout position. Only used for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &Position) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Display and content data of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl NodePayload {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Merge the supplied fields of `patch` into this payload.
    ///
    /// A supplied subject also becomes the subtitle, empty or not.
    pub fn merge(&mut self, patch: PayloadPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = Some(subtitle);
        }
        if let Some(to) = patch.to {
            self.to = Some(to);
        }
        if let Some(body) = patch.body {
            self.body = Some(body);
        }
        if let Some(subject) = patch.subject {
            self.subtitle = Some(subject.clone());
            self.subject = Some(subject);
        }
    }
}

/// Partial payload update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PayloadPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.to.is_none()
            && self.subject.is_none()
            && self.body.is_none()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Full replacement content produced by the email edit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    /// Pre-fill a draft from an existing payload, empty where unset.
    pub fn from_payload(payload: &NodePayload) -> Self {
        Self {
            to: payload.to.clone().unwrap_or_default(),
            subject: payload.subject.clone().unwrap_or_default(),
            body: payload.body.clone().unwrap_or_default(),
        }
    }
}

impl From<EmailDraft> for PayloadPatch {
    fn from(draft: EmailDraft) -> Self {
        Self {
            to: Some(draft.to),
            subject: Some(draft.subject),
            body: Some(draft.body),
            ..Default::default()
        }
    }
}

/// Lifecycle state of the execution simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Events published on the [`EventBus`](crate::event::EventBus).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CadenceEvent {
    /// A run started with the given frozen traversal order.
    RunStarted {
        run_id: RunId,
        order: Vec<NodeId>,
        started_at: DateTime<Utc>,
    },
    /// A node changed status.
    StatusChanged {
        run_id: RunId,
        node_id: NodeId,
        status: NodeStatus,
    },
    /// A node's dwell was cut short by a skip.
    StepSkipped { run_id: RunId, node_id: NodeId },
    /// The traversal order was exhausted.
    RunCompleted { run_id: RunId, executed: usize },
    /// The run was stopped before finishing.
    RunCancelled { run_id: RunId },
    /// Every node status went back to idle.
    StatusesReset { run_id: RunId },
}

impl CadenceEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StatusChanged { run_id, .. }
            | Self::StepSkipped { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunCancelled { run_id }
            | Self::StatusesReset { run_id } => run_id,
        }
    }
}
