//! Shared types for kubenav
//!
//! This crate contains the action catalog, the records exchanged between the
//! wizard and the cluster client, the preference store interface and the
//! error taxonomy used across the kubenav crates.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Action Catalog
// ============================================================================

/// Operation performed by a catalog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionOp {
    ViewLogs,
    FollowLogs,
    Shell,
    FastDeploy,
    Scale,
    UpdateImage,
    PortForward,
    Rollback,
    SetEnv,
    ListEnv,
    ListPods,
    ListRevisions,
    Ingress,
    Describe,
}

/// How free-form input for an action is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    ReplicaCount,
    Image,
    PortPair,
    Revision,
    EnvAssignment,
    LocalDirectory,
}

/// Free-form input requirement of an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSpec {
    pub prompt: &'static str,
    pub kind: InputKind,
}

/// What an action produces once executed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutput {
    /// Text shown on the result screen
    Text,
    /// Log content shown in the log viewer
    Logs { follow: bool },
    /// Terminal is handed to an external process after the session
    HandOff,
}

/// Static description of a wizard action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub op: ActionOp,
    pub needs_instance: bool,
    pub needs_subresource: bool,
    /// Base path whose sub-folders must be chosen before input
    pub nested_folder: Option<&'static str>,
    pub input: Option<InputSpec>,
    pub output: ActionOutput,
}

/// Directory inside the container that fast-deploy writes into
pub const ASSETS_BASE_PATH: &str = "/app/assets";

/// Tail hint for a one-shot log fetch
pub const STATIC_LOG_TAIL: i64 = 500;

/// Tail hint for a followed log stream
pub const FOLLOW_LOG_TAIL: i64 = 100;

const fn action(
    name: &'static str,
    description: &'static str,
    op: ActionOp,
    needs_instance: bool,
    needs_subresource: bool,
    output: ActionOutput,
) -> ActionSpec {
    ActionSpec {
        name,
        description,
        op,
        needs_instance,
        needs_subresource,
        nested_folder: None,
        input: None,
        output,
    }
}

const fn with_input(spec: ActionSpec, prompt: &'static str, kind: InputKind) -> ActionSpec {
    ActionSpec {
        input: Some(InputSpec { prompt, kind }),
        ..spec
    }
}

/// The fixed action catalog, in display order
pub static ACTIONS: &[ActionSpec] = &[
    action(
        "logs",
        "View container logs",
        ActionOp::ViewLogs,
        true,
        true,
        ActionOutput::Logs { follow: false },
    ),
    action(
        "logs-follow",
        "Follow container logs",
        ActionOp::FollowLogs,
        true,
        true,
        ActionOutput::Logs { follow: true },
    ),
    action(
        "shell",
        "Open shell (auto-detects bash/sh/ash)",
        ActionOp::Shell,
        true,
        true,
        ActionOutput::HandOff,
    ),
    ActionSpec {
        nested_folder: Some(ASSETS_BASE_PATH),
        ..with_input(
            action(
                "fast-deploy",
                "Deploy local dist to /app/assets",
                ActionOp::FastDeploy,
                true,
                true,
                ActionOutput::Text,
            ),
            "Enter local dist folder path:",
            InputKind::LocalDirectory,
        )
    },
    with_input(
        action("scale", "Scale deployment", ActionOp::Scale, false, false, ActionOutput::Text),
        "Enter replica count:",
        InputKind::ReplicaCount,
    ),
    with_input(
        action(
            "update-image",
            "Update container image",
            ActionOp::UpdateImage,
            false,
            true,
            ActionOutput::Text,
        ),
        "Enter new image:",
        InputKind::Image,
    ),
    with_input(
        action(
            "port-forward",
            "Forward port to pod",
            ActionOp::PortForward,
            true,
            false,
            ActionOutput::HandOff,
        ),
        "Enter ports (local:remote):",
        InputKind::PortPair,
    ),
    with_input(
        action("rollback", "Rollback deployment", ActionOp::Rollback, false, false, ActionOutput::Text),
        "Enter revision number:",
        InputKind::Revision,
    ),
    with_input(
        action(
            "set-env",
            "Set environment variable",
            ActionOp::SetEnv,
            false,
            true,
            ActionOutput::Text,
        ),
        "Enter KEY=VALUE:",
        InputKind::EnvAssignment,
    ),
    action(
        "list-env",
        "List environment variables",
        ActionOp::ListEnv,
        false,
        true,
        ActionOutput::Text,
    ),
    action("list-pods", "List all pods", ActionOp::ListPods, false, false, ActionOutput::Text),
    action(
        "list-revisions",
        "List deployment revisions",
        ActionOp::ListRevisions,
        false,
        false,
        ActionOutput::Text,
    ),
    action("ingress", "Show related ingresses", ActionOp::Ingress, false, false, ActionOutput::Text),
    action("describe", "Describe deployment", ActionOp::Describe, false, false, ActionOutput::Text),
];

impl ActionSpec {
    /// Look up a catalog entry by name
    pub fn find(name: &str) -> Option<&'static ActionSpec> {
        ACTIONS.iter().find(|a| a.name == name)
    }

    /// Look up a catalog entry from its selector display string
    pub fn from_display(display: &str) -> Option<&'static ActionSpec> {
        let name = display.split(" - ").next().unwrap_or(display).trim();
        Self::find(name)
    }

    /// String shown in the action selector
    pub fn display(&self) -> String {
        format!("{} - {}", self.name, self.description)
    }

    pub fn requires_freeform_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn input_prompt(&self) -> Option<&'static str> {
        self.input.map(|i| i.prompt)
    }
}

/// Display strings for every catalog entry
pub fn action_display_list() -> Vec<String> {
    ACTIONS.iter().map(ActionSpec::display).collect()
}

// ============================================================================
// Action Input
// ============================================================================

/// Validated free-form input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionInput {
    Replicas(i32),
    Image(String),
    Ports { local: u16, remote: u16 },
    Revision(i64),
    EnvVar { key: String, value: String },
    LocalPath(String),
}

impl ActionInput {
    /// Parse raw text entered by the user for the given input kind
    pub fn parse(kind: InputKind, raw: &str) -> Result<Self, String> {
        let value = raw.trim();
        match kind {
            InputKind::ReplicaCount => value
                .parse::<i32>()
                .ok()
                .filter(|n| *n >= 0)
                .map(ActionInput::Replicas)
                .ok_or_else(|| format!("invalid replica count: {}", value)),
            InputKind::Revision => value
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .map(ActionInput::Revision)
                .ok_or_else(|| format!("invalid revision number: {}", value)),
            InputKind::PortPair => {
                let invalid = || "invalid port format, use local:remote".to_string();
                let (local, remote) = value.split_once(':').ok_or_else(invalid)?;
                let local = local.trim().parse::<u16>().map_err(|_| invalid())?;
                let remote = remote.trim().parse::<u16>().map_err(|_| invalid())?;
                Ok(ActionInput::Ports { local, remote })
            }
            InputKind::EnvAssignment => match value.split_once('=') {
                Some((key, val)) if !key.trim().is_empty() => Ok(ActionInput::EnvVar {
                    key: key.trim().to_string(),
                    value: val.to_string(),
                }),
                _ => Err("invalid format, use KEY=VALUE".to_string()),
            },
            InputKind::Image if value.is_empty() => Err("image must not be empty".to_string()),
            InputKind::Image => Ok(ActionInput::Image(value.to_string())),
            InputKind::LocalDirectory if value.is_empty() => {
                Err("local path must not be empty".to_string())
            }
            InputKind::LocalDirectory => Ok(ActionInput::LocalPath(value.to_string())),
        }
    }
}

// ============================================================================
// Targets & Invocations
// ============================================================================

/// Container whose logs are read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogTarget {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
}

/// A fully resolved action ready to run against the cluster
#[derive(Clone, Debug)]
pub struct Invocation {
    pub action: &'static ActionSpec,
    pub namespace: String,
    pub resource: String,
    pub instance: Option<String>,
    pub subresource: Option<String>,
    pub folder: Option<String>,
    pub input: Option<ActionInput>,
}

impl Invocation {
    /// Log target of this invocation, if an instance was resolved
    pub fn log_target(&self) -> Option<LogTarget> {
        self.instance.as_ref().map(|pod| LogTarget {
            namespace: self.namespace.clone(),
            pod: pod.clone(),
            container: self.subresource.clone(),
        })
    }
}

/// Result of a successful action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Text for the result screen
    Text(String),
    /// The host must take over the terminal; `detail` carries e.g. the detected shell
    HandOff { detail: Option<String> },
}

/// Action to perform after the interactive session exits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandOff {
    pub op: ActionOp,
    pub action: String,
    pub kubeconfig: Option<String>,
    pub namespace: String,
    pub resource: String,
    pub instance: Option<String>,
    pub subresource: Option<String>,
    pub input: Option<ActionInput>,
    pub detail: Option<String>,
}

/// Format a pod for selector display
pub fn pod_display(name: &str, phase: &str) -> String {
    format!("{} ({})", name, phase)
}

/// Strip the status suffix added by [`pod_display`]
pub fn pod_name(display: &str) -> &str {
    match display.find(" (") {
        Some(idx) => &display[..idx],
        None => display,
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Upper bound on every recent-items list
pub const MAX_RECENT_ITEMS: usize = 5;

/// Category of a recent-items list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecentCategory {
    /// Kubeconfig paths
    Contexts,
    /// Deployments, scoped by namespace
    Resources,
    /// Action display strings
    Actions,
    /// Pods, scoped by deployment
    Instances,
    /// Log viewer search terms
    LogSearches,
}

/// Persistent preferences consulted by the wizard
pub trait PreferenceStore: Send {
    /// Recent items for a category, most recent first. `scope` is ignored by
    /// unscoped categories.
    fn recent(&self, category: RecentCategory, scope: &str) -> Vec<String>;
    fn record_recent(&mut self, category: RecentCategory, scope: &str, item: &str);
    fn last_namespace(&self) -> Option<String>;
    fn set_last_namespace(&mut self, namespace: &str);
    fn last_context_path(&self) -> Option<String>;
    fn set_last_context_path(&mut self, path: &str);
}

/// Move `item` to the front of `list`, removing duplicates and bounding the length
pub fn push_recent(list: &mut Vec<String>, item: &str) {
    if item.is_empty() {
        return;
    }
    list.retain(|existing| existing != item);
    list.insert(0, item.to_string());
    list.truncate(MAX_RECENT_ITEMS);
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of a remote call
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Transport(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the wizard
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WizardError {
    /// Candidate list could not be loaded; shown inline in the selector
    #[error("{0}")]
    Load(String),
    /// Action failed; shown on the result screen
    #[error("{0}")]
    Execution(String),
    /// Log stream ended abnormally
    #[error("log stream ended: {0}")]
    Stream(String),
    /// No usable cluster connection was ever established
    #[error("no usable kubeconfig: {0}")]
    FatalStartup(String),
}

impl From<ClientError> for WizardError {
    fn from(err: ClientError) -> Self {
        WizardError::Execution(err.to_string())
    }
}

impl fmt::Display for ActionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = ACTIONS
            .iter()
            .find(|a| a.op == *self)
            .map(|a| a.name)
            .unwrap_or("unknown");
        f.write_str(name)
    }
}
