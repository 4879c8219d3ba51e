// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::errors::ConfigError;
use crate::model::{HttpAuth, HttpPayload, Payload, TaskId, TaskSpec, Workflow};
use crate::types::{ApiKeyLocation, TaskKind};

/// Workflow file exactly as deserialized from TOML.
///
/// ```toml
/// [config]
/// timeout_secs = 300
///
/// [workflow]
/// name = "Fan-In Test"
///
/// [task.a]
/// type = "log"
/// message = "Task A executing"
/// next = ["d"]
/// ```
///
/// Nothing is cross-checked yet; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub workflow: WorkflowSection,

    /// Tasks keyed by their local label.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A workflow file whose references and reachability have been checked.
///
/// Built only through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub workflow: WorkflowSection,
    pub task: BTreeMap<String, TaskConfig>,
    /// Root labels: `[workflow].roots`, or every task without a parent.
    pub roots: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        workflow: WorkflowSection,
        task: BTreeMap<String, TaskConfig>,
        roots: Vec<String>,
    ) -> Self {
        Self {
            config,
            workflow,
            task,
            roots,
        }
    }

    /// Turn the file into a validated [`Workflow`].
    ///
    /// Every structural rule of [`WorkflowBuilder`](crate::model::WorkflowBuilder)
    /// applies; a task that breaks one is reported under its label.
    pub fn build_workflow(&self) -> Result<Workflow, ConfigError> {
        let ids: BTreeMap<&str, TaskId> = self
            .task
            .iter()
            .map(|(label, task)| {
                let id = task
                    .id
                    .as_deref()
                    .map(TaskId::from)
                    .unwrap_or_else(TaskId::generate);
                (label.as_str(), id)
            })
            .collect();

        let mut builder =
            Workflow::builder(self.workflow.name.as_str()).description(self.workflow.description.as_str());
        if let Some(id) = &self.workflow.id {
            builder = builder.id(id.as_str());
        }

        for (label, task) in &self.task {
            let mut spec = task.to_spec(label)?;
            if let Some(id) = ids.get(label.as_str()) {
                spec = spec.with_id(id.clone());
            }
            for next in &task.next {
                let id = ids.get(next.as_str()).ok_or_else(|| ConfigError::UnknownSuccessor {
                    task: label.clone(),
                    reference: next.clone(),
                })?;
                spec = spec.next(id.clone());
            }
            builder.add_task(spec).map_err(|source| ConfigError::Task {
                task: label.clone(),
                source,
            })?;
        }
        for root in &self.roots {
            let id = ids
                .get(root.as_str())
                .ok_or_else(|| ConfigError::UnknownRoot(root.clone()))?;
            builder.root(id);
        }

        let workflow = builder.build()?;
        debug!(
            workflow_id = %workflow.id(),
            total_tasks = workflow.total_tasks(),
            "built workflow from config"
        );
        Ok(workflow)
    }
}

/// `[config]` section: run-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Execution ceiling for the whole run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Re-run failed tasks according to their retry settings.
    #[serde(default)]
    pub retry: bool,

    /// Capacity of the progress channel between executor and printer.
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,

    /// Wait applied by log tasks before they emit.
    #[serde(default)]
    pub log_delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_sink_capacity() -> usize {
    16
}

impl ConfigSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn log_delay(&self) -> Duration {
        Duration::from_millis(self.log_delay_ms)
    }
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry: false,
            sink_capacity: default_sink_capacity(),
            log_delay_ms: 0,
        }
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Explicit id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default = "default_workflow_name")]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Entry points. When absent, every task nothing points at is a root.
    #[serde(default)]
    pub roots: Option<Vec<String>>,
}

fn default_workflow_name() -> String {
    "workflow".to_string()
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            id: None,
            name: default_workflow_name(),
            description: String::new(),
            roots: None,
        }
    }
}

/// `[task.<label>]` section.
///
/// Log and HTTP fields share one table; fields that do not apply to the
/// task's type are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// `"log"` or `"http"`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub id: Option<String>,

    /// Display name; the label is used when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Successor labels.
    #[serde(default)]
    pub next: Vec<String>,

    #[serde(default)]
    pub retries: u32,

    #[serde(default)]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub condition: String,

    /// Log message.
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    #[serde(default)]
    pub timeout_ms: u64,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub query: BTreeMap<String, String>,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl TaskConfig {
    pub fn task_kind(&self) -> Result<TaskKind, String> {
        self.kind.parse()
    }

    /// Unvalidated [`TaskSpec`] for this entry; successors are attached by the
    /// caller once every label has an id.
    fn to_spec(&self, label: &str) -> Result<TaskSpec, ConfigError> {
        let kind = self
            .task_kind()
            .map_err(|reason| ConfigError::InvalidTaskType {
                task: label.to_string(),
                reason,
            })?;
        let name = self.name.clone().unwrap_or_else(|| label.to_string());

        let mut spec = TaskSpec::new(name, kind)
            .retries(self.retries)
            .retry_delay(Duration::from_millis(self.retry_delay_ms))
            .condition(self.condition.as_str());
        match kind {
            TaskKind::Log => spec = spec.payload(Payload::log(self.message.as_str())),
            TaskKind::Http => {
                let payload = self.http_payload().map_err(|source| ConfigError::Task {
                    task: label.to_string(),
                    source,
                })?;
                spec = spec.payload(Payload::Http(payload));
            }
            // Rejected by the builder with a typed error.
            TaskKind::Unspecified => {}
        }
        Ok(spec)
    }

    fn http_payload(&self) -> Result<HttpPayload, crate::errors::ValidationError> {
        let mut builder = HttpPayload::builder(self.url.as_str(), self.method.as_str())
            .body(self.body.as_bytes())
            .timeout(Duration::from_millis(self.timeout_ms))
            .follow_redirects(self.follow_redirects)
            .verify_ssl(self.verify_ssl)
            .expected_status(self.expected_status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (name, value) in &self.query {
            builder = builder.query(name.as_str(), value.as_str());
        }
        if let Some(auth) = &self.auth {
            builder = builder.auth(auth.to_auth());
        }
        builder.build()
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_expected_status() -> u16 {
    200
}

fn default_true() -> bool {
    true
}

/// `auth = { kind = "...", ... }` on an HTTP task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthConfig {
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    #[serde(alias = "api_key")]
    ApiKey {
        key: String,
        value: String,
        #[serde(default = "default_key_location")]
        location: ApiKeyLocation,
    },
}

impl AuthConfig {
    fn to_auth(&self) -> HttpAuth {
        match self.clone() {
            AuthConfig::Basic { username, password } => HttpAuth::Basic { username, password },
            AuthConfig::Bearer { token } => HttpAuth::Bearer { token },
            AuthConfig::ApiKey {
                key,
                value,
                location,
            } => HttpAuth::ApiKey {
                key,
                value,
                location,
            },
        }
    }
}

fn default_key_location() -> ApiKeyLocation {
    ApiKeyLocation::Header
}
