// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared kind of a task.
///
/// The kind must agree with the payload variant the task carries; the
/// builder rejects a mismatch and the runner re-checks it before dispatch.
/// `Unspecified` exists so that unknown kinds coming from outside (config
/// files, stores) have a representation; it is never valid on a built task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    #[default]
    Unspecified,
    Log,
    Http,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Unspecified => "UNSPECIFIED",
            TaskKind::Log => "LOG",
            TaskKind::Http => "HTTP",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(TaskKind::Log),
            "http" => Ok(TaskKind::Http),
            "" | "unspecified" => Ok(TaskKind::Unspecified),
            other => Err(format!(
                "invalid task type: {other} (expected \"log\" or \"http\")"
            )),
        }
    }
}

/// Per-task execution status.
///
/// Starts at `Pending`; only the task runner moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum TaskStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl TaskStatus {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TaskStatus::Running,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Lifecycle of one workflow execution: `Idle -> Running -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::Idle => "IDLE",
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Standard HTTP verbs accepted by an HTTP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("invalid HTTP method: {other}")),
        }
    }
}

/// Where an API key credential is attached to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
}

impl FromStr for ApiKeyLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "header" => Ok(ApiKeyLocation::Header),
            "query" => Ok(ApiKeyLocation::Query),
            other => Err(format!(
                "invalid API key location: {other} (expected \"header\" or \"query\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_kind_parses_case_insensitively() {
        assert_eq!("LOG".parse::<TaskKind>(), Ok(TaskKind::Log));
        assert_eq!(" http ".parse::<TaskKind>(), Ok(TaskKind::Http));
        assert_eq!("".parse::<TaskKind>(), Ok(TaskKind::Unspecified));
        assert!("grpc".parse::<TaskKind>().is_err());
    }

    #[test]
    fn defaults_are_the_unset_states() {
        assert_eq!(TaskKind::default(), TaskKind::Unspecified);
        assert_eq!(WorkflowStatus::default(), WorkflowStatus::Idle);
    }

    #[test]
    fn http_method_normalizes_to_upper_case() {
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn task_status_round_trips_through_raw_byte() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_u8(status as u8), status);
        }
    }
}
