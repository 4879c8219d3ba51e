mod common;

use std::io::Write;
use std::time::Duration;

use dagflow::build_executor;
use dagflow::config::{AuthConfig, load_and_validate, load_from_path};
use dagflow::errors::{ConfigError, ValidationError};
use dagflow::model::{HttpAuth, Payload};
use dagflow::types::{ApiKeyLocation, HttpMethod, TaskKind, WorkflowStatus};
use dagflow_test_utils::sink::CollectingSink;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use common::{init_tracing, with_timeout};

const FAN_IN: &str = r#"
[config]
timeout_secs = 30

[workflow]
id = "fan-in-test"
name = "Fan-In Test"
description = "3 root tasks -> 1 shared task"

[task.a]
type = "log"
name = "Task A"
message = "Task A executing"
next = ["d"]

[task.b]
type = "log"
message = "Task B executing"
next = ["d"]

[task.c]
type = "LOG"
message = "Task C executing"
next = ["d"]

[task.d]
type = "log"
message = "Task D executing (fan-in)"
next = ["e"]

[task.e]
type = "log"
message = "Task E executing"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_apply_when_sections_are_missing() {
    let file = write_config(
        r#"
        [task.only]
        type = "log"
        "#,
    );
    let raw = load_from_path(file.path()).unwrap();
    assert_eq!(raw.config.timeout_secs, 300);
    assert!(!raw.config.retry);
    assert_eq!(raw.config.sink_capacity, 16);
    assert_eq!(raw.config.log_delay(), Duration::ZERO);
    assert_eq!(raw.workflow.name, "workflow");
    assert!(raw.workflow.roots.is_none());
}

#[tokio::test]
async fn fan_in_file_builds_and_runs() {
    init_tracing();
    let file = write_config(FAN_IN);
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.roots, vec!["a", "b", "c"]);

    let mut wf = cfg.build_workflow().unwrap();
    assert_eq!(wf.id().as_str(), "fan-in-test");
    assert_eq!(wf.name(), "Fan-In Test");
    assert_eq!(wf.total_tasks(), 5);
    let names: Vec<&str> = wf.roots().map(|t| t.name()).collect();
    assert_eq!(names, vec!["Task A", "b", "c"]);

    let sink = CollectingSink::new();
    let executor = build_executor(&cfg.config, cfg.config.retry);
    assert_eq!(executor.options().timeout, Duration::from_secs(30));
    let summary = with_timeout(executor.execute(&mut wf, sink.clone(), &CancellationToken::new()))
        .await
        .unwrap();

    assert_eq!(summary.executed_tasks, 5);
    assert_eq!(wf.status(), WorkflowStatus::Completed);
    assert_eq!(sink.records().len(), 6);
}

#[test]
fn http_task_fields_map_onto_the_payload() {
    let file = write_config(
        r#"
        [task.h]
        type = "http"
        url = "https://example.com/health"
        method = "post"
        expected_status = 201
        timeout_ms = 2500
        verify_ssl = false
        headers = { accept = "application/json" }
        query = { q = "1" }
        body = "{}"
        auth = { kind = "apikey", key = "x-api-key", value = "secret", location = "query" }
        retries = 2
        retry_delay_ms = 100
        "#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    assert!(matches!(
        cfg.task["h"].auth,
        Some(AuthConfig::ApiKey {
            location: ApiKeyLocation::Query,
            ..
        })
    ));

    let wf = cfg.build_workflow().unwrap();
    let task = wf.roots().next().unwrap();
    assert_eq!(task.kind(), TaskKind::Http);
    assert_eq!(task.name(), "h");
    assert_eq!(task.retries(), 2);
    assert_eq!(task.retry_delay(), Duration::from_millis(100));

    let Payload::Http(http) = task.payload() else {
        panic!("expected an HTTP payload");
    };
    assert_eq!(http.method(), HttpMethod::Post);
    assert_eq!(http.expected_status(), 201);
    assert_eq!(http.timeout(), Duration::from_millis(2500));
    assert!(http.follow_redirects());
    assert!(!http.verify_ssl());
    assert_eq!(http.body(), b"{}");
    assert_eq!(http.query_params().get("q").map(String::as_str), Some("1"));
    assert_eq!(
        http.auth(),
        Some(&HttpAuth::ApiKey {
            key: "x-api-key".into(),
            value: "secret".into(),
            location: ApiKeyLocation::Query,
        })
    );
}

#[test]
fn invalid_task_settings_are_reported_under_their_label() {
    let file = write_config(
        r#"
        [task.slow]
        type = "log"
        retries = 9
        "#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    let err = cfg.build_workflow().unwrap_err();
    assert_eq!(
        err,
        ConfigError::Task {
            task: "slow".into(),
            source: ValidationError::RetriesOutOfRange { got: 9, max: 5 },
        }
    );

    let file = write_config(
        r#"
        [task.h]
        type = "http"
        url = "not a url"
        "#,
    );
    let err = load_and_validate(file.path())
        .unwrap()
        .build_workflow()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Task {
            source: ValidationError::InvalidUrl { .. },
            ..
        }
    ));
}

#[test]
fn validation_errors_survive_the_anyhow_context() {
    let file = write_config(
        r#"
        [config]
        timeout_secs = 0

        [task.a]
        type = "log"
        "#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::InvalidSetting {
            key: "timeout_secs",
            got: 0
        })
    );
}

#[test]
fn unreadable_and_malformed_files_fail_with_context() {
    let err = load_from_path("/definitely/not/here.toml").unwrap_err();
    assert!(format!("{err:#}").contains("failed to read workflow file"));

    let file = write_config("[task.a\ntype = ");
    let err = load_from_path(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse workflow file"));
}

#[test]
fn too_many_tasks_is_rejected_by_the_builder() {
    let mut src = String::new();
    for i in 0..11 {
        src.push_str(&format!("[task.t{i}]\ntype = \"log\"\n"));
        if i < 10 {
            src.push_str(&format!("next = [\"t{}\"]\n", i + 1));
        }
    }
    let file = write_config(&src);
    let err = load_and_validate(file.path())
        .unwrap()
        .build_workflow()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::Workflow(ValidationError::TooManyTotalTasks { got: 11, max: 10 })
    );
}
