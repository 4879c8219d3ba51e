mod common;

use std::time::Duration;

use dagflow::engine::DagExecutor;
use dagflow::errors::{ExecError, TaskError};
use dagflow::exec::{PayloadRunner, http};
use dagflow::model::{HttpAuth, HttpPayload, TaskSpec, Workflow};
use dagflow::types::ApiKeyLocation;
use dagflow_test_utils::sink::CollectingSink;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{basic_auth, bearer_token, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{init_tracing, with_timeout};

async fn send(payload: &HttpPayload) -> Result<serde_json::Value, TaskError> {
    with_timeout(http::send(payload, &CancellationToken::new())).await
}

#[tokio::test]
async fn get_with_query_headers_and_bearer_auth() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(query_param("x", "1"))
        .and(header("x-trace", "abc"))
        .and(bearer_token("tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(format!("{}/ping", server.uri()), "get")
        .query("x", "1")
        .header("X-Trace", "abc")
        .auth(HttpAuth::Bearer {
            token: "tok".into(),
        })
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let out = send(&payload).await.unwrap();
    assert_eq!(out, json!({ "status": 200, "body": "pong" }));
}

#[tokio::test]
async fn post_sends_body_and_basic_auth() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(basic_auth("user", "pass"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(format!("{}/items", server.uri()), "POST")
        .body("hello")
        .expected_status(201)
        .auth(HttpAuth::Basic {
            username: "user".into(),
            password: "pass".into(),
        })
        .build()
        .unwrap();

    let out = send(&payload).await.unwrap();
    assert_eq!(out["status"], 201);
}

#[tokio::test]
async fn api_key_goes_to_query_or_header() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/q"))
        .and(query_param("api_key", "s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/h"))
        .and(header("x-api-key", "s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    for (route, key, location) in [
        ("/q", "api_key", ApiKeyLocation::Query),
        ("/h", "x-api-key", ApiKeyLocation::Header),
    ] {
        let payload = HttpPayload::builder(format!("{}{route}", server.uri()), "GET")
            .auth(HttpAuth::ApiKey {
                key: key.into(),
                value: "s3cret".into(),
                location,
            })
            .build()
            .unwrap();
        send(&payload).await.unwrap();
    }
}

#[tokio::test]
async fn unexpected_status_is_a_task_error() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(server.uri(), "GET").build().unwrap();
    let err = send(&payload).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::UnexpectedStatus {
            expected: 200,
            actual: 500
        }
    ));
    assert!(!err.is_permanent());
}

#[tokio::test]
async fn slow_response_hits_the_request_timeout() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(server.uri(), "GET")
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = send(&payload).await.unwrap_err();
    assert!(matches!(err, TaskError::Http(ref e) if e.is_timeout()), "got {err:?}");
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    init_tracing();
    // Reserve a free port, then release it so nothing is listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .unwrap();

    let payload = HttpPayload::builder(format!("http://{addr}/"), "GET")
        .build()
        .unwrap();
    let err = send(&payload).await.unwrap_err();
    assert!(matches!(err, TaskError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn http_task_inside_a_workflow() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(format!("{}/health", server.uri()), "GET")
        .build()
        .unwrap();
    let mut b = Workflow::builder("http flow");
    let check = b.add_root(TaskSpec::http("health", payload)).unwrap();
    let mut wf = b.build().unwrap();

    let sink = CollectingSink::new();
    let summary = with_timeout(DagExecutor::new(PayloadRunner::new()).execute(
        &mut wf,
        sink.clone(),
        &CancellationToken::new(),
    ))
    .await
    .unwrap();

    assert_eq!(summary.executed_tasks, 1);
    let records = sink.task_records();
    assert_eq!(records[0].task_id.as_ref(), Some(&check));
    assert_eq!(records[0].output, Some(json!({ "status": 200, "body": "ok" })));
}

#[tokio::test]
async fn failing_http_task_fails_the_workflow() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let payload = HttpPayload::builder(server.uri(), "GET").build().unwrap();
    let mut b = Workflow::builder("http flow");
    b.add_root(TaskSpec::http("missing", payload)).unwrap();
    let mut wf = b.build().unwrap();

    let sink = CollectingSink::new();
    let err = with_timeout(DagExecutor::new(PayloadRunner::new()).execute(
        &mut wf,
        sink.clone(),
        &CancellationToken::new(),
    ))
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ExecError::Task {
            source: TaskError::UnexpectedStatus { actual: 404, .. },
            ..
        }
    ));
    assert!(sink.records().is_empty());
}
