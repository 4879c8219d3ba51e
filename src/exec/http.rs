// src/exec/http.rs

//! HTTP payload execution via `reqwest`.
//!
//! A client is built per request because redirect, TLS and timeout policy
//! are per-task settings.

use reqwest::Method;
use reqwest::redirect::Policy;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::TaskError;
use crate::exec::runner::TaskOutput;
use crate::model::{HttpAuth, HttpPayload};
use crate::types::{ApiKeyLocation, HttpMethod};

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn build_client(payload: &HttpPayload) -> Result<reqwest::Client, TaskError> {
    let redirect = if payload.follow_redirects() {
        Policy::default()
    } else {
        Policy::none()
    };

    let mut builder = reqwest::Client::builder()
        .redirect(redirect)
        .danger_accept_invalid_certs(!payload.verify_ssl());
    if !payload.timeout().is_zero() {
        builder = builder.timeout(payload.timeout());
    }
    Ok(builder.build()?)
}

fn build_request(
    client: &reqwest::Client,
    payload: &HttpPayload,
) -> reqwest::RequestBuilder {
    let mut req = client.request(to_reqwest_method(payload.method()), payload.url().clone());

    if !payload.query_params().is_empty() {
        req = req.query(payload.query_params());
    }
    for (name, value) in payload.headers() {
        req = req.header(name.as_str(), value.as_str());
    }

    req = match payload.auth() {
        Some(HttpAuth::Basic { username, password }) => req.basic_auth(username, Some(password)),
        Some(HttpAuth::Bearer { token }) => req.bearer_auth(token),
        Some(HttpAuth::ApiKey {
            key,
            value,
            location: ApiKeyLocation::Header,
        }) => req.header(key.as_str(), value.as_str()),
        Some(HttpAuth::ApiKey {
            key,
            value,
            location: ApiKeyLocation::Query,
        }) => req.query(&[(key.as_str(), value.as_str())]),
        None => req,
    };

    if !payload.body().is_empty() {
        req = req.body(payload.body().to_vec());
    }
    req
}

/// Issue the request and succeed iff the response status equals the
/// payload's expected status.
///
/// Output is `{"status": <code>, "body": <text>}`.
pub async fn send(payload: &HttpPayload, cancel: &CancellationToken) -> Result<TaskOutput, TaskError> {
    let client = build_client(payload)?;
    let request = build_request(&client, payload);

    debug!(method = %payload.method(), url = %payload.url(), "sending HTTP request");

    let response = tokio::select! {
        res = request.send() => res?,
        _ = cancel.cancelled() => return Err(TaskError::Cancelled),
    };

    let status = response.status().as_u16();
    let body = tokio::select! {
        res = response.text() => res?,
        _ = cancel.cancelled() => return Err(TaskError::Cancelled),
    };

    debug!(url = %payload.url(), status, "HTTP response received");

    if status != payload.expected_status() {
        return Err(TaskError::UnexpectedStatus {
            expected: payload.expected_status(),
            actual: status,
        });
    }

    Ok(serde_json::json!({
        "status": status,
        "body": body,
    }))
}
