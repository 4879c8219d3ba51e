// src/model/payload.rs

//! Payload kinds a task can carry.
//!
//! The set is closed: adding a kind means adding a [`Payload`] variant and a
//! dispatch arm in [`PayloadRunner`](crate::exec::PayloadRunner).

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use crate::errors::ValidationError;
use crate::model::MAX_HTTP_TIMEOUT;
use crate::types::{ApiKeyLocation, HttpMethod, TaskKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Log(LogPayload),
    Http(HttpPayload),
}

impl Payload {
    pub fn log(message: impl Into<String>) -> Self {
        Payload::Log(LogPayload::new(message))
    }

    /// The task kind this payload belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            Payload::Log(_) => TaskKind::Log,
            Payload::Http(_) => TaskKind::Http,
        }
    }
}

impl From<LogPayload> for Payload {
    fn from(p: LogPayload) -> Self {
        Payload::Log(p)
    }
}

impl From<HttpPayload> for Payload {
    fn from(p: HttpPayload) -> Self {
        Payload::Http(p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPayload {
    message: String,
}

impl LogPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Credentials attached to an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    Basic { username: String, password: String },
    Bearer { token: String },
    ApiKey {
        key: String,
        value: String,
        location: ApiKeyLocation,
    },
}

impl HttpAuth {
    fn validate(&self) -> Result<(), ValidationError> {
        let problem = match self {
            HttpAuth::Basic { username, .. } if username.is_empty() => {
                "basic auth username cannot be empty"
            }
            HttpAuth::Basic { password, .. } if password.is_empty() => {
                "basic auth password cannot be empty"
            }
            HttpAuth::Bearer { token } if token.is_empty() => "bearer token cannot be empty",
            HttpAuth::ApiKey { key, .. } if key.is_empty() => "API key name cannot be empty",
            HttpAuth::ApiKey { value, .. } if value.is_empty() => "API key value cannot be empty",
            _ => return Ok(()),
        };
        Err(ValidationError::InvalidAuth(problem.to_string()))
    }
}

/// A fully validated HTTP request description.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpPayload {
    url: Url,
    method: HttpMethod,
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
    timeout: Duration,
    auth: Option<HttpAuth>,
    follow_redirects: bool,
    verify_ssl: bool,
    expected_status: u16,
}

impl HttpPayload {
    /// Start describing a request. Nothing is checked until
    /// [`HttpPayloadBuilder::build`].
    pub fn builder(url: impl Into<String>, method: impl Into<String>) -> HttpPayloadBuilder {
        HttpPayloadBuilder {
            url: url.into(),
            method: method.into(),
            body: Vec::new(),
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            timeout: Duration::ZERO,
            auth: None,
            follow_redirects: true,
            verify_ssl: true,
            expected_status: 200,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    /// Per-request timeout; zero means "use the client default".
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn auth(&self) -> Option<&HttpAuth> {
        self.auth.as_ref()
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }
}

#[derive(Debug, Clone)]
pub struct HttpPayloadBuilder {
    url: String,
    method: String,
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
    timeout: Duration,
    auth: Option<HttpAuth>,
    follow_redirects: bool,
    verify_ssl: bool,
    expected_status: u16,
}

impl HttpPayloadBuilder {
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auth(mut self, auth: HttpAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn build(self) -> Result<HttpPayload, ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        let url = Url::parse(&self.url).map_err(|e| ValidationError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        let method: HttpMethod = self
            .method
            .parse()
            .map_err(|_| ValidationError::InvalidMethod(self.method.clone()))?;
        if self.timeout > MAX_HTTP_TIMEOUT {
            return Err(ValidationError::TimeoutOutOfRange {
                got: self.timeout,
                max: MAX_HTTP_TIMEOUT,
            });
        }
        if !(100..=599).contains(&self.expected_status) {
            return Err(ValidationError::StatusCodeOutOfRange(self.expected_status));
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }

        Ok(HttpPayload {
            url,
            method,
            body: self.body,
            headers: self.headers,
            query_params: self.query_params,
            timeout: self.timeout,
            auth: self.auth,
            follow_redirects: self.follow_redirects,
            verify_ssl: self.verify_ssl,
            expected_status: self.expected_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_normalization() {
        let p = HttpPayload::builder("https://example.com/health", "post")
            .header("accept", "application/json")
            .build()
            .expect("valid payload");
        assert_eq!(p.method(), HttpMethod::Post);
        assert_eq!(p.expected_status(), 200);
        assert!(p.follow_redirects());
        assert!(p.verify_ssl());
        assert!(p.query_params().is_empty());
        assert_eq!(p.headers().get("accept").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn url_checks() {
        assert_eq!(
            HttpPayload::builder("  ", "GET").build(),
            Err(ValidationError::EmptyUrl)
        );
        assert!(matches!(
            HttpPayload::builder("not a url", "GET").build(),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn method_timeout_and_status_checks() {
        assert_eq!(
            HttpPayload::builder("https://example.com", "FETCH").build(),
            Err(ValidationError::InvalidMethod("FETCH".to_string()))
        );
        assert!(matches!(
            HttpPayload::builder("https://example.com", "GET")
                .timeout(Duration::from_secs(31))
                .build(),
            Err(ValidationError::TimeoutOutOfRange { .. })
        ));
        assert_eq!(
            HttpPayload::builder("https://example.com", "GET")
                .expected_status(99)
                .build(),
            Err(ValidationError::StatusCodeOutOfRange(99))
        );
        assert!(HttpPayload::builder("https://example.com", "GET")
            .expected_status(599)
            .timeout(Duration::from_secs(30))
            .build()
            .is_ok());
    }

    #[test]
    fn auth_fields_must_be_filled() {
        let cases = [
            HttpAuth::Basic {
                username: String::new(),
                password: "p".into(),
            },
            HttpAuth::Basic {
                username: "u".into(),
                password: String::new(),
            },
            HttpAuth::Bearer {
                token: String::new(),
            },
            HttpAuth::ApiKey {
                key: String::new(),
                value: "v".into(),
                location: ApiKeyLocation::Header,
            },
            HttpAuth::ApiKey {
                key: "k".into(),
                value: String::new(),
                location: ApiKeyLocation::Query,
            },
        ];
        for auth in cases {
            let res = HttpPayload::builder("https://example.com", "GET")
                .auth(auth.clone())
                .build();
            assert!(
                matches!(res, Err(ValidationError::InvalidAuth(_))),
                "expected {auth:?} to be rejected"
            );
        }

        let ok = HttpPayload::builder("https://example.com", "GET")
            .auth(HttpAuth::ApiKey {
                key: "x-api-key".into(),
                value: "secret".into(),
                location: ApiKeyLocation::Header,
            })
            .build();
        assert!(ok.is_ok());
    }
}
