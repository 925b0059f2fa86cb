//! Transport gateway: wraps the HTTP boundary, normalizing transport-level
//! failures into `ClientError`.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::submission::ImageFile;
use crate::domain::ClientError;

/// Fixed request timeout the dashboard client ships with.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// Multipart body: named text parts plus at most one binary file part.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub file: Option<ImageFile>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: ImageFile) -> Self {
        self.file = Some(file);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Body {
    None,
    Json(Value),
    Multipart(MultipartBody),
}

/// Declarative request: method, path, query parameters, and body kind.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl RequestSpec {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = Body::Multipart(body);
        self
    }
}

/// Trait for the HTTP boundary (for mocking).
///
/// No retries at this layer; re-attempts belong to the poller or to explicit
/// user refresh.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn request(&self, spec: RequestSpec) -> Result<Value, ClientError>;
}

/// Real transport over reqwest with a fixed base URL and timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, spec: RequestSpec) -> Result<Value, ClientError> {
        let url = self.url(&spec.path);
        let mut request = match spec.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };

        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }

        request = match spec.body {
            Body::None => request,
            Body::Json(value) => request.json(&value),
            Body::Multipart(body) => {
                let mut form = reqwest::multipart::Form::new();

                for (name, value) in body.fields {
                    form = form.text(name, value);
                }

                if let Some(file) = body.file {
                    let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
                        .file_name(file.file_name)
                        .mime_str(&file.content_type)
                        .map_err(|e| {
                            ClientError::validation(format!("Invalid content type: {}", e))
                        })?;
                    form = form.part("file", part);
                }

                request.multipart(form)
            }
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::server(
                status.as_u16(),
                server_error_message(&body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::decode(format!("Failed to parse response: {}", e)))
    }
}

/// Pulls the structured message out of a non-2xx body when one is present.
/// The backend reports errors as `{"detail": ...}`; `message` is accepted as
/// a fallback spelling before giving up and returning the raw body.
fn server_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["detail", "message"] {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    body.to_string()
}
