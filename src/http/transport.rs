//! Transport seam
//!
//! Every backend call goes through [`Transport::send`] so the workflow can be
//! driven against a scripted backend in tests. Requests carry a path relative
//! to the API base; the concrete transport resolves it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ServiceError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// One multipart form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn text(name: &str, value: &str) -> Self {
        Self::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn file(name: &str, file_name: &str, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime: mime.map(str::to_string),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn post_multipart(path: impl Into<String>, parts: Vec<FormPart>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Multipart(parts),
        }
    }

    /// `"POST /upload"` style route key
    pub fn route(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

/// A fully buffered response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpReply {
    pub fn new(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body,
        }
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self::new(status, Some("application/json"), value.to_string().into_bytes())
    }

    pub fn binary(status: u16, body: Vec<u8>) -> Self {
        Self::new(status, Some("application/octet-stream"), body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the payload is structured text rather than file content
    pub fn is_textual(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_lowercase();
                ct.starts_with("application/json") || ct.starts_with("text/html")
            })
            .unwrap_or(false)
    }

    /// The server's `error` field, if the body is JSON and carries one
    pub fn server_error(&self) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.is_empty())
    }

    /// Convert a non-2xx reply into a `ServiceError::Status`
    pub fn error_for_status(self, endpoint: &str) -> Result<Self, ServiceError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.server_error().unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&self.body).trim().to_string();
            if text.is_empty() {
                format!("HTTP {}", self.status)
            } else {
                format!("HTTP {}: {}", self.status, text)
            }
        });
        Err(ServiceError::Status {
            endpoint: endpoint.to_string(),
            status: self.status,
            message,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ServiceError> {
        serde_json::from_slice(&self.body).map_err(|e| ServiceError::Decode {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, TransportError>;
}

/// Send, require a 2xx, and decode the JSON body
pub async fn call_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<T, ServiceError> {
    let endpoint = request.route();
    let reply = transport.send(request).await?.error_for_status(&endpoint)?;
    reply.decode(&endpoint)
}

/// Send, require a 2xx, and return the raw body
pub async fn call_bytes(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<Vec<u8>, ServiceError> {
    let endpoint = request.route();
    let reply = transport.send(request).await?.error_for_status(&endpoint)?;
    Ok(reply.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_error_field_preferred() {
        let reply = HttpReply::json(500, json!({"error": "quota exceeded"}));
        let err = reply.error_for_status("POST /mask").unwrap_err();
        assert_eq!(err.user_message(), "quota exceeded");
    }

    #[test]
    fn test_raw_body_when_no_error_field() {
        let reply = HttpReply::new(502, Some("text/plain"), b"Bad Gateway".to_vec());
        let err = reply.error_for_status("POST /mask").unwrap_err();
        assert_eq!(err.user_message(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_success_passes_through() {
        let reply = HttpReply::json(201, json!({"ok": true}));
        assert!(reply.error_for_status("POST /x").is_ok());
    }

    #[test]
    fn test_textual_detection() {
        assert!(HttpReply::json(200, json!({})).is_textual());
        assert!(HttpReply::new(200, Some("text/html; charset=utf-8"), vec![]).is_textual());
        assert!(!HttpReply::binary(200, vec![1, 2]).is_textual());
        assert!(!HttpReply::new(200, None, vec![1]).is_textual());
    }

    #[test]
    fn test_route_key() {
        assert_eq!(HttpRequest::get("auth/drive").route(), "GET auth/drive");
    }
}
