//! Cloud upload gateway
//!
//! Asks the backend to push a finished server-side artifact into the user's
//! drive. Exactly HTTP 200 counts as success; there is no retry.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::http::{endpoints, HttpRequest, Transport};

/// What to push: one file, or the per-zone folder of an encrypted image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UploadTarget {
    File(String),
    Folder(String),
}

impl std::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path),
            Self::Folder(folder) => write!(f, "folder {}", folder),
        }
    }
}

pub struct CloudUploadGateway {
    transport: Arc<dyn Transport>,
}

impl CloudUploadGateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn upload(&self, target: &UploadTarget) -> Result<(), ServiceError> {
        let request = match target {
            UploadTarget::File(path) => {
                HttpRequest::post_json(endpoints::UPLOAD_SINGLE, json!({ "file_path": path }))
            }
            UploadTarget::Folder(folder) => {
                HttpRequest::post_json(endpoints::upload_folder(folder), json!({}))
            }
        };
        let route = request.route();

        let reply = self.transport.send(request).await?;
        if reply.status != 200 {
            let message = reply
                .server_error()
                .unwrap_or_else(|| format!("Unexpected status {}", reply.status));
            tracing::error!("[Upload] {} failed: {}", target, message);
            return Err(ServiceError::Status {
                endpoint: route,
                status: reply.status,
                message,
            });
        }

        tracing::info!("[Upload] Pushed {} to drive", target);
        Ok(())
    }
}
