//! Drive listing and file actions
//!
//! Maps the backend's raw drive listing into [`DriveFile`]s with display-ready
//! size and date, and exposes download, delete and the decrypt hand-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::decrypt::DecryptTarget;
use crate::error::{DriveError, ServiceError};
use crate::http::{call_bytes, call_json, endpoints, HttpRequest, Transport};
use crate::intake::{file_stem_of, Lane};
use crate::sink::ArtifactSink;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
const MISSING: &str = "—";
const UNTITLED: &str = "Untitled";

/// Listing entry as the backend sends it; every field is optional and loosely typed
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDriveFile {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<serde_json::Value>,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    encrypted: Option<serde_json::Value>,
    #[serde(default)]
    flags: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveFileStatus {
    Unverified,
    Masked,
    Safe,
    Other(String),
}

impl DriveFileStatus {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None | Some("unverified") => Self::Unverified,
            Some("masked") => Self::Masked,
            Some("safe") => Self::Safe,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DriveFileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => f.write_str("unverified"),
            Self::Masked => f.write_str("masked"),
            Self::Safe => f.write_str("safe"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Human-readable size, e.g. `1.5 KB`
    pub size: String,
    /// Server storage folder; defaults to the name without extension
    pub folder: String,
    /// `YYYY-MM-DD`
    pub upload_date: String,
    pub status: DriveFileStatus,
    pub encrypted: bool,
    pub flags: u32,
    pub lane: Lane,
}

impl DriveFile {
    fn from_raw(raw: RawDriveFile) -> Self {
        let name = raw.name.filter(|n| !n.is_empty()).unwrap_or_else(|| UNTITLED.to_string());
        let folder = raw
            .folder
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| file_stem_of(&name).to_string());

        Self {
            id: raw.id.as_ref().map(value_to_string).unwrap_or_default(),
            size: format_file_size(raw.size.as_ref().and_then(value_to_f64)),
            upload_date: format_date(raw.modified_time.as_deref()),
            status: DriveFileStatus::parse(raw.status.as_deref()),
            encrypted: raw.encrypted.as_ref().is_some_and(truthy),
            flags: raw
                .flags
                .as_ref()
                .and_then(value_to_f64)
                .filter(|f| f.is_finite() && *f > 0.0)
                .map_or(0, |f| f as u32),
            lane: Lane::from_file_name(&name),
            folder,
            name,
        }
    }

    /// Where to send this file for decryption; `None` if it is not encrypted
    pub fn decrypt_target(&self) -> Option<DecryptTarget> {
        self.encrypted.then(|| DecryptTarget {
            name: self.name.clone(),
            folder: self.folder.clone(),
            lane: self.lane,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveFilter {
    #[default]
    All,
    /// At least one flag
    Flagged,
    Safe,
}

impl DriveFilter {
    pub fn matches(&self, file: &DriveFile) -> bool {
        match self {
            Self::All => true,
            Self::Flagged => file.flags > 0,
            Self::Safe => file.status == DriveFileStatus::Safe,
        }
    }
}

impl std::str::FromStr for DriveFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "flagged" => Ok(Self::Flagged),
            "safe" => Ok(Self::Safe),
            other => Err(format!("Unknown filter '{}' (expected all, flagged or safe)", other)),
        }
    }
}

/// Apply a filter and a case-insensitive name search
pub fn filter_files<'a>(files: &'a [DriveFile], filter: DriveFilter, search: &str) -> Vec<&'a DriveFile> {
    let needle = search.to_lowercase();
    files
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle) && filter.matches(f))
        .collect()
}

pub struct DriveClient {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
}

impl DriveClient {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self { transport, sink }
    }

    pub async fn list(&self) -> Result<Vec<DriveFile>, ServiceError> {
        let raw: Option<Vec<RawDriveFile>> =
            call_json(self.transport.as_ref(), HttpRequest::get(endpoints::DRIVE_LISTING)).await?;
        let files: Vec<DriveFile> = raw.unwrap_or_default().into_iter().map(DriveFile::from_raw).collect();
        tracing::info!("[Drive] Listed {} file(s)", files.len());
        Ok(files)
    }

    pub async fn download(&self, file: &DriveFile) -> Result<PathBuf, DriveError> {
        let bytes = call_bytes(self.transport.as_ref(), HttpRequest::get(endpoints::drive_download(&file.id))).await?;
        let path = self.sink.save(&file.name, &bytes).await.map_err(DriveError::Save)?;
        Ok(path)
    }

    /// Succeeds only on HTTP 200
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let request = HttpRequest::delete(endpoints::drive_delete(id));
        let route = request.route();
        let reply = self.transport.send(request).await?;

        if reply.status != 200 {
            let message = reply.server_error().unwrap_or_else(|| "Unknown error".to_string());
            tracing::error!("[Drive] Delete of {} failed: {}", id, message);
            return Err(ServiceError::Status {
                endpoint: route,
                status: reply.status,
                message,
            });
        }

        tracing::info!("[Drive] Deleted {}", id);
        Ok(())
    }
}

/// `1536` → `1.5 KB`; missing or non-positive → `—`
pub fn format_file_size(bytes: Option<f64>) -> String {
    let Some(bytes) = bytes.filter(|b| b.is_finite() && *b > 0.0) else {
        return MISSING.to_string();
    };

    let exponent = (bytes.ln() / 1024f64.ln()).floor().clamp(0.0, (SIZE_UNITS.len() - 1) as f64);
    let value = bytes / 1024f64.powi(exponent as i32);
    let rounded = (value * 10.0).round() / 10.0;
    format!("{} {}", rounded, SIZE_UNITS[exponent as usize])
}

/// RFC 3339 timestamp → `YYYY-MM-DD` (UTC); unparseable → `—`
pub fn format_date(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|d| d.with_timezone(&Utc).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Null => false,
        _ => true,
    }
}
