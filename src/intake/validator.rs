use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media types the backend can scan
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
    "image/png",
    "image/jpeg",
    "image/jpg",
];

const IMAGE_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Extensions offered by the file picker. The advertised 10MB limit is not enforced here.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "png", "jpg", "jpeg", "csv", "xlsx", "xls",
];

/// Which backend endpoint family a file follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// PNG/JPEG: zone detection with geometry, per-zone symmetric encryption
    Image,
    /// Everything else accepted: entity detection, context-based encryption
    Document,
}

impl Lane {
    fn from_media_type(media_type: &str) -> Self {
        if IMAGE_MEDIA_TYPES.contains(&media_type) {
            Lane::Image
        } else {
            Lane::Document
        }
    }

    /// Lane for a stored file, by the same rule the validator applies
    pub fn from_file_name(name: &str) -> Self {
        let ext = extension_of(name).to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Lane::Image
        } else {
            Lane::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Image => "image",
            Lane::Document => "document",
        }
    }
}

/// A file the user selected, before validation
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Media type as declared by the picker; `None` when the caller has none
    pub declared_media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_media_type: Some(media_type.into()),
            bytes,
        }
    }

    /// Declared type, falling back to a guess from the extension
    pub fn media_type(&self) -> String {
        self.declared_media_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.name)
                    .first_raw()
                    .unwrap_or("application/octet-stream")
                    .to_string()
            })
    }
}

/// An accepted file, owned by the workflow for the life of one session
#[derive(Debug, Clone, PartialEq)]
pub struct FileIntake {
    pub name: String,
    pub media_type: String,
    pub lane: Lane,
    pub bytes: Vec<u8>,
}

/// Structured refusal for an unsupported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub file_name: String,
    pub extension: String,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.extension.is_empty() {
            write!(f, "{} is not a supported file type", self.file_name)
        } else {
            write!(f, "{} (.{}) is not a supported file type", self.file_name, self.extension)
        }
    }
}

/// Pure media-type gate in front of the scan
#[derive(Debug, Clone, Default)]
pub struct FileIntakeValidator;

impl FileIntakeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Accept or refuse a candidate. Never touches the network.
    pub fn validate(&self, candidate: CandidateFile) -> Result<FileIntake, Rejection> {
        let media_type = normalize_media_type(&candidate.media_type());

        if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(Rejection {
                extension: extension_of(&candidate.name).to_string(),
                file_name: candidate.name,
            });
        }

        Ok(FileIntake {
            lane: Lane::from_media_type(&media_type),
            name: candidate.name,
            media_type,
            bytes: candidate.bytes,
        })
    }
}

/// Lowercase and drop parameters (`text/plain; charset=utf-8` -> `text/plain`)
fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Text after the last dot, empty when there is none
pub fn extension_of(name: &str) -> &str {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

/// Name without its final extension
pub fn file_stem_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}
