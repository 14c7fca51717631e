//! Remediation paths
//!
//! Mask, encrypt, or upload-as-is, each with an image and a document variant,
//! all ending in a cloud upload through [`CloudUploadGateway`].

pub mod artifact;
pub mod executor;
pub mod upload;

use serde::{Deserialize, Serialize};

pub use artifact::{RecoveryMaterial, RemediationArtifact, RemediationReport};
pub use executor::RemediationExecutor;
pub use upload::{CloudUploadGateway, UploadTarget};

/// The treatment the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    MaskAndUpload,
    EncryptAndUpload,
    /// Only for files the scan found safe
    SafeUpload,
}

impl RemediationAction {
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Self::MaskAndUpload => "Masked upload failed",
            Self::EncryptAndUpload => "Encryption/upload failed",
            Self::SafeUpload => "Safe upload failed",
        }
    }

    /// Whether the action fits a scan verdict
    pub fn applies_to(&self, is_safe: bool) -> bool {
        match self {
            Self::SafeUpload => is_safe,
            Self::MaskAndUpload | Self::EncryptAndUpload => !is_safe,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mask" | "mask_and_upload" => Some(Self::MaskAndUpload),
            "encrypt" | "encrypt_and_upload" => Some(Self::EncryptAndUpload),
            "upload" | "safe" | "safe_upload" => Some(Self::SafeUpload),
            _ => None,
        }
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MaskAndUpload => "mask and upload",
            Self::EncryptAndUpload => "encrypt and upload",
            Self::SafeUpload => "upload as safe",
        };
        f.write_str(s)
    }
}
