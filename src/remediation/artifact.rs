use serde::Serialize;
use std::path::PathBuf;

use super::upload::UploadTarget;
use super::RemediationAction;
use crate::intake::Lane;

/// Material needed later to reverse an encryption
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryMaterial {
    /// Image lane: symmetric key for the per-zone ciphertexts
    SymmetricKey { file_name: String, bytes: Vec<u8> },
    /// Document lane: cryptographic context, plus the server-side metadata sidecar if reported
    CryptoContext {
        file_name: String,
        bytes: Vec<u8>,
        metadata: Option<String>,
    },
}

impl RecoveryMaterial {
    pub fn file_name(&self) -> &str {
        match self {
            Self::SymmetricKey { file_name, .. } | Self::CryptoContext { file_name, .. } => file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::SymmetricKey { bytes, .. } | Self::CryptoContext { bytes, .. } => bytes,
        }
    }

    /// Server-side metadata sidecar the context decrypts against
    pub fn metadata(&self) -> Option<&str> {
        match self {
            Self::SymmetricKey { .. } => None,
            Self::CryptoContext { metadata, .. } => metadata.as_deref(),
        }
    }
}

/// Output of the remote remediation call, before the cloud upload
///
/// Lives only for the duration of one remediation step.
#[derive(Debug, Clone)]
pub struct RemediationArtifact {
    pub action: RemediationAction,
    pub lane: Lane,
    pub upload_target: UploadTarget,
    pub recovery: Option<RecoveryMaterial>,
    /// Where the recovery material was saved locally
    pub recovery_saved_to: Option<PathBuf>,
    /// Set when the recovery material could not be fetched or saved
    pub recovery_warning: Option<String>,
    pub zones_ciphered: Option<u32>,
}

impl RemediationArtifact {
    pub fn new(action: RemediationAction, lane: Lane, upload_target: UploadTarget) -> Self {
        Self {
            action,
            lane,
            upload_target,
            recovery: None,
            recovery_saved_to: None,
            recovery_warning: None,
            zones_ciphered: None,
        }
    }

    /// What the user is told once the upload succeeded
    pub fn success_message(&self) -> String {
        match (self.action, self.lane) {
            (RemediationAction::MaskAndUpload, Lane::Image) => {
                "Masked image uploaded successfully to Drive!".to_string()
            }
            (RemediationAction::MaskAndUpload, Lane::Document) => {
                "Masked file uploaded successfully!".to_string()
            }
            (RemediationAction::EncryptAndUpload, Lane::Image) => format!(
                "File encrypted! {} sensitive zone(s) detected.",
                self.zones_ciphered.unwrap_or(0)
            ),
            (RemediationAction::EncryptAndUpload, Lane::Document) => {
                "Encrypted file uploaded successfully!".to_string()
            }
            (RemediationAction::SafeUpload, _) => "Safe file uploaded successfully to Drive!".to_string(),
        }
    }
}

/// Completed remediation, with the recovery material already handed off
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationReport {
    pub action: RemediationAction,
    pub lane: Lane,
    pub uploaded: UploadTarget,
    pub recovery_file: Option<PathBuf>,
    /// Name the recovery material was issued under, even when saving it failed
    pub recovery_name: Option<String>,
    pub metadata_file: Option<String>,
    pub recovery_warning: Option<String>,
    pub zones_ciphered: Option<u32>,
    pub message: String,
}

impl From<RemediationArtifact> for RemediationReport {
    fn from(artifact: RemediationArtifact) -> Self {
        Self {
            message: artifact.success_message(),
            action: artifact.action,
            lane: artifact.lane,
            uploaded: artifact.upload_target,
            recovery_file: artifact.recovery_saved_to,
            recovery_name: artifact.recovery.as_ref().map(|m| m.file_name().to_string()),
            metadata_file: artifact
                .recovery
                .as_ref()
                .and_then(|m| m.metadata())
                .map(str::to_string),
            recovery_warning: artifact.recovery_warning,
            zones_ciphered: artifact.zones_ciphered,
        }
    }
}
