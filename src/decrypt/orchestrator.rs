//! Decryption pipelines
//!
//! The lane of the stored artifact picks the pipeline: images were encrypted
//! zone by zone with a symmetric key, documents with a cryptographic context.
//! Material is requested first; nothing touches the network until the user
//! supplied a file of the right kind.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::material::{RecoveryFile, RecoveryKind, RecoveryMaterialProvider};
use crate::error::{DecryptionError, ServiceError};
use crate::http::{call_bytes, call_json, endpoints, FormPart, HttpReply, HttpRequest, Transport};
use crate::intake::{extension_of, file_stem_of, Lane};
use crate::sink::ArtifactSink;

const DEFAULT_RESTORED_EXTENSION: &str = "png";

/// An encrypted artifact stored on the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptTarget {
    /// Original file name, extension included
    pub name: String,
    /// Server storage folder the artifact lives in
    pub folder: String,
    pub lane: Lane,
}

impl DecryptTarget {
    pub fn recovery_kind(&self) -> RecoveryKind {
        match self.lane {
            Lane::Image => RecoveryKind::Key,
            Lane::Document => RecoveryKind::Context,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecryptOutcome {
    Restored { saved_to: PathBuf },
    /// The picker was dismissed; nothing happened
    Dismissed,
}

#[derive(Deserialize)]
struct RestoredResponse {
    restored: String,
}

pub struct DecryptionOrchestrator {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
}

impl DecryptionOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self { transport, sink }
    }

    pub async fn decrypt(
        &self,
        target: &DecryptTarget,
        provider: &dyn RecoveryMaterialProvider,
    ) -> Result<DecryptOutcome, DecryptionError> {
        let kind = target.recovery_kind();
        let Some(material) = provider.request(kind).await? else {
            tracing::debug!("[Decrypt] {} material request dismissed for {}", kind, target.name);
            return Ok(DecryptOutcome::Dismissed);
        };

        if !kind.matches(&material.file_name) {
            let ext = extension_of(&material.file_name);
            return Err(DecryptionError::MaterialMismatch {
                expected: kind.to_string(),
                supplied: if ext.is_empty() {
                    material.file_name.clone()
                } else {
                    format!(".{}", ext)
                },
            });
        }

        tracing::info!("[Decrypt] Restoring {} ({} lane)", target.name, target.lane.as_str());
        let result = match target.lane {
            Lane::Image => self.decrypt_image(target, material).await,
            Lane::Document => self.decrypt_document(target, material).await,
        };

        match &result {
            Ok(DecryptOutcome::Restored { saved_to }) => {
                tracing::info!("[Decrypt] {} restored to {}", target.name, saved_to.display());
            }
            Ok(DecryptOutcome::Dismissed) => {}
            Err(e) => tracing::error!("[Decrypt] {} failed: {}", target.name, e),
        }
        result
    }

    async fn decrypt_image(
        &self,
        target: &DecryptTarget,
        key: RecoveryFile,
    ) -> Result<DecryptOutcome, DecryptionError> {
        let base = file_stem_of(&target.name);
        let request = HttpRequest::post_multipart(
            endpoints::DECRYPT_IMAGE,
            vec![
                FormPart::file("key", &key.file_name, None, key.bytes),
                FormPart::text("image_name", base),
            ],
        );
        let response: RestoredResponse = call_json(self.transport.as_ref(), request).await?;

        let download = HttpRequest::get(endpoints::server_path(&response.restored));
        let route = download.route();
        let reply = self.transport.send(download).await.map_err(ServiceError::from)?;
        let bytes = expect_binary(reply, &route)?;

        let ext = match extension_of(&target.name) {
            "" => DEFAULT_RESTORED_EXTENSION,
            ext => ext,
        };
        self.save(&format!("{}_restored.{}", base, ext), &bytes).await
    }

    async fn decrypt_document(
        &self,
        target: &DecryptTarget,
        context: RecoveryFile,
    ) -> Result<DecryptOutcome, DecryptionError> {
        let transport = self.transport.as_ref();
        let (file, metadata) = futures::try_join!(
            call_bytes(transport, HttpRequest::get(endpoints::stored_file(&target.folder, &target.name))),
            call_bytes(transport, HttpRequest::get(endpoints::stored_metadata(&target.folder, &target.name))),
        )?;

        let metadata_name = format!("{}_encrypted_data.json", target.name);
        let request = HttpRequest::post_multipart(
            endpoints::DECRYPT_DOCUMENT,
            vec![
                FormPart::file("file", &target.name, None, file),
                FormPart::file("metadata", &metadata_name, Some("application/json"), metadata),
                FormPart::file("context", &context.file_name, None, context.bytes),
            ],
        );
        let route = request.route();
        let reply = self.transport.send(request).await.map_err(ServiceError::from)?;
        let bytes = expect_binary(reply, &route)?;

        self.save(&format!("decrypted_{}", target.name), &bytes).await
    }

    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<DecryptOutcome, DecryptionError> {
        let saved_to = self.sink.save(file_name, bytes).await.map_err(DecryptionError::Save)?;
        Ok(DecryptOutcome::Restored { saved_to })
    }
}

/// File content only: a 2xx with a non-empty, non-JSON, non-HTML body
fn expect_binary(reply: HttpReply, endpoint: &str) -> Result<Vec<u8>, DecryptionError> {
    let reply = reply.error_for_status(endpoint)?;
    if reply.is_textual() || reply.body.is_empty() {
        return Err(DecryptionError::NotBinary {
            content_type: reply.content_type.unwrap_or_else(|| "none".to_string()),
        });
    }
    Ok(reply.body)
}
