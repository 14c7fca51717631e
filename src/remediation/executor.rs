//! Remediation executor
//!
//! `prepare` performs the lane-specific remote call and collects any recovery
//! material; `deliver` hands the resulting pointer to the upload gateway.
//! The workflow calls them separately so it can report `Remediating` and
//! `Uploading` as distinct states.
//!
//! Recovery material failures never abort the chain: the encrypted artifact is
//! still uploaded and the failure is carried as a warning.

use serde::Deserialize;
use std::sync::Arc;

use super::artifact::{RecoveryMaterial, RemediationArtifact, RemediationReport};
use super::upload::{CloudUploadGateway, UploadTarget};
use super::RemediationAction;
use crate::error::{RemediationError, ServiceError};
use crate::http::{call_bytes, call_json, endpoints, HttpRequest, Transport};
use crate::intake::{FileIntake, Lane};
use crate::scan::dispatcher::file_part;
use crate::sink::ArtifactSink;

#[derive(Deserialize)]
struct MaskImageResponse {
    masked_image: String,
}

#[derive(Deserialize)]
struct MaskFileResponse {
    masked_file: String,
}

#[derive(Deserialize)]
struct EncryptImageResponse {
    folder: String,
    #[serde(default)]
    zones_ciphered: Option<u32>,
}

#[derive(Deserialize)]
struct EncryptFileResponse {
    encrypted_file: String,
    context_file: String,
    folder: String,
    #[serde(default)]
    metadata_file: Option<String>,
}

#[derive(Deserialize)]
struct SafeFileResponse {
    safe_file: String,
}

pub struct RemediationExecutor {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
    gateway: CloudUploadGateway,
}

impl RemediationExecutor {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            gateway: CloudUploadGateway::new(Arc::clone(&transport)),
            transport,
            sink,
        }
    }

    /// Run the whole chain: remote remediation, recovery hand-off, upload
    pub async fn execute(
        &self,
        intake: &FileIntake,
        action: RemediationAction,
    ) -> Result<RemediationReport, RemediationError> {
        let artifact = self.prepare(intake, action).await?;
        self.deliver(artifact).await
    }

    pub async fn prepare(
        &self,
        intake: &FileIntake,
        action: RemediationAction,
    ) -> Result<RemediationArtifact, RemediationError> {
        tracing::info!(
            "[Remediation] {} for {} ({} lane)",
            action,
            intake.name,
            intake.lane.as_str()
        );

        let result = match action {
            RemediationAction::MaskAndUpload => self.mask(intake).await,
            RemediationAction::EncryptAndUpload => self.encrypt(intake).await,
            RemediationAction::SafeUpload => self.save_safe(intake).await,
        };

        result.map_err(|e| {
            tracing::error!("[Remediation] {} failed for {}: {}", action, intake.name, e);
            RemediationError::new(action, e)
        })
    }

    pub async fn deliver(
        &self,
        artifact: RemediationArtifact,
    ) -> Result<RemediationReport, RemediationError> {
        self.gateway
            .upload(&artifact.upload_target)
            .await
            .map_err(|e| RemediationError::new(artifact.action, e))?;
        Ok(artifact.into())
    }

    async fn mask(&self, intake: &FileIntake) -> Result<RemediationArtifact, ServiceError> {
        let target = match intake.lane {
            Lane::Image => {
                let request = HttpRequest::post_multipart(endpoints::MASK_IMAGE, vec![file_part(intake)]);
                let response: MaskImageResponse = call_json(self.transport.as_ref(), request).await?;
                response.masked_image
            }
            Lane::Document => {
                let request =
                    HttpRequest::post_multipart(endpoints::MASK_DOCUMENT, vec![file_part(intake)]);
                let response: MaskFileResponse = call_json(self.transport.as_ref(), request).await?;
                response.masked_file
            }
        };

        Ok(RemediationArtifact::new(
            RemediationAction::MaskAndUpload,
            intake.lane,
            UploadTarget::File(target),
        ))
    }

    async fn encrypt(&self, intake: &FileIntake) -> Result<RemediationArtifact, ServiceError> {
        match intake.lane {
            Lane::Image => {
                let request =
                    HttpRequest::post_multipart(endpoints::ENCRYPT_IMAGE, vec![file_part(intake)]);
                let response: EncryptImageResponse = call_json(self.transport.as_ref(), request).await?;

                // The image lane yields a directory of per-zone artifacts
                let mut artifact = RemediationArtifact::new(
                    RemediationAction::EncryptAndUpload,
                    Lane::Image,
                    UploadTarget::Folder(response.folder.clone()),
                );
                artifact.zones_ciphered = response.zones_ciphered;

                let file_name = format!("{}_key.key", response.folder);
                let fetched = self
                    .fetch(endpoints::image_key(&response.folder))
                    .await
                    .map(|bytes| RecoveryMaterial::SymmetricKey { file_name, bytes });
                self.hand_off(&mut artifact, fetched, "Encryption key could not be downloaded.")
                    .await;
                Ok(artifact)
            }
            Lane::Document => {
                let request =
                    HttpRequest::post_multipart(endpoints::ENCRYPT_DOCUMENT, vec![file_part(intake)]);
                let response: EncryptFileResponse = call_json(self.transport.as_ref(), request).await?;

                let mut artifact = RemediationArtifact::new(
                    RemediationAction::EncryptAndUpload,
                    Lane::Document,
                    UploadTarget::File(response.encrypted_file),
                );

                let file_name = format!("{}.ctx", response.folder);
                let metadata = response.metadata_file;
                let fetched = self
                    .fetch(endpoints::server_path(&response.context_file))
                    .await
                    .map(|bytes| RecoveryMaterial::CryptoContext {
                        file_name,
                        bytes,
                        metadata,
                    });
                self.hand_off(&mut artifact, fetched, "Context file could not be downloaded.")
                    .await;
                Ok(artifact)
            }
        }
    }

    async fn save_safe(&self, intake: &FileIntake) -> Result<RemediationArtifact, ServiceError> {
        let request = HttpRequest::post_multipart(endpoints::SAVE_SAFE_FILE, vec![file_part(intake)]);
        let response: SafeFileResponse = call_json(self.transport.as_ref(), request).await?;

        Ok(RemediationArtifact::new(
            RemediationAction::SafeUpload,
            intake.lane,
            UploadTarget::File(response.safe_file),
        ))
    }

    async fn fetch(&self, path: String) -> Result<Vec<u8>, ServiceError> {
        call_bytes(self.transport.as_ref(), HttpRequest::get(path)).await
    }

    /// Save recovery material locally; on any failure record a warning instead
    async fn hand_off(
        &self,
        artifact: &mut RemediationArtifact,
        fetched: Result<RecoveryMaterial, ServiceError>,
        warning: &str,
    ) {
        let material = match fetched {
            Ok(material) => material,
            Err(e) => {
                tracing::warn!("[Remediation] {} {}", warning, e);
                artifact.recovery_warning = Some(format!("{} {}", warning, e.user_message()));
                return;
            }
        };

        match self.sink.save(material.file_name(), material.bytes()).await {
            Ok(path) => {
                artifact.recovery_saved_to = Some(path);
            }
            Err(e) => {
                tracing::warn!("[Remediation] {} Local save failed: {}", warning, e);
                artifact.recovery_warning = Some(format!("{} {}", warning, e));
            }
        }
        artifact.recovery = Some(material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedTransport;
    use crate::http::{HttpReply, RequestBody};
    use crate::intake::{CandidateFile, FileIntakeValidator};
    use crate::sink::testing::MemorySink;
    use serde_json::json;

    fn intake(name: &str, media_type: &str) -> FileIntake {
        FileIntakeValidator::new()
            .validate(CandidateFile::new(name, media_type, b"payload".to_vec()))
            .unwrap()
    }

    fn executor(transport: &Arc<ScriptedTransport>, sink: &Arc<MemorySink>) -> RemediationExecutor {
        RemediationExecutor::new(transport.clone(), sink.clone())
    }

    fn ok_upload(transport: &ScriptedTransport) {
        transport.reply("POST auth/upload_single_to_drive", HttpReply::json(200, json!({})));
    }

    #[tokio::test]
    async fn test_mask_image() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST mask", HttpReply::json(200, json!({"masked_image": "data_storage/p/masked.png"})));
        ok_upload(&transport);

        let report = executor(&transport, &sink)
            .execute(&intake("p.png", "image/png"), RemediationAction::MaskAndUpload)
            .await
            .unwrap();

        assert_eq!(report.uploaded, UploadTarget::File("data_storage/p/masked.png".to_string()));
        assert_eq!(report.message, "Masked image uploaded successfully to Drive!");
        assert!(report.recovery_file.is_none());
        assert_eq!(
            transport.calls()[1].body,
            RequestBody::Json(json!({"file_path": "data_storage/p/masked.png"}))
        );
    }

    #[tokio::test]
    async fn test_mask_document() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST maskfiles", HttpReply::json(200, json!({"masked_file": "data_storage/c/masked_c.docx"})));
        ok_upload(&transport);

        let report = executor(&transport, &sink)
            .execute(
                &intake("c.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
                RemediationAction::MaskAndUpload,
            )
            .await
            .unwrap();

        assert_eq!(report.message, "Masked file uploaded successfully!");
        assert_eq!(transport.routes_called(), vec!["POST maskfiles", "POST auth/upload_single_to_drive"]);
    }

    #[tokio::test]
    async fn test_encrypt_image_downloads_key_and_uploads_folder() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST encrypt", HttpReply::json(200, json!({"folder": "id_card", "zones_ciphered": 3})));
        transport.reply("GET data_storage_keys/id_card_key.key", HttpReply::binary(200, b"fernet-key".to_vec()));
        transport.reply("POST auth/upload_folder_to_drive/id_card", HttpReply::json(200, json!({})));

        let report = executor(&transport, &sink)
            .execute(&intake("id_card.jpg", "image/jpeg"), RemediationAction::EncryptAndUpload)
            .await
            .unwrap();

        assert_eq!(report.uploaded, UploadTarget::Folder("id_card".to_string()));
        assert_eq!(report.zones_ciphered, Some(3));
        assert_eq!(report.message, "File encrypted! 3 sensitive zone(s) detected.");
        assert!(report.recovery_warning.is_none());
        assert_eq!(sink.names(), vec!["id_card_key.key"]);
        assert_eq!(sink.saved.lock().unwrap()[0].1, b"fernet-key".to_vec());
    }

    #[tokio::test]
    async fn test_encrypt_document_saves_context() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply(
            "POST encryptfiles",
            HttpReply::json(200, json!({
                "encrypted_file": "data_storage/payroll/payroll.xlsx",
                "context_file": "data_storage/payroll/payroll.ctx",
                "folder": "payroll",
                "metadata_file": "data_storage/payroll/payroll.xlsx_encrypted_data.json"
            })),
        );
        transport.reply("GET data_storage/payroll/payroll.ctx", HttpReply::binary(200, b"ctx".to_vec()));
        ok_upload(&transport);

        let report = executor(&transport, &sink)
            .execute(
                &intake("payroll.xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
                RemediationAction::EncryptAndUpload,
            )
            .await
            .unwrap();

        assert_eq!(report.uploaded, UploadTarget::File("data_storage/payroll/payroll.xlsx".to_string()));
        assert_eq!(report.message, "Encrypted file uploaded successfully!");
        assert_eq!(sink.names(), vec!["payroll.ctx"]);
        assert_eq!(report.recovery_file, Some(std::path::PathBuf::from("/memory/payroll.ctx")));
        assert_eq!(report.recovery_name.as_deref(), Some("payroll.ctx"));
        assert_eq!(
            report.metadata_file.as_deref(),
            Some("data_storage/payroll/payroll.xlsx_encrypted_data.json")
        );
    }

    // Second fail-open point: losing the recovery material does not stop the upload,
    // which leaves the user with an encrypted file they cannot decrypt.
    #[tokio::test]
    async fn test_context_download_failure_still_uploads() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply(
            "POST encryptfiles",
            HttpReply::json(200, json!({
                "encrypted_file": "data_storage/memo/memo.pdf",
                "context_file": "data_storage/memo/memo.ctx",
                "folder": "memo"
            })),
        );
        transport.fail("GET data_storage/memo/memo.ctx", "connection reset");
        ok_upload(&transport);

        let report = executor(&transport, &sink)
            .execute(&intake("memo.pdf", "application/pdf"), RemediationAction::EncryptAndUpload)
            .await
            .unwrap();

        let warning = report.recovery_warning.unwrap();
        assert!(warning.starts_with("Context file could not be downloaded."));
        assert!(report.recovery_file.is_none());
        assert!(sink.names().is_empty());

        let upload = transport
            .calls()
            .into_iter()
            .find(|c| c.route() == "POST auth/upload_single_to_drive")
            .unwrap();
        assert_eq!(upload.body, RequestBody::Json(json!({"file_path": "data_storage/memo/memo.pdf"})));
    }

    #[tokio::test]
    async fn test_key_save_failure_is_a_warning() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::failing());
        transport.reply("POST encrypt", HttpReply::json(200, json!({"folder": "scan"})));
        transport.reply("GET data_storage_keys/scan_key.key", HttpReply::binary(200, b"k".to_vec()));
        transport.reply("POST auth/upload_folder_to_drive/scan", HttpReply::json(200, json!({})));

        let report = executor(&transport, &sink)
            .execute(&intake("scan.png", "image/png"), RemediationAction::EncryptAndUpload)
            .await
            .unwrap();

        assert!(report.recovery_warning.unwrap().contains("read-only"));
        assert!(report.recovery_file.is_none());
        assert_eq!(report.recovery_name.as_deref(), Some("scan_key.key"));
        assert!(report.metadata_file.is_none());
        assert_eq!(report.message, "File encrypted! 0 sensitive zone(s) detected.");
    }

    #[tokio::test]
    async fn test_key_download_failure_still_uploads_folder() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST encrypt", HttpReply::json(200, json!({"folder": "passport", "zones_ciphered": 2})));
        transport.reply(
            "GET data_storage_keys/passport_key.key",
            HttpReply::json(404, json!({"error": "Key not found"})),
        );
        transport.reply("POST auth/upload_folder_to_drive/passport", HttpReply::json(200, json!({})));

        let report = executor(&transport, &sink)
            .execute(&intake("passport.jpg", "image/jpeg"), RemediationAction::EncryptAndUpload)
            .await
            .unwrap();

        let warning = report.recovery_warning.unwrap();
        assert!(warning.starts_with("Encryption key could not be downloaded."));
        assert!(warning.contains("Key not found"));
        assert!(report.recovery_file.is_none());
        assert!(report.recovery_name.is_none());
        assert!(sink.names().is_empty());
        assert_eq!(report.uploaded, UploadTarget::Folder("passport".to_string()));
        assert_eq!(
            transport.routes_called(),
            vec![
                "POST encrypt",
                "GET data_storage_keys/passport_key.key",
                "POST auth/upload_folder_to_drive/passport"
            ]
        );
    }

    #[tokio::test]
    async fn test_safe_upload() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST auth/save_safe_file", HttpReply::json(200, json!({"safe_file": "data_storage/safe/a.txt"})));
        ok_upload(&transport);

        let report = executor(&transport, &sink)
            .execute(&intake("a.txt", "text/plain"), RemediationAction::SafeUpload)
            .await
            .unwrap();
        assert_eq!(report.message, "Safe file uploaded successfully to Drive!");
    }

    #[tokio::test]
    async fn test_remote_error_uses_server_message() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST maskfiles", HttpReply::json(422, json!({"error": "Unsupported encoding"})));

        let err = executor(&transport, &sink)
            .execute(&intake("a.csv", "text/csv"), RemediationAction::MaskAndUpload)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Masked upload failed: Unsupported encoding");
        assert_eq!(transport.count("POST auth/upload_single_to_drive"), 0);
    }

    #[tokio::test]
    async fn test_transport_error_uses_raw_message() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.fail("POST auth/save_safe_file", "dns error");

        let err = executor(&transport, &sink)
            .execute(&intake("a.txt", "text/plain"), RemediationAction::SafeUpload)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Safe upload failed: Request failed: dns error");
    }

    #[tokio::test]
    async fn test_upload_failure_fails_chain() {
        let transport = ScriptedTransport::new();
        let sink = Arc::new(MemorySink::default());
        transport.reply("POST mask", HttpReply::json(200, json!({"masked_image": "m.png"})));
        transport.reply("POST auth/upload_single_to_drive", HttpReply::json(500, json!({"error": "Drive quota exceeded"})));

        let err = executor(&transport, &sink)
            .execute(&intake("p.png", "image/png"), RemediationAction::MaskAndUpload)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Masked upload failed: Drive quota exceeded");
    }
}
