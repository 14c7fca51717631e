//! Scan dispatch
//!
//! Picks the detection endpoint by lane, runs the request alongside the
//! simulated progress ticker, and applies the scan error policy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::normalizer::{DocumentDetectResponse, ImageDetectResponse, ScanResultNormalizer};
use super::progress::{ProgressCallback, ProgressTicker};
use super::types::ScanResult;
use crate::config::ScanErrorPolicy;
use crate::error::{ScanError, ServiceError};
use crate::http::{endpoints, FormPart, HttpRequest, Transport};
use crate::intake::{FileIntake, Lane};

pub struct ScanDispatcher {
    transport: Arc<dyn Transport>,
    policy: ScanErrorPolicy,
    tick: Duration,
}

impl ScanDispatcher {
    pub fn new(transport: Arc<dyn Transport>, policy: ScanErrorPolicy, tick: Duration) -> Self {
        Self {
            transport,
            policy,
            tick,
        }
    }

    /// Scan a file. Under `FailOpen` this only returns `Ok`.
    pub async fn scan(
        &self,
        intake: &FileIntake,
        on_progress: ProgressCallback,
    ) -> Result<ScanResult, ScanError> {
        on_progress(0);
        let ticker = ProgressTicker::start(self.tick, Arc::clone(&on_progress));

        let outcome = self.request(intake).await;

        // The ticker must be gone before the final value is reported
        ticker.finish().await;

        match outcome {
            Ok(result) => {
                on_progress(100);
                tracing::info!(
                    "[Scan] {} ({} lane): {} zone(s), confidence {}%",
                    intake.name,
                    intake.lane.as_str(),
                    result.zones().len(),
                    result.confidence_score
                );
                Ok(result)
            }
            Err(error) => {
                // A reply arrived (bad status / body) -> finished; no reply -> reset
                match &error {
                    ServiceError::Transport(_) => on_progress(0),
                    _ => on_progress(100),
                }
                self.apply_policy(intake, error)
            }
        }
    }

    fn apply_policy(&self, intake: &FileIntake, error: ServiceError) -> Result<ScanResult, ScanError> {
        match self.policy {
            ScanErrorPolicy::FailOpen => {
                tracing::warn!(
                    "[Scan] {} scan failed, treating {} as safe (fail-open): {}",
                    intake.lane.as_str(),
                    intake.name,
                    error
                );
                Ok(ScanResult::degraded(error.user_message()))
            }
            ScanErrorPolicy::FailClosed => {
                tracing::error!("[Scan] {} scan failed for {}: {}", intake.lane.as_str(), intake.name, error);
                Err(ScanError(error))
            }
        }
    }

    async fn request(&self, intake: &FileIntake) -> Result<ScanResult, ServiceError> {
        let endpoint = match intake.lane {
            Lane::Document => endpoints::DETECT_DOCUMENT,
            Lane::Image => endpoints::DETECT_IMAGE,
        };
        let request = HttpRequest::post_multipart(endpoint, vec![file_part(intake)]);
        let route = request.route();

        let started = Instant::now();
        let reply = self.transport.send(request).await?;
        let elapsed_ms = started.elapsed().as_millis();

        let reply = reply.error_for_status(&route)?;

        match intake.lane {
            Lane::Document => {
                let response: DocumentDetectResponse = reply.decode(&route)?;
                Ok(ScanResultNormalizer::from_document(response))
            }
            Lane::Image => {
                let response: ImageDetectResponse = reply.decode(&route)?;
                Ok(ScanResultNormalizer::from_image(response, elapsed_ms))
            }
        }
    }
}

/// The intake as the multipart `file` field every endpoint expects
pub fn file_part(intake: &FileIntake) -> FormPart {
    FormPart::file("file", &intake.name, Some(&intake.media_type), intake.bytes.clone())
}
