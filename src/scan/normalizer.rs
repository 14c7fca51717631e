//! Maps each lane's detection response into a [`ScanResult`]
//!
//! The document lane returns entity findings grouped by page/chunk index with
//! no geometry. The image lane returns zones with real boxes.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::types::{ScanResult, ScanZone, TimingBreakdown};

/// `POST /detectfiles` response
#[derive(Debug, Default, Deserialize)]
pub struct DocumentDetectResponse {
    #[serde(default)]
    pub detected: Option<DetectedGroups>,
}

/// Findings grouped by page/chunk
///
/// The backend keys groups by index ("0", "1", ...) or sends them as a plain
/// array; group order is preserved either way.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DetectedGroups {
    Keyed(BTreeMap<String, Vec<DocumentFinding>>),
    Listed(Vec<Vec<DocumentFinding>>),
}

impl DetectedGroups {
    fn into_ordered(self) -> Vec<Vec<DocumentFinding>> {
        match self {
            Self::Keyed(groups) => {
                // Order groups numerically so "10" sorts after "2"
                let mut ordered: Vec<(u64, Vec<DocumentFinding>)> = groups
                    .into_iter()
                    .map(|(key, findings)| (key.trim().parse::<u64>().unwrap_or(u64::MAX), findings))
                    .collect();
                ordered.sort_by_key(|(index, _)| *index);
                ordered.into_iter().map(|(_, findings)| findings).collect()
            }
            Self::Listed(groups) => groups,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentFinding {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// `POST /upload` response
#[derive(Debug, Default, Deserialize)]
pub struct ImageDetectResponse {
    #[serde(default)]
    pub zones: Option<Vec<ImageZone>>,
    #[serde(default)]
    pub total_zones: Option<usize>,
    #[serde(default)]
    pub annotated_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageZone {
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub label: Option<String>,
    /// The backend spells it `texte`
    #[serde(default, rename = "texte")]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

pub struct ScanResultNormalizer;

impl ScanResultNormalizer {
    pub fn from_document(response: DocumentDetectResponse) -> ScanResult {
        let groups = response
            .detected
            .map(DetectedGroups::into_ordered)
            .unwrap_or_default();

        let zones = groups
            .into_iter()
            .flatten()
            .map(|finding| ScanZone {
                bbox: [0.0; 4],
                label: finding.entity_type.unwrap_or_else(|| "UNKNOWN".to_string()),
                text: finding.text.unwrap_or_default(),
                confidence: finding.score.unwrap_or(0.0),
            })
            .collect();

        ScanResult::from_zones(zones)
    }

    pub fn from_image(response: ImageDetectResponse, elapsed_ms: u128) -> ScanResult {
        let zones: Vec<ScanZone> = response
            .zones
            .unwrap_or_default()
            .into_iter()
            .map(|zone| ScanZone {
                bbox: to_bbox(zone.bbox.as_deref()),
                label: zone.label.unwrap_or_else(|| "Unknown".to_string()),
                text: zone.text.unwrap_or_default(),
                confidence: zone.confidence.unwrap_or(0.0),
            })
            .collect();

        let mut result = ScanResult::from_zones(zones);
        if let Some(total) = response.total_zones.filter(|t| *t > 0) {
            result.total_zones = total;
        }
        result.timing = Some(TimingBreakdown::from_inference_ms(elapsed_ms));
        result.annotated_image = response.annotated_image.filter(|s| !s.is_empty());
        result
    }
}

fn to_bbox(values: Option<&[f64]>) -> [f64; 4] {
    let mut bbox = [0.0; 4];
    if let Some(values) = values {
        for (slot, value) in bbox.iter_mut().zip(values.iter()) {
            *slot = *value;
        }
    }
    bbox
}
