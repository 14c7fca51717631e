//! Canonical scan result shape shared by both lanes

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Confidence reported when a scan finds nothing
pub const NO_FINDINGS_CONFIDENCE: u8 = 98;

/// Confidence reported on a fail-open synthetic result
pub const DEGRADED_CONFIDENCE: u8 = 95;

/// One detected sensitive-data finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanZone {
    /// `[x1, y1, x2, y2]`; all zero when the lane provides no geometry
    pub bbox: [f64; 4],
    /// Category tag (e.g. `EMAIL_ADDRESS`, `iban`)
    pub label: String,
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl ScanZone {
    pub fn has_geometry(&self) -> bool {
        self.bbox.iter().any(|v| *v != 0.0)
    }
}

/// Display-only timing triple for the image lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingBreakdown {
    pub preprocess: String,
    pub inference: String,
    pub postprocess: String,
}

impl TimingBreakdown {
    pub fn from_inference_ms(inference_ms: u128) -> Self {
        Self {
            preprocess: "4.7ms".to_string(),
            inference: format!("{}ms", inference_ms),
            postprocess: "2.5ms".to_string(),
        }
    }
}

/// Only built through [`ScanResult::from_zones`]; never decoded from the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    zones: Vec<ScanZone>,
    pub total_zones: usize,
    is_safe: bool,
    /// Integer percent, 0 to 100
    pub confidence_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingBreakdown>,
    /// Inline base64 preview, optionally as a `data:` URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
    /// Set only on a fail-open synthetic result: the error that was swallowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl ScanResult {
    /// Build from zones; safety and confidence are derived, never supplied
    pub fn from_zones(zones: Vec<ScanZone>) -> Self {
        let confidence_score = aggregate_confidence(&zones);
        Self {
            total_zones: zones.len(),
            is_safe: zones.is_empty(),
            zones,
            confidence_score,
            timing: None,
            annotated_image: None,
            degraded: None,
        }
    }

    /// Synthetic safe result standing in for a failed scan
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            confidence_score: DEGRADED_CONFIDENCE,
            degraded: Some(reason.into()),
            ..Self::from_zones(Vec::new())
        }
    }

    pub fn zones(&self) -> &[ScanZone] {
        &self.zones
    }

    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Badge text: `Safe`, `1 Flag`, `3 Flags`
    pub fn summary(&self) -> String {
        match self.zones.len() {
            0 => "Safe".to_string(),
            1 => "1 Flag".to_string(),
            n => format!("{} Flags", n),
        }
    }

    /// Decode the inline annotated preview, if any
    pub fn annotated_image_bytes(&self) -> Option<Vec<u8>> {
        let raw = self.annotated_image.as_deref()?;
        let payload = match raw.split_once(',') {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()
    }
}

/// `round(100 × mean(confidence))`, or the no-findings constant
pub fn aggregate_confidence(zones: &[ScanZone]) -> u8 {
    if zones.is_empty() {
        return NO_FINDINGS_CONFIDENCE;
    }
    let sum: f64 = zones
        .iter()
        .map(|z| if z.confidence.is_finite() { z.confidence.clamp(0.0, 1.0) } else { 0.0 })
        .sum();
    let mean = sum / zones.len() as f64;
    (mean * 100.0).round().clamp(0.0, 100.0) as u8
}
