use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::WorkflowError;
use crate::intake::{Lane, Rejection};
use crate::remediation::RemediationAction;
use crate::scan::ScanResult;

/// Where the upload → scan → remediate → upload flow currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Validating,
    Scanning,
    /// Scan found nothing; only `SafeUpload` applies
    Safe,
    /// At least one zone; the user picks mask or encrypt
    Reviewing,
    Remediating { action: RemediationAction },
    Uploading { action: RemediationAction },
    Completed { message: String },
    Failed { message: String },
}

impl WorkflowState {
    /// States from which a remediation may start, given a held scan result
    pub fn accepts_remediation(&self) -> bool {
        matches!(
            self,
            Self::Safe | Self::Reviewing | Self::Completed { .. } | Self::Failed { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Validating => f.write_str("validating"),
            Self::Scanning => f.write_str("scanning"),
            Self::Safe => f.write_str("safe"),
            Self::Reviewing => f.write_str("reviewing"),
            Self::Remediating { action } => write!(f, "remediating ({})", action),
            Self::Uploading { action } => write!(f, "uploading ({})", action),
            Self::Completed { .. } => f.write_str("completed"),
            Self::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// What observers see; published on every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub generation: u64,
    pub state: WorkflowState,
    pub file_name: Option<String>,
    pub lane: Option<Lane>,
    /// 0 to 100
    pub progress: u8,
    pub scan_result: Option<ScanResult>,
    /// Zone indices the user chose to reveal; display only
    pub revealed_zones: BTreeSet<usize>,
}

impl WorkflowSnapshot {
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            state: WorkflowState::Idle,
            file_name: None,
            lane: None,
            progress: 0,
            scan_result: None,
            revealed_zones: BTreeSet::new(),
        }
    }
}

/// One-shot user-visible messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Rejected { rejection: Rejection },
    /// The scan failed and the file was treated as safe
    ScanDegraded { file_name: String, reason: String },
    RecoveryMaterialUnavailable { warning: String },
    RecoveryMaterialSaved { path: PathBuf },
    Completed { message: String },
    Failed { message: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { rejection } => write!(f, "{}", rejection),
            Self::ScanDegraded { file_name, reason } => {
                write!(f, "Scan of {} failed, treated as safe: {}", file_name, reason)
            }
            Self::RecoveryMaterialUnavailable { warning } => f.write_str(warning),
            Self::RecoveryMaterialSaved { path } => write!(f, "Recovery file saved to {}", path.display()),
            Self::Completed { message } | Self::Failed { message } => f.write_str(message),
        }
    }
}

/// How a `submit` ended
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    Rejected(Rejection),
    Scanned(ScanResult),
    /// Scan failed under the fail-closed policy
    Failed(WorkflowError),
    /// A newer submit replaced this one before the scan resolved
    Superseded,
}
