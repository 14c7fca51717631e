pub mod config;
pub mod decrypt;
pub mod drive;
pub mod error;
pub mod http;
pub mod intake;
pub mod remediation;
pub mod scan;
pub mod sink;
pub mod workflow;

pub use config::{ClientConfig, ScanErrorPolicy};
pub use decrypt::{DecryptOutcome, DecryptTarget, DecryptionOrchestrator, PathMaterialProvider, RecoveryMaterialProvider};
pub use drive::{DriveClient, DriveFile, DriveFilter};
pub use error::{DecryptionError, DriveError, RemediationError, ScanError, ServiceError, WorkflowError};
pub use http::{ReqwestTransport, Transport};
pub use intake::{CandidateFile, FileIntake, Lane};
pub use remediation::{RemediationAction, RemediationReport};
pub use scan::ScanResult;
pub use sink::{ArtifactSink, DownloadDirSink};
pub use workflow::{IntakeOutcome, Notice, WorkflowSnapshot, WorkflowState, WorkflowStateMachine};

use tracing_subscriber::EnvFilter;

/// Load `.env`, trying the current directory first and then its parent
pub fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

/// Initialize tracing with the RUST_LOG env filter
///
/// Default: warn for dependencies, info for this crate. Use RUST_LOG=debug
/// for per-request logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,safedrive_lib=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
