//! Restoring encrypted artifacts from the drive

pub mod material;
pub mod orchestrator;

pub use material::{PathMaterialProvider, RecoveryFile, RecoveryKind, RecoveryMaterialProvider};
pub use orchestrator::{DecryptOutcome, DecryptTarget, DecryptionOrchestrator};
