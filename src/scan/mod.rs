//! Sensitive-data scanning
//!
//! ## Flow
//!
//! ```text
//! FileIntake ──► ScanDispatcher ──► POST /detectfiles (document)
//!                     │         └─► POST /upload      (image)
//!                     │
//!                     ├─ ProgressTicker (simulated, cancelled on reply)
//!                     └─► ScanResultNormalizer ──► ScanResult
//! ```

pub mod dispatcher;
pub mod normalizer;
pub mod progress;
pub mod types;

pub use dispatcher::ScanDispatcher;
pub use normalizer::ScanResultNormalizer;
pub use progress::{ProgressCallback, ProgressTicker};
pub use types::{ScanResult, ScanZone, TimingBreakdown, DEGRADED_CONFIDENCE, NO_FINDINGS_CONFIDENCE};
