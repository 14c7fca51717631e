//! Upload workflow
//!
//! ```text
//! Idle ─► Validating ─► Scanning ─┬─► Safe ──────┐
//!   ▲         │                   └─► Reviewing ─┤
//!   │         └─ rejected ─► Idle                ▼
//!   └── cancel / acknowledge ── Completed | Failed ◄── Uploading ◄── Remediating
//! ```

pub mod machine;
pub mod state;

pub use machine::WorkflowStateMachine;
pub use state::{IntakeOutcome, Notice, WorkflowSnapshot, WorkflowState};
