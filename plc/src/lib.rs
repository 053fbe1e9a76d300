//! # PLC Supervisor
//!
//! Wires the scan engine, the Modbus server and the collaborator handle
//! into one tokio runtime.
//!
//! # Module Structure
//!
//! - [`runtime`] - task spawning, scan task, [`ControlHandle`], [`RuntimeHandle`]
//! - [`vision`] - inspection handshake bridge for a [`vision::DefectClassifier`]
//! - [`error`] - [`RuntimeError`]
//!
//! # Tasks
//!
//! ```text
//!   accept loop ──► session ──┐
//!                             ├── ImageRequest ──► scan task (owns ScanEngine)
//!   ControlHandle ────────────┘        ▲
//!        │                             │
//!        └──────── Command ────────────┘
//! ```

pub mod error;
pub mod runtime;
pub mod vision;

pub use error::RuntimeError;
pub use runtime::{ControlHandle, RuntimeHandle, RuntimeStatus, spawn};
