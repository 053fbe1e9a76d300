//! Prelude module for common re-exports.
//!
//! ```rust
//! use plc_common::prelude::*;
//!
//! let mut image = IoImage::new();
//! image.set_coil(coil::CURVED_CONVC, true);
//! assert_eq!(image.coils().len(), IMAGE_SIZE);
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, LogicTimings, ModbusConfig, PlcConfig, ScanConfig, SharedConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{IMAGE_SIZE, SCAN_CYCLE_MS};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::address::{CoilAddr, InputAddr, RegisterAddr, coil, input, register};
pub use crate::io::image::{ImageOp, ImageReply, IoImage};

/// Default scan period as Duration.
pub const DEFAULT_SCAN_CYCLE: Duration = Duration::from_millis(SCAN_CYCLE_MS);
