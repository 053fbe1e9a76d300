//! System-wide constants for the soft-PLC workspace.
//!
//! Single source of truth for image sizes, scan timing and protocol limits.
//! Imported by all crates.

/// Number of slots in each I/O image array (inputs, coils, registers).
pub const IMAGE_SIZE: usize = 100;

/// Default scan period in milliseconds (20 Hz).
pub const SCAN_CYCLE_MS: u64 = 50;

/// Default Modbus-TCP listening port.
pub const MODBUS_PORT: u16 = 502;

/// Default bind address for the Modbus listener.
pub const MODBUS_BIND_ADDRESS: &str = "0.0.0.0";

/// Canonical service name (logging, config default).
pub const PLC_SERVICE_NAME: &str = "factory-plc";

/// Register value that commands a stacker back to its home slot.
pub const STACKER_HOME_POSITION: u16 = 99;

/// Number of pallet slots per stacker (target position wraps after this).
pub const STACKER_SLOTS: u16 = 10;

/// Products per box before the batch roller runs.
pub const BATCH_SIZE: u8 = 3;

// ─── Modbus framing limits ──────────────────────────────────────────

/// MBAP header length (transaction id, protocol id, length, unit id).
pub const MBAP_HEADER_LEN: usize = 7;

/// Smallest meaningful request: MBAP header + function code.
pub const MIN_FRAME_LEN: usize = MBAP_HEADER_LEN + 1;

/// Largest value of the MBAP length field (unit id + 253-byte PDU).
pub const MAX_MBAP_LENGTH: u16 = 254;

/// Maximum bit quantity for Read Coils / Read Discrete Inputs.
pub const MAX_READ_BITS: u16 = 2000;

/// Maximum word quantity for Read Holding Registers.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum bit quantity for Write Multiple Coils.
pub const MAX_WRITE_BITS: u16 = 1968;
