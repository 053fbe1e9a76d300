//! Runtime error types.

use plc_common::config::ConfigError;
use plc_modbus::ModbusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Modbus server error: {0}")]
    Modbus(#[from] ModbusError),

    /// The scan task has exited; the handle is stale.
    #[error("scan task is not running")]
    EngineGone,

    /// Start refused while no plant client is connected.
    #[error("plant is not connected")]
    PlantNotConnected,

    #[error("runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
