//! Server error types.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("failed to bind Modbus listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The image owner dropped its end of the port.
    #[error("scan engine is not running")]
    EngineGone,
}
