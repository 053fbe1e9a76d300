//! # PLC Modbus Library
//!
//! Modbus-TCP slave for the simulated plant.
//!
//! # Module Structure
//!
//! - [`frame`] - MBAP framing, request decoding, response encoding
//! - [`port`] - Channel boundary to the task that owns the I/O image
//! - [`server`] - TCP listener and the single client session
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   TCP    ┌──────────────┐  ImageRequest  ┌─────────────┐
//! │ plant client │ ───────► │ ModbusServer │ ─────────────► │ scan task   │
//! │              │ ◄─────── │  (session)   │ ◄───────────── │ (IoImage)   │
//! └──────────────┘          └──────────────┘   ImageReply   └─────────────┘
//! ```
//!
//! The server never holds the image. Every read and write is a message to
//! the scan task, served between ticks.

pub mod error;
pub mod frame;
pub mod port;
pub mod server;

pub use error::ModbusError;
pub use port::{ImagePort, ImageRequest};
pub use server::{ModbusServer, SessionState};
