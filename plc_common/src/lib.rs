//! PLC Common Library
//!
//! Shared building blocks for all soft-PLC workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Image sizes, scan period, Modbus limits
//! - [`io`] - I/O image and the plant address map
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use plc_common::io::address::{coil, input};
//! use plc_common::io::image::IoImage;
//!
//! let mut image = IoImage::new();
//! image.set_input(input::BASES_AT_ENTRY, true);
//! assert!(image.input(input::BASES_AT_ENTRY));
//! assert!(!image.coil(coil::BASES_CENTER_START));
//! ```

pub mod config;
pub mod consts;
pub mod io;
pub mod prelude;
