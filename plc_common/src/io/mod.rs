//! Process I/O: the image shared between the plant link and the scan engine.
//!
//! The image is owned by exactly one task (the scan engine). Everything
//! else, including the Modbus server, reaches it through [`image::ImageOp`]
//! values sent across a channel.

pub mod address;
pub mod image;
