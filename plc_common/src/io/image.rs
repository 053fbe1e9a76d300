//! The I/O image: inputs, coils and holding registers.
//!
//! Fixed-size arrays, allocated once. Typed accessors take the address
//! newtypes from [`super::address`]; the raw range operations used by the
//! protocol server take wire offsets and clamp to the image. Out-of-range
//! reads yield `false`/`0`, out-of-range writes are ignored.

use serde::{Deserialize, Serialize};

use super::address::{CoilAddr, InputAddr, RegisterAddr};
use crate::consts::IMAGE_SIZE;

/// Process image owned by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoImage {
    inputs: [bool; IMAGE_SIZE],
    coils: [bool; IMAGE_SIZE],
    registers: [u16; IMAGE_SIZE],
}

impl Default for IoImage {
    fn default() -> Self {
        Self::new()
    }
}

impl IoImage {
    /// All-zero image.
    pub const fn new() -> Self {
        Self {
            inputs: [false; IMAGE_SIZE],
            coils: [false; IMAGE_SIZE],
            registers: [0; IMAGE_SIZE],
        }
    }

    /// Zero all three arrays.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn input(&self, addr: InputAddr) -> bool {
        self.inputs.get(addr.index()).copied().unwrap_or(false)
    }

    #[inline]
    pub fn set_input(&mut self, addr: InputAddr, value: bool) {
        if let Some(slot) = self.inputs.get_mut(addr.index()) {
            *slot = value;
        }
    }

    #[inline]
    pub fn coil(&self, addr: CoilAddr) -> bool {
        self.coils.get(addr.index()).copied().unwrap_or(false)
    }

    #[inline]
    pub fn set_coil(&mut self, addr: CoilAddr, value: bool) {
        if let Some(slot) = self.coils.get_mut(addr.index()) {
            *slot = value;
        }
    }

    #[inline]
    pub fn register(&self, addr: RegisterAddr) -> u16 {
        self.registers.get(addr.index()).copied().unwrap_or(0)
    }

    #[inline]
    pub fn set_register(&mut self, addr: RegisterAddr, value: u16) {
        if let Some(slot) = self.registers.get_mut(addr.index()) {
            *slot = value;
        }
    }

    #[inline]
    pub fn inputs(&self) -> &[bool] {
        &self.inputs
    }

    #[inline]
    pub fn coils(&self) -> &[bool] {
        &self.coils
    }

    #[inline]
    pub fn registers(&self) -> &[u16] {
        &self.registers
    }

    /// True when every slot of every array is zero.
    pub fn is_zeroed(&self) -> bool {
        self.inputs.iter().all(|b| !b)
            && self.coils.iter().all(|b| !b)
            && self.registers.iter().all(|r| *r == 0)
    }

    /// Execute one raw image operation.
    pub fn apply(&mut self, op: &ImageOp) -> ImageReply {
        match op {
            ImageOp::ReadCoils { start, quantity } => {
                ImageReply::Bits(read_range(&self.coils, *start, *quantity, false))
            }
            ImageOp::ReadInputs { start, quantity } => {
                ImageReply::Bits(read_range(&self.inputs, *start, *quantity, false))
            }
            ImageOp::ReadRegisters { start, quantity } => {
                ImageReply::Words(read_range(&self.registers, *start, *quantity, 0))
            }
            ImageOp::WriteInputs { start, values } => {
                let mut written = 0;
                for (offset, value) in values.iter().enumerate() {
                    let index = *start as usize + offset;
                    if let Some(slot) = self.inputs.get_mut(index) {
                        *slot = *value;
                        written += 1;
                    }
                }
                ImageReply::Written(written)
            }
        }
    }
}

fn read_range<T: Copy>(array: &[T], start: u16, quantity: u16, fill: T) -> Vec<T> {
    (0..quantity as usize)
        .map(|offset| array.get(start as usize + offset).copied().unwrap_or(fill))
        .collect()
}

// ─── Raw operations ─────────────────────────────────────────────────

/// Image operation addressed by wire offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOp {
    ReadCoils { start: u16, quantity: u16 },
    ReadInputs { start: u16, quantity: u16 },
    ReadRegisters { start: u16, quantity: u16 },
    WriteInputs { start: u16, values: Vec<bool> },
}

/// Result of an [`ImageOp`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageReply {
    Bits(Vec<bool>),
    Words(Vec<u16>),
    /// Number of slots actually written (in-range only).
    Written(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::address::{coil, input, register};

    #[test]
    fn new_image_is_zeroed() {
        let image = IoImage::new();
        assert!(image.is_zeroed());
        assert_eq!(image.inputs().len(), IMAGE_SIZE);
    }

    #[test]
    fn out_of_range_is_silent() {
        let mut image = IoImage::new();
        image.set_input(InputAddr(IMAGE_SIZE as u16), true);
        image.set_coil(CoilAddr(500), true);
        image.set_register(RegisterAddr(u16::MAX), 7);
        assert!(image.is_zeroed());
        assert!(!image.input(InputAddr(1000)));
        assert_eq!(image.register(RegisterAddr(100)), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut image = IoImage::new();
        image.set_input(input::NORMAL_BOX, true);
        image.set_coil(coil::GRAB, true);
        image.set_register(register::STACKER_TARGET_POS, 4);
        assert!(!image.is_zeroed());
        image.reset();
        assert!(image.is_zeroed());
    }

    #[test]
    fn read_past_end_pads() {
        let mut image = IoImage::new();
        image.set_coil(CoilAddr(99), true);
        let reply = image.apply(&ImageOp::ReadCoils {
            start: 98,
            quantity: 4,
        });
        assert_eq!(reply, ImageReply::Bits(vec![false, true, false, false]));

        let reply = image.apply(&ImageOp::ReadRegisters {
            start: 200,
            quantity: 2,
        });
        assert_eq!(reply, ImageReply::Words(vec![0, 0]));
    }

    #[test]
    fn write_inputs_counts_in_range_slots() {
        let mut image = IoImage::new();
        let reply = image.apply(&ImageOp::WriteInputs {
            start: 98,
            values: vec![true, true, true],
        });
        assert_eq!(reply, ImageReply::Written(2));
        assert!(image.input(InputAddr(98)));
        assert!(image.input(InputAddr(99)));
        // Inputs never leak into coils.
        assert!(image.coils().iter().all(|c| !c));
    }
}
