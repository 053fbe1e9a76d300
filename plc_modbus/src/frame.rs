//! Modbus-TCP framing: MBAP header, request decoding, response encoding.
//!
//! Only the five function codes the plant uses are understood. Quantities
//! are checked against the Modbus limits before anything touches the image.
//!
//! Note the plant-specific addressing: writes (`0x05`, `0x0F`) land in the
//! *input* array, and both bit reads (`0x01`, `0x02`) serve the *coil*
//! array. This is not standard Modbus, but it is what the simulated plant
//! speaks.

use plc_common::consts::{
    MAX_MBAP_LENGTH, MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MBAP_HEADER_LEN,
    MIN_FRAME_LEN,
};
use plc_common::io::image::{ImageOp, ImageReply};
use thiserror::Error;

pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Value of a Write Single Coil request that means ON.
pub const COIL_ON: u16 = 0xFF00;

/// Bytes of a Write Single Coil frame, echoed back verbatim.
const WRITE_SINGLE_FRAME_LEN: usize = 12;

/// First payload byte of a Write Multiple Coils frame.
const WRITE_MULTIPLE_DATA_OFFSET: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("unsupported function code 0x{0:02X}")]
    UnsupportedFunction(u8),

    #[error("quantity {quantity} out of range for function 0x{function:02X}")]
    InvalidQuantity { function: u8, quantity: u16 },

    #[error("MBAP length field {0} out of range")]
    BadLength(u16),
}

/// MBAP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    fn parse(frame: &[u8]) -> Self {
        Self {
            transaction_id: u16::from_be_bytes([frame[0], frame[1]]),
            protocol_id: u16::from_be_bytes([frame[2], frame[3]]),
            length: u16::from_be_bytes([frame[4], frame[5]]),
            unit_id: frame[6],
        }
    }
}

/// Decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { start: u16, quantity: u16 },
    ReadDiscreteInputs { start: u16, quantity: u16 },
    ReadHoldingRegisters { start: u16, quantity: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteMultipleCoils { start: u16, values: Vec<bool> },
}

impl Request {
    pub fn function_code(&self) -> u8 {
        match self {
            Request::ReadCoils { .. } => FC_READ_COILS,
            Request::ReadDiscreteInputs { .. } => FC_READ_DISCRETE_INPUTS,
            Request::ReadHoldingRegisters { .. } => FC_READ_HOLDING_REGISTERS,
            Request::WriteSingleCoil { .. } => FC_WRITE_SINGLE_COIL,
            Request::WriteMultipleCoils { .. } => FC_WRITE_MULTIPLE_COILS,
        }
    }

    /// Image operation that serves this request.
    pub fn image_op(&self) -> ImageOp {
        match self {
            Request::ReadCoils { start, quantity }
            | Request::ReadDiscreteInputs { start, quantity } => ImageOp::ReadCoils {
                start: *start,
                quantity: *quantity,
            },
            Request::ReadHoldingRegisters { start, quantity } => ImageOp::ReadRegisters {
                start: *start,
                quantity: *quantity,
            },
            Request::WriteSingleCoil { address, value } => ImageOp::WriteInputs {
                start: *address,
                values: vec![*value],
            },
            Request::WriteMultipleCoils { start, values } => ImageOp::WriteInputs {
                start: *start,
                values: values.clone(),
            },
        }
    }
}

/// Take one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` while the frame is still incomplete. A length field
/// of zero or above the Modbus maximum is an error: the stream cannot be
/// resynchronized and the caller should drop the buffer.
pub fn split_frame(buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
    if buf.len() < 6 {
        return Ok(None);
    }
    let length = u16::from_be_bytes([buf[4], buf[5]]);
    if length == 0 || length > MAX_MBAP_LENGTH {
        return Err(FrameError::BadLength(length));
    }
    let total = 6 + length as usize;
    if buf.len() < total {
        return Ok(None);
    }
    Ok(Some(buf.drain(..total).collect()))
}

fn need(frame: &[u8], needed: usize) -> Result<(), FrameError> {
    if frame.len() < needed {
        Err(FrameError::Truncated {
            needed,
            got: frame.len(),
        })
    } else {
        Ok(())
    }
}

fn word(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

fn check_quantity(function: u8, quantity: u16, max: u16) -> Result<u16, FrameError> {
    if quantity == 0 || quantity > max {
        Err(FrameError::InvalidQuantity { function, quantity })
    } else {
        Ok(quantity)
    }
}

/// Decode one complete frame.
pub fn decode(frame: &[u8]) -> Result<(MbapHeader, Request), FrameError> {
    need(frame, MIN_FRAME_LEN)?;
    let header = MbapHeader::parse(frame);
    let function = frame[MBAP_HEADER_LEN];

    let request = match function {
        FC_READ_COILS | FC_READ_DISCRETE_INPUTS | FC_READ_HOLDING_REGISTERS => {
            need(frame, 12)?;
            let start = word(frame, 8);
            let max = if function == FC_READ_HOLDING_REGISTERS {
                MAX_READ_REGISTERS
            } else {
                MAX_READ_BITS
            };
            let quantity = check_quantity(function, word(frame, 10), max)?;
            match function {
                FC_READ_COILS => Request::ReadCoils { start, quantity },
                FC_READ_DISCRETE_INPUTS => Request::ReadDiscreteInputs { start, quantity },
                _ => Request::ReadHoldingRegisters { start, quantity },
            }
        }
        FC_WRITE_SINGLE_COIL => {
            need(frame, WRITE_SINGLE_FRAME_LEN)?;
            Request::WriteSingleCoil {
                address: word(frame, 8),
                value: word(frame, 10) == COIL_ON,
            }
        }
        FC_WRITE_MULTIPLE_COILS => {
            need(frame, WRITE_MULTIPLE_DATA_OFFSET)?;
            let start = word(frame, 8);
            let quantity = check_quantity(function, word(frame, 10), MAX_WRITE_BITS)?;
            let bytes = (quantity as usize).div_ceil(8);
            need(frame, WRITE_MULTIPLE_DATA_OFFSET + bytes)?;
            let data = &frame[WRITE_MULTIPLE_DATA_OFFSET..];
            let values = unpack_bits(data, quantity as usize);
            Request::WriteMultipleCoils { start, values }
        }
        other => return Err(FrameError::UnsupportedFunction(other)),
    };

    Ok((header, request))
}

/// LSB-first bit packing.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes.get(i / 8).is_some_and(|b| b & (1 << (i % 8)) != 0))
        .collect()
}

fn with_mbap(header: &MbapHeader, pdu: &[u8]) -> Vec<u8> {
    let length = (pdu.len() + 1) as u16;
    let mut response = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    response.extend_from_slice(&header.transaction_id.to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00]);
    response.extend_from_slice(&length.to_be_bytes());
    response.push(header.unit_id);
    response.extend_from_slice(pdu);
    response
}

/// Build the response frame for `request` given the image reply.
///
/// Returns `None` if the reply does not fit the request kind.
pub fn encode_response(
    frame: &[u8],
    header: &MbapHeader,
    request: &Request,
    reply: &ImageReply,
) -> Option<Vec<u8>> {
    match (request, reply) {
        (Request::ReadCoils { .. } | Request::ReadDiscreteInputs { .. }, ImageReply::Bits(bits)) => {
            let packed = pack_bits(bits);
            let mut pdu = Vec::with_capacity(2 + packed.len());
            pdu.push(request.function_code());
            pdu.push(packed.len() as u8);
            pdu.extend_from_slice(&packed);
            Some(with_mbap(header, &pdu))
        }
        (Request::ReadHoldingRegisters { .. }, ImageReply::Words(words)) => {
            let mut pdu = Vec::with_capacity(2 + words.len() * 2);
            pdu.push(FC_READ_HOLDING_REGISTERS);
            pdu.push((words.len() * 2) as u8);
            for w in words {
                pdu.extend_from_slice(&w.to_be_bytes());
            }
            Some(with_mbap(header, &pdu))
        }
        (Request::WriteSingleCoil { .. }, ImageReply::Written(_)) => {
            frame.get(..WRITE_SINGLE_FRAME_LEN).map(<[u8]>::to_vec)
        }
        (Request::WriteMultipleCoils { start, values }, ImageReply::Written(_)) => {
            let mut pdu = Vec::with_capacity(5);
            pdu.push(FC_WRITE_MULTIPLE_COILS);
            pdu.extend_from_slice(&start.to_be_bytes());
            pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
            Some(with_mbap(header, &pdu))
        }
        _ => None,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
