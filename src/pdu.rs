//! Modbus RTU request framing for the read-only client role.
//!
//! The meter is polled with a single request shape, function 0x03
//! (read holding registers): `[addr][0x03][reg_hi][reg_lo][count_hi]
//! [count_lo][crc_lo][crc_hi]`.

use crate::crc::append_crc;

/// Read holding registers, the only function this client issues.
pub const FUNC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// High bit of the function code marks an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Largest Modbus RTU ADU.
pub const MAX_FRAME_SIZE: usize = 256;

/// An exception response carries address, flagged function, exception
/// code, and the two CRC bytes.
pub const EXCEPTION_FRAME_SIZE: usize = 5;

/// A read-holding-registers request addressed to one slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u8,
    pub start_register: u16,
    pub register_count: u16,
}

impl ReadRequest {
    #[must_use]
    pub const fn new(address: u8, start_register: u16, register_count: u16) -> Self {
        Self {
            address,
            start_register,
            register_count,
        }
    }

    /// Serializes the 8-byte request ADU, CRC included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(8);
        frame.push(self.address);
        frame.push(FUNC_READ_HOLDING_REGISTERS);
        frame.extend(&self.start_register.to_be_bytes());
        frame.extend(&self.register_count.to_be_bytes());
        append_crc(&mut frame);
        frame
    }
}

/// Expected total length of a success response for `register_count`
/// 32-bit meter registers: address + function + byte count + data + CRC.
#[must_use]
pub const fn response_size(register_count: u16) -> usize {
    5 + 4 * register_count as usize
}
