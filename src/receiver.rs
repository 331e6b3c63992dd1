//! Byte-at-a-time Modbus RTU frame reassembly.
//!
//! RTU has no framing delimiters, so the receiver walks a state machine
//! over the raw byte stream: the first byte of a frame is the slave
//! address, the second the function code, and the expected total length
//! is derived from the function code (exception responses) or from the
//! byte-count field (function 0x03 responses). A frame is complete once
//! the expected length is reached and the trailing CRC verifies.
//!
//! Completed frames are reported as [`RxEvent`] return values rather
//! than through a callback, so the caller decides how to route them.
//! The receiver never blocks and holds no I/O handle; feeding bytes is
//! the caller's job.

use std::time::{Duration, Instant};

use crate::crc::verify_crc;
use crate::error::ModbusExceptionCode;
use crate::pdu::{EXCEPTION_FLAG, EXCEPTION_FRAME_SIZE, MAX_FRAME_SIZE};

/// A slave that stops transmitting mid-frame is abandoned after this
/// long and the receiver returns to waiting for a start of frame.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitSof,
    WaitFunction,
    WaitDataSize,
    WaitData,
    WaitCrc,
}

/// Outcome of feeding one byte to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// A complete frame with a valid checksum, CRC bytes included.
    Frame(Vec<u8>),
    /// A complete, checksum-valid exception response.
    Exception { address: u8, code: u8 },
    /// A frame of the expected length whose checksum did not verify.
    BadCrc,
}

/// Reassembles one Modbus RTU frame at a time from a byte stream.
pub struct FrameReceiver {
    state: State,
    function: u8,
    frame: [u8; MAX_FRAME_SIZE],
    len: usize,
    expected: usize,
    sof_time: Option<Instant>,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::WaitSof,
            function: 0,
            frame: [0; MAX_FRAME_SIZE],
            len: 0,
            expected: 0,
            sof_time: None,
        }
    }

    /// True once the in-progress frame has filled the buffer. The caller
    /// should stop draining the port; the frame timeout will reset us.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len >= MAX_FRAME_SIZE
    }

    /// Consumes one received byte. Returns an event when the byte
    /// completes a frame, valid or not.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<RxEvent> {
        if self.is_full() {
            return None;
        }

        self.frame[self.len] = byte;
        self.len += 1;

        match self.state {
            State::WaitSof => {
                self.sof_time = Some(now);
                self.state = State::WaitFunction;
                None
            }
            State::WaitFunction => {
                self.function = byte;
                if byte & EXCEPTION_FLAG != 0 {
                    // Exception PDUs carry no byte-count field: the next
                    // byte is the exception code, then the CRC.
                    self.expected = EXCEPTION_FRAME_SIZE;
                    self.state = State::WaitData;
                } else {
                    self.state = State::WaitDataSize;
                }
                None
            }
            State::WaitDataSize => {
                // address + function + byte count + data + 2 CRC bytes
                self.expected = byte as usize + 5;
                self.state = State::WaitData;
                None
            }
            State::WaitData => {
                if self.len >= self.expected.saturating_sub(2) {
                    self.state = State::WaitCrc;
                }
                None
            }
            State::WaitCrc => {
                if self.len < self.expected {
                    return None;
                }
                let event = self.close_frame();
                self.reset();
                Some(event)
            }
        }
    }

    /// Abandons the in-progress frame if it started more than
    /// [`FRAME_TIMEOUT`] ago. Run once per poll, bytes or no bytes.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.state == State::WaitSof {
            return false;
        }
        let stale = self
            .sof_time
            .is_some_and(|sof| now.duration_since(sof) > FRAME_TIMEOUT);
        if stale {
            tracing::debug!(len = self.len, "abandoning stalled frame");
            self.reset();
        }
        stale
    }

    fn close_frame(&mut self) -> RxEvent {
        let frame = &self.frame[..self.len];
        if !verify_crc(frame) {
            tracing::warn!(frame = ?frame, "dropping frame with bad CRC");
            return RxEvent::BadCrc;
        }
        if self.function & EXCEPTION_FLAG != 0 {
            let address = frame[0];
            let code = frame[2];
            match ModbusExceptionCode::from_u8(code) {
                Some(exception) => tracing::warn!(
                    address,
                    function = frame[1],
                    "slave returned exception: {exception}"
                ),
                None => tracing::warn!(
                    address,
                    function = frame[1],
                    code,
                    "slave returned unrecognized exception code"
                ),
            }
            return RxEvent::Exception { address, code };
        }
        RxEvent::Frame(frame.to_vec())
    }

    fn reset(&mut self) {
        self.state = State::WaitSof;
        self.len = 0;
        self.expected = 0;
        self.sof_time = None;
    }
}
