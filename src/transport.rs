use crate::error::Result;
use std::future::Future;

/// Byte-oriented serial link for Modbus RTU framing.
///
/// Implementations handle the physical layer (RS-485 serial, or a
/// scripted mock in tests); framing and CRC live above this trait.
pub trait Wire {
    /// Transmit a complete frame; resolves once the write is handed to
    /// the driver.
    fn send(&mut self, frame: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read whatever bytes are currently pending into `buf` without
    /// waiting. Resolves with `Ok(0)` when nothing is buffered.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;
}
