//! RS-485 serial link for talking to the meter.
//!
//! The JSY-MK-194T ships configured for 4800 8N1 with no flow control.
//! Writes go out in full before returning; reads only ever hand back
//! bytes the driver has already buffered, so the receive path never
//! stalls the poll loop.

use crate::error::{JsyError, Result};
use crate::transport::Wire;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Factory default baud rate of the JSY-MK-194T.
pub const DEFAULT_BAUD_RATE: u32 = 4800;

/// Serial transport over a `tokio-serial` port.
pub struct SerialWire {
    port: SerialStream,
    path: String,
}

impl std::fmt::Debug for SerialWire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialWire")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SerialWire {
    /// Opens a serial port at the given baud rate.
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `baud_rate` - Baud rate (4800 for an unconfigured meter)
    pub fn new(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| JsyError::Io(std::io::Error::other(e.to_string())))?;

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// Opens a serial port at the factory default baud rate.
    pub fn open(path: &str) -> Result<Self> {
        Self::new(path, DEFAULT_BAUD_RATE)
    }
}

impl Wire for SerialWire {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame).await?;
        self.port.flush().await?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        // Poll the read exactly once: ready means buffered bytes, not
        // ready means the line is quiet right now.
        match self.port.read(buf).now_or_never() {
            Some(Ok(n)) => Ok(n),
            Some(Err(e)) => Err(e.into()),
            None => Ok(0),
        }
    }
}
