pub mod buffer;
pub mod client;
pub mod crc;
pub mod error;
pub mod pdu;
pub mod receiver;
pub mod registers;
pub mod serial;
pub mod telemetry;
pub mod transport;

pub use buffer::RecordRing;
pub use client::{DEFAULT_METER_ADDRESS, MeterClient};
pub use error::{JsyError, ModbusExceptionCode, Result};
pub use pdu::ReadRequest;
pub use receiver::{FrameReceiver, RxEvent};
pub use registers::{ChannelMeasurement, PowerRecord};
pub use serial::{DEFAULT_BAUD_RATE, SerialWire};
pub use telemetry::{TelemetryPublisher, TelemetrySnapshot};
pub use transport::Wire;
