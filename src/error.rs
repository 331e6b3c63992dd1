use std::fmt;

/// Fatal failures of the serial surface. In-band protocol faults (bad
/// checksums, slave exceptions, overlong frames) are not errors; they
/// come back as [`crate::receiver::RxEvent`] values and heal on the
/// next request cycle.
#[derive(Debug)]
pub enum JsyError {
    Io(std::io::Error),
}

impl fmt::Display for JsyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsyError::Io(e) => write!(f, "serial I/O error: {e}"),
        }
    }
}

impl std::error::Error for JsyError {}

impl From<std::io::Error> for JsyError {
    fn from(err: std::io::Error) -> JsyError {
        JsyError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, JsyError>;

/// Exception codes a slave can put in an exception response PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModbusExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
    Acknowledge = 0x05,
    SlaveDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetFailedToRespond = 0x0B,
}

impl ModbusExceptionCode {
    pub const fn from_u8(code: u8) -> Option<Self> {
        use ModbusExceptionCode::*;
        Some(match code {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => SlaveDeviceFailure,
            0x05 => Acknowledge,
            0x06 => SlaveDeviceBusy,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetFailedToRespond,
            _ => return None,
        })
    }

    /// The raw code as it appears on the wire.
    pub const fn code(self) -> u8 {
        self as u8
    }

    const fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetFailedToRespond => "gateway target failed to respond",
        }
    }
}

impl fmt::Display for ModbusExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:02X}h)", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_codes_round_trip_through_the_wire_byte() {
        for code in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x08, 0x0A, 0x0B] {
            let exception = ModbusExceptionCode::from_u8(code).unwrap();
            assert_eq!(exception.code(), code);
        }
        assert_eq!(ModbusExceptionCode::from_u8(0x07), None);
        assert_eq!(ModbusExceptionCode::from_u8(0xFF), None);
    }

    #[test]
    fn exception_display_names_the_code() {
        let e = ModbusExceptionCode::IllegalDataAddress;
        assert_eq!(e.to_string(), "illegal data address (02h)");
    }

    #[test]
    fn io_errors_convert_and_display() {
        let e = JsyError::from(std::io::Error::other("port gone"));
        assert_eq!(e.to_string(), "serial I/O error: port gone");
    }
}
