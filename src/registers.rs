//! JSY-MK-194T register map and response decoding.
//!
//! The meter exposes its measurements as 14 contiguous 32-bit big-endian
//! holding registers starting at 0x0048: line voltage, then per channel
//! current, active power, cumulative energy and power factor, a register
//! of sign-flag bytes for the two channel powers, and the line frequency
//! at 0x004F. Values come scaled: voltage, current, power and energy are
//! tenths of a milli-unit, frequency is hundredths of a hertz, power
//! factor is a ×1000 fixed-point fraction.

use byteorder::{BigEndian, ByteOrder};
use uom::si::electric_current::ampere;
use uom::si::electric_potential::volt;
use uom::si::energy::watt_hour;
use uom::si::f32::{ElectricCurrent, ElectricPotential, Energy, Frequency, Power, Ratio};
use uom::si::frequency::hertz;
use uom::si::power::watt;
use uom::si::ratio::ratio;

use crate::pdu::{FUNC_READ_HOLDING_REGISTERS, response_size};

/// First register of the measurement block.
pub const POWER_REGISTER_START: u16 = 0x0048;
/// Number of 32-bit registers in the measurement block.
pub const POWER_REGISTER_COUNT: u16 = 0x000E;
/// Total length of a measurement response frame.
pub const POWER_RESPONSE_SIZE: usize = response_size(POWER_REGISTER_COUNT);

/// Start of the identity/model block probed once at startup.
pub const PROBE_REGISTER_START: u16 = 0x0000;
/// Number of registers in the startup probe.
pub const PROBE_REGISTER_COUNT: u16 = 0x0004;

// Byte offsets of each field within the 61-byte response frame
// (3 header bytes, then the register data).
const VOLTAGE: usize = 3;
const FREQUENCY: usize = 31;

struct ChannelLayout {
    current: usize,
    power: usize,
    energy: usize,
    power_factor: usize,
    power_sign: usize,
}

const CHANNELS: [ChannelLayout; 2] = [
    ChannelLayout {
        current: 7,
        power: 11,
        energy: 15,
        power_factor: 19,
        power_sign: 27,
    },
    ChannelLayout {
        current: 39,
        power: 43,
        energy: 47,
        power_factor: 51,
        power_sign: 28,
    },
];

/// One metered circuit of a decoded reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMeasurement {
    pub current_ma: u32,
    /// Signed: the meter reports direction in a separate flag byte.
    pub active_power_mw: i32,
    /// Monotonically non-decreasing while the meter stays powered.
    pub energy_wh: u32,
    /// Fixed point, ×1000.
    pub power_factor_milli: u32,
}

impl ChannelMeasurement {
    pub fn current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<ampere>(self.current_ma as f32 / 1000.0)
    }

    pub fn active_power(&self) -> Power {
        Power::new::<watt>(self.active_power_mw as f32 / 1000.0)
    }

    pub fn energy(&self) -> Energy {
        Energy::new::<watt_hour>(self.energy_wh as f32)
    }

    pub fn power_factor(&self) -> Ratio {
        Ratio::new::<ratio>(self.power_factor_milli as f32 / 1000.0)
    }
}

/// One complete meter reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerRecord {
    /// Monotonic reading number, assigned by the ring buffer on write.
    pub index: u32,
    /// Monotonic microsecond clock at decode time, not wall time.
    pub timestamp_us: u64,
    pub voltage_mv: u32,
    pub frequency_mhz: u32,
    pub channels: [ChannelMeasurement; 2],
}

impl PowerRecord {
    /// Decodes a validated response frame into a reading.
    ///
    /// Only a function-0x03 frame of exactly the measurement-block
    /// length decodes; anything else (the startup probe response, late
    /// bytes from an earlier request) returns `None` and is dropped
    /// without being an error.
    #[must_use]
    pub fn decode(frame: &[u8], timestamp_us: u64) -> Option<PowerRecord> {
        if frame.len() != POWER_RESPONSE_SIZE || frame[1] != FUNC_READ_HOLDING_REGISTERS {
            return None;
        }

        let mut channels = [ChannelMeasurement::default(); 2];
        for (channel, layout) in channels.iter_mut().zip(&CHANNELS) {
            let mut power_mw = (field(frame, layout.power) / 10) as i32;
            if frame[layout.power_sign] != 0 {
                power_mw = -power_mw;
            }
            *channel = ChannelMeasurement {
                current_ma: field(frame, layout.current) / 10,
                active_power_mw: power_mw,
                energy_wh: field(frame, layout.energy) / 10,
                power_factor_milli: field(frame, layout.power_factor),
            };
        }

        Some(PowerRecord {
            index: 0,
            timestamp_us,
            voltage_mv: field(frame, VOLTAGE) / 10,
            frequency_mhz: field(frame, FREQUENCY).saturating_mul(10),
            channels,
        })
    }

    pub fn voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<volt>(self.voltage_mv as f32 / 1000.0)
    }

    pub fn frequency(&self) -> Frequency {
        Frequency::new::<hertz>(self.frequency_mhz as f32 / 1000.0)
    }
}

fn field(frame: &[u8], offset: usize) -> u32 {
    BigEndian::read_u32(&frame[offset..offset + 4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::append_crc;

    fn response_frame(write_fields: impl Fn(&mut [u8])) -> Vec<u8> {
        let mut frame = vec![0u8; POWER_RESPONSE_SIZE - 2];
        frame[0] = 0x01;
        frame[1] = FUNC_READ_HOLDING_REGISTERS;
        frame[2] = (4 * POWER_REGISTER_COUNT) as u8;
        write_fields(&mut frame);
        append_crc(&mut frame);
        frame
    }

    fn put(frame: &mut [u8], offset: usize, raw: u32) {
        BigEndian::write_u32(&mut frame[offset..offset + 4], raw);
    }

    #[test]
    fn decodes_all_fields_with_scaling() {
        let frame = response_frame(|f| {
            put(f, 3, 2_301_234); // 230.1234 V
            put(f, 31, 5_000); // 50.00 Hz
            put(f, 7, 43_210); // channel 1
            put(f, 11, 9_876_540);
            put(f, 15, 123_450);
            put(f, 19, 987);
            put(f, 39, 1_000); // channel 2
            put(f, 43, 2_000);
            put(f, 47, 3_000);
            put(f, 51, 1_000);
        });

        let record = PowerRecord::decode(&frame, 42).expect("frame should decode");
        assert_eq!(record.timestamp_us, 42);
        assert_eq!(record.voltage_mv, 230_123);
        assert_eq!(record.frequency_mhz, 50_000);

        assert_eq!(record.channels[0].current_ma, 4_321);
        assert_eq!(record.channels[0].active_power_mw, 987_654);
        assert_eq!(record.channels[0].energy_wh, 12_345);
        assert_eq!(record.channels[0].power_factor_milli, 987);

        assert_eq!(record.channels[1].current_ma, 100);
        assert_eq!(record.channels[1].active_power_mw, 200);
        assert_eq!(record.channels[1].energy_wh, 300);
        assert_eq!(record.channels[1].power_factor_milli, 1_000);
    }

    #[test]
    fn sign_flag_negates_channel_power() {
        let frame = response_frame(|f| {
            put(f, 11, 5_000);
            put(f, 43, 5_000);
            f[27] = 0x01; // channel 1 exporting
        });

        let record = PowerRecord::decode(&frame, 0).unwrap();
        assert_eq!(record.channels[0].active_power_mw, -500);
        assert_eq!(record.channels[1].active_power_mw, 500);
    }

    #[test]
    fn garbage_frequency_field_saturates() {
        // A CRC-valid frame can still carry any 32-bit value; the scale-up
        // must not overflow on a misbehaving meter.
        let frame = response_frame(|f| put(f, 31, u32::MAX));
        let record = PowerRecord::decode(&frame, 0).expect("frame should decode");
        assert_eq!(record.frequency_mhz, u32::MAX);
    }

    #[test]
    fn probe_response_is_ignored() {
        // The startup identity probe reads 4 registers; its 21-byte
        // response never matches the measurement-block length.
        let mut frame = vec![0u8; 19];
        frame[0] = 0x01;
        frame[1] = FUNC_READ_HOLDING_REGISTERS;
        frame[2] = 16;
        append_crc(&mut frame);

        assert_eq!(PowerRecord::decode(&frame, 0), None);
    }

    #[test]
    fn wrong_function_code_is_ignored() {
        let mut frame = response_frame(|_| {});
        frame[1] = 0x04;
        assert_eq!(PowerRecord::decode(&frame, 0), None);
    }

    #[test]
    fn unit_accessors_convert_to_si() {
        let record = PowerRecord {
            voltage_mv: 230_000,
            frequency_mhz: 50_000,
            channels: [
                ChannelMeasurement {
                    current_ma: 4_500,
                    active_power_mw: -1_035_000,
                    energy_wh: 12_345,
                    power_factor_milli: 950,
                },
                ChannelMeasurement::default(),
            ],
            ..Default::default()
        };

        assert!((record.voltage().get::<volt>() - 230.0).abs() < 1e-3);
        assert!((record.frequency().get::<hertz>() - 50.0).abs() < 1e-3);
        let ch = &record.channels[0];
        assert!((ch.current().get::<ampere>() - 4.5).abs() < 1e-3);
        assert!((ch.active_power().get::<watt>() + 1035.0).abs() < 1e-2);
        assert!((ch.energy().get::<watt_hour>() - 12_345.0).abs() < 1.0);
        assert!((ch.power_factor().get::<ratio>() - 0.95).abs() < 1e-3);
    }
}
