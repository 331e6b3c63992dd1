//! JSON line telemetry for downstream consumers.
//!
//! Each new meter reading becomes one compact JSON object on its own
//! line: reading index, wall-clock ISO-8601 timestamp, line voltage and
//! frequency, and per channel current, active power, cumulative energy
//! and power factor, all in engineering units. A reading is published
//! once (deduplicated on its index) and only while it is fresh.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::registers::PowerRecord;

/// Readings older than this are history, not telemetry.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(1);

/// One reading flattened into engineering units for serialization.
#[derive(Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub idx: u32,
    pub time: String,
    #[serde(rename = "V")]
    pub voltage_v: f32,
    #[serde(rename = "F")]
    pub frequency_hz: f32,
    #[serde(rename = "I1")]
    pub current1_a: f32,
    #[serde(rename = "P1")]
    pub power1_w: f32,
    #[serde(rename = "E1")]
    pub energy1_wh: u32,
    #[serde(rename = "fp1")]
    pub power_factor1: f32,
    #[serde(rename = "I2")]
    pub current2_a: f32,
    #[serde(rename = "P2")]
    pub power2_w: f32,
    #[serde(rename = "E2")]
    pub energy2_wh: u32,
    #[serde(rename = "fp2")]
    pub power_factor2: f32,
}

impl TelemetrySnapshot {
    #[must_use]
    pub fn from_record(record: &PowerRecord, wall_time: DateTime<Utc>) -> Self {
        let [ch1, ch2] = &record.channels;
        Self {
            idx: record.index,
            time: wall_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            voltage_v: record.voltage_mv as f32 / 1000.0,
            frequency_hz: record.frequency_mhz as f32 / 1000.0,
            current1_a: ch1.current_ma as f32 / 1000.0,
            power1_w: ch1.active_power_mw as f32 / 1000.0,
            energy1_wh: ch1.energy_wh,
            power_factor1: ch1.power_factor_milli as f32 / 1000.0,
            current2_a: ch2.current_ma as f32 / 1000.0,
            power2_w: ch2.active_power_mw as f32 / 1000.0,
            energy2_wh: ch2.energy_wh,
            power_factor2: ch2.power_factor_milli as f32 / 1000.0,
        }
    }
}

/// Emits each reading as a JSON line exactly once.
#[derive(Debug, Default)]
pub struct TelemetryPublisher {
    last_index: Option<u32>,
}

impl TelemetryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the JSON line for `record` when it is fresh and not yet
    /// published, `None` otherwise.
    pub fn publish(
        &mut self,
        record: &PowerRecord,
        age: Duration,
        wall_time: DateTime<Utc>,
    ) -> Option<String> {
        if age > FRESHNESS_WINDOW || self.last_index == Some(record.index) {
            return None;
        }
        self.last_index = Some(record.index);

        let snapshot = TelemetrySnapshot::from_record(record, wall_time);
        match serde_json::to_string(&snapshot) {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize telemetry snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ChannelMeasurement;

    fn record(index: u32) -> PowerRecord {
        PowerRecord {
            index,
            timestamp_us: 0,
            voltage_mv: 231_500,
            frequency_mhz: 50_020,
            channels: [
                ChannelMeasurement {
                    current_ma: 4_500,
                    active_power_mw: -1_035_000,
                    energy_wh: 12_345,
                    power_factor_milli: 950,
                },
                ChannelMeasurement::default(),
            ],
        }
    }

    #[test]
    fn publishes_a_fresh_reading_once() {
        let mut publisher = TelemetryPublisher::new();
        let wall = Utc::now();

        let line = publisher
            .publish(&record(0), Duration::ZERO, wall)
            .expect("first reading should publish");

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["idx"], 0);
        assert_eq!(value["E1"], 12_345);
        assert!((value["V"].as_f64().unwrap() - 231.5).abs() < 1e-3);
        assert!((value["F"].as_f64().unwrap() - 50.02).abs() < 1e-3);
        assert!((value["P1"].as_f64().unwrap() + 1035.0).abs() < 1e-2);
        assert!((value["fp1"].as_f64().unwrap() - 0.95).abs() < 1e-3);
        assert_eq!(value["P2"], 0.0);

        // Same index again: already published.
        assert!(publisher.publish(&record(0), Duration::ZERO, wall).is_none());
    }

    #[test]
    fn stale_readings_are_not_published() {
        let mut publisher = TelemetryPublisher::new();
        let stale = FRESHNESS_WINDOW + Duration::from_millis(1);
        assert!(publisher.publish(&record(0), stale, Utc::now()).is_none());
    }

    #[test]
    fn new_index_publishes_again() {
        let mut publisher = TelemetryPublisher::new();
        let wall = Utc::now();
        assert!(publisher.publish(&record(0), Duration::ZERO, wall).is_some());
        assert!(publisher.publish(&record(1), Duration::ZERO, wall).is_some());
    }
}
