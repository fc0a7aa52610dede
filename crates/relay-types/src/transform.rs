// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;

use crate::SensorRecord;

/// Scale of the fixed-point encoding: two decimal digits.
pub const FIXED_POINT_SCALE: f64 = 100.0;

/// The argument list of `recordSensorData`, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReadingArgs {
    /// Device identifier.
    pub device_id: String,
    /// `floor(moisture)`.
    pub moisture: u64,
    /// `floor(temperature * 100)`.
    pub temperature: i64,
    /// `floor(humidity * 100)`.
    pub humidity: i64,
    /// Passed through.
    pub status: String,
    /// Passed through.
    pub local_date: String,
    /// Passed through.
    pub local_time: String,
    /// Passed through.
    pub timestamp: u64,
}

/// A reading that can not be represented as contract arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// NaN or infinity.
    #[error("{field} is not a finite number")]
    NotFinite {
        /// The offending field.
        field: &'static str,
    },
    /// The contract slot is unsigned.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// The offending field.
        field: &'static str,
        /// The raw value.
        value: f64,
    },
    /// Does not fit in 64 bits after scaling.
    #[error("{field} is out of range, got {value}")]
    OutOfRange {
        /// The offending field.
        field: &'static str,
        /// The raw value.
        value: f64,
    },
}

/// Maps a raw reading to the contract's argument list.
///
/// Multiplication and `floor` are done in `f64`, the same as
/// `Math.floor(x * 100)` on the dashboard side, so both agree bit for bit
/// (`61.2 → 6120`, `0.29 → 28`).
pub fn to_reading_args(
    record: &SensorRecord,
) -> Result<SensorReadingArgs, TransformError> {
    Ok(SensorReadingArgs {
        device_id: record.device_id.clone(),
        moisture: unsigned_floor("moisture", record.moisture)?,
        temperature: fixed_point("temperature", record.temperature)?,
        humidity: fixed_point("humidity", record.humidity)?,
        status: record.status.clone(),
        local_date: record.local_date.clone(),
        local_time: record.local_time.clone(),
        timestamp: record.timestamp,
    })
}

fn fixed_point(field: &'static str, value: f64) -> Result<i64, TransformError> {
    if !value.is_finite() {
        return Err(TransformError::NotFinite { field });
    }
    let scaled = (value * FIXED_POINT_SCALE).floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return Err(TransformError::OutOfRange { field, value });
    }
    Ok(scaled as i64)
}

fn unsigned_floor(
    field: &'static str,
    value: f64,
) -> Result<u64, TransformError> {
    if !value.is_finite() {
        return Err(TransformError::NotFinite { field });
    }
    let floored = value.floor();
    if floored < 0.0 {
        return Err(TransformError::Negative { field, value });
    }
    if floored >= u64::MAX as f64 {
        return Err(TransformError::OutOfRange { field, value });
    }
    Ok(floored as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(moisture: f64, temperature: f64, humidity: f64) -> SensorRecord {
        SensorRecord {
            device_id: "deviceA".into(),
            moisture,
            temperature,
            humidity,
            status: "ok".into(),
            local_date: "2025-03-01".into(),
            local_time: "10:15:00".into(),
            timestamp: 1000,
        }
    }

    #[test]
    fn encodes_two_decimal_fixed_point() {
        let args = to_reading_args(&record(420.0, 26.5, 61.2)).unwrap();
        assert_eq!(args.moisture, 420);
        assert_eq!(args.temperature, 2650);
        assert_eq!(args.humidity, 6120);
        assert_eq!(args.device_id, "deviceA");
        assert_eq!(args.status, "ok");
        assert_eq!(args.local_date, "2025-03-01");
        assert_eq!(args.local_time, "10:15:00");
        assert_eq!(args.timestamp, 1000);
    }

    #[test]
    fn floors_small_and_negative_values() {
        assert_eq!(fixed_point("t", 0.001), Ok(0));
        assert_eq!(fixed_point("t", -1.234), Ok(-124));
        assert_eq!(fixed_point("t", -0.001), Ok(-1));
        assert_eq!(fixed_point("t", 0.0), Ok(0));
    }

    #[test]
    fn keeps_float_artifacts_of_the_multiplication() {
        // 0.29 * 100.0 == 28.999999999999996 in IEEE-754.
        assert_eq!(fixed_point("t", 0.29), Ok(28));
        assert_eq!(fixed_point("t", 1.005), Ok(100));
    }

    #[test]
    fn truncates_moisture() {
        let args = to_reading_args(&record(420.9, 20.0, 50.0)).unwrap();
        assert_eq!(args.moisture, 420);
    }

    #[test]
    fn refuses_values_the_contract_can_not_hold() {
        assert_eq!(
            to_reading_args(&record(-1.0, 20.0, 50.0)),
            Err(TransformError::Negative {
                field: "moisture",
                value: -1.0
            })
        );
        assert_eq!(
            to_reading_args(&record(1.0, f64::NAN, 50.0)),
            Err(TransformError::NotFinite {
                field: "temperature"
            })
        );
        assert!(matches!(
            to_reading_args(&record(1.0, 20.0, 1e300)),
            Err(TransformError::OutOfRange {
                field: "humidity",
                ..
            })
        ));
    }

    #[test]
    fn is_idempotent() {
        let raw = record(512.0, 31.47, 44.44);
        let first = to_reading_args(&raw).unwrap();
        let second = to_reading_args(&raw).unwrap();
        assert_eq!(first, second);
    }
}
