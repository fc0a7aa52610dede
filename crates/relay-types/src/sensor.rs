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

use serde::{Deserialize, Deserializer, Serialize};

/// The latest reading of one device, as read from the source snapshot.
///
/// Devices write numbers either as JSON numbers or as numeric strings
/// (`"26.5"`), both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// The key of this reading in the source store.
    #[serde(skip)]
    pub device_id: String,
    /// Soil moisture in raw sensor units.
    #[serde(deserialize_with = "number_or_string")]
    pub moisture: f64,
    /// Temperature in degrees Celsius.
    #[serde(deserialize_with = "number_or_string")]
    pub temperature: f64,
    /// Relative humidity in percent.
    #[serde(deserialize_with = "number_or_string")]
    pub humidity: f64,
    /// Short status text reported by the device.
    pub status: String,
    /// Device local date, display only. Empty when the device omits it.
    #[serde(default, alias = "localDate")]
    pub local_date: String,
    /// Device local time, display only. Empty when the device omits it.
    #[serde(default, alias = "localTime")]
    pub local_time: String,
    /// Epoch milliseconds of the reading.
    #[serde(deserialize_with = "epoch_millis")]
    pub timestamp: u64,
}

impl SensorRecord {
    /// Decodes the stored value of `device_id`.
    pub fn from_json(
        device_id: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let mut record: SensorRecord = serde_json::from_value(value)?;
        record.device_id = device_id.into();
        Ok(record)
    }

    /// The reading timestamp as an RFC 3339 string, for logs.
    pub fn timestamp_rfc3339(&self) -> String {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid number {s:?}: {e}"))
        }),
    }
}

fn epoch_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number_or_string(deserializer)?;
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Ok(value.trunc() as u64)
    } else {
        Err(serde::de::Error::custom(format!(
            "invalid epoch milliseconds {value}"
        )))
    }
}
