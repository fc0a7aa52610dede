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

//! Sensor Source Backends
//!
//! A Sensor Source is the store the field devices write their latest reading
//! to. Every device overwrites its own entry, so the store is a live snapshot
//! and never a queue: reading it twice returns the newest value of each device
//! both times.
//!
//! As of now, the following backends are supported:
//! - [Firebase Realtime Database](https://firebase.google.com/docs/database/rest/start)
//!   through its REST interface.
//! - An in-memory snapshot, for tests and local runs.
//!
//! ## Usage
//! ```rust,ignore
//! use krishi_source_backends::{FirebaseSource, SensorSource};
//! let source = FirebaseSource::builder()
//!     .database_url("https://krishi-demo.firebaseio.com".parse()?)
//!     .collection("sensor_data")
//!     .build();
//! let snapshot = source.snapshot().await?;
//! ```
//!
//! ## Features flags
//! - `firebase` - enables the `Firebase` backend
//! - `testing` - exposes `MockSensorSource`

#![deny(unsafe_code)]
#![warn(missing_docs)]

use krishi_relay_types::SensorRecord;
use krishi_relay_utils::Result;

/// `Firebase` Backend
#[cfg(feature = "firebase")]
mod firebase;
/// In-memory Backend
mod memory;

#[cfg(feature = "firebase")]
pub use firebase::FirebaseSource;
pub use memory::InMemorySource;

/// One device of a snapshot: its reading, or why the stored value is not one.
pub type SnapshotEntry = std::result::Result<SensorRecord, String>;

/// The readings of one poll, keyed by device id, in the order the store
/// returned them.
pub type Snapshot = Vec<(String, SnapshotEntry)>;

/// A trait for a sensor source
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait SensorSource: Send + Sync {
    /// Reads every device of the collection at once.
    ///
    /// An empty collection is an empty snapshot, not an error. On failure
    /// nothing is returned, there are no partial snapshots.
    async fn snapshot(&self) -> Result<Snapshot>;

    /// Checks that the store is reachable and the credentials are accepted,
    /// without downloading the readings.
    async fn health_check(&self) -> Result<()>;
}

/// Decodes the entries of a collection, keeping their order.
///
/// Entries that are not valid readings stay in the snapshot as decode
/// failures, so the cycle still accounts for them.
pub(crate) fn decode_snapshot(body: serde_json::Value) -> Result<Snapshot> {
    use serde_json::Value;
    let entries: Vec<(String, Value)> = match body {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        // numeric keys starting at 0 come back as an array, holes are null.
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            return Err(krishi_relay_utils::Error::SourceUnavailable {
                reason: format!("expected an object of devices, got {other}"),
            })
        }
    };
    let snapshot = entries
        .into_iter()
        .map(|(device_id, value)| {
            let entry = SensorRecord::from_json(device_id.clone(), value)
                .map_err(|e| {
                    tracing::warn!(
                        device_id = %device_id,
                        "Malformed reading: {}",
                        e
                    );
                    e.to_string()
                });
            (device_id, entry)
        })
        .collect();
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(moisture: f64) -> serde_json::Value {
        serde_json::json!({
            "moisture": moisture,
            "temperature": "26.5",
            "humidity": 61.2,
            "status": "OK",
            "localDate": "2024-03-01",
            "localTime": "10:15:00",
            "timestamp": 1709288100000u64
        })
    }

    #[test]
    fn null_is_an_empty_snapshot() {
        assert!(decode_snapshot(serde_json::Value::Null).unwrap().is_empty());
        assert!(decode_snapshot(serde_json::json!({})).unwrap().is_empty());
    }

    #[test]
    fn keeps_store_order() {
        let body = serde_json::json!({
            "zeta": reading(1.0),
            "alpha": reading(2.0),
            "mid": reading(3.0),
        });
        let ids: Vec<_> = decode_snapshot(body)
            .unwrap()
            .into_iter()
            .map(|(id, record)| {
                assert_eq!(record.unwrap().device_id, id);
                id
            })
            .collect();
        assert_eq!(ids, ["zeta", "alpha", "mid"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn malformed_entries_are_kept_as_failures() {
        let body = serde_json::json!({
            "good": reading(1.0),
            "hot": { "moisture": 10, "temperature": "hot" },
            "nan": { "moisture": 10, "temperature": "NaN", "humidity": 1,
                     "status": "OK", "timestamp": 1 },
        });
        let snapshot = decode_snapshot(body).unwrap();
        let ids: Vec<_> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["good", "hot", "nan"]);
        assert!(snapshot[0].1.is_ok());
        let reason = snapshot[1].1.as_ref().unwrap_err();
        assert!(reason.contains("hot"), "{reason}");
        // decodes, the transformer refuses it later
        assert!(snapshot[2].1.is_ok());
        assert!(logs_contain("Malformed reading"));
    }

    #[test]
    fn arrays_use_their_index_as_device_id() {
        let body = serde_json::json!([reading(1.0), null, reading(3.0)]);
        let ids: Vec<_> = decode_snapshot(body)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["0", "2"]);
    }

    #[test]
    fn scalars_are_refused() {
        let err = decode_snapshot(serde_json::json!("offline")).unwrap_err();
        assert!(matches!(
            err,
            krishi_relay_utils::Error::SourceUnavailable { .. }
        ));
    }
}
