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

use std::sync::Arc;

use krishi_relay_types::SensorRecord;
use krishi_relay_utils::Result;
use parking_lot::RwLock;

use crate::Snapshot;

#[derive(Debug, Default)]
struct State {
    snapshot: Snapshot,
    unavailable: bool,
    reads: usize,
}

/// A source that serves a snapshot held in memory.
///
/// Clones share the same snapshot, so a test can keep a handle and change
/// the readings while the poller is running.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    state: Arc<RwLock<State>>,
}

impl InMemorySource {
    /// Creates a source serving `records`, keyed by their device id.
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = SensorRecord>) -> Self {
        let source = Self::default();
        source.set_records(records);
        source
    }

    /// Replaces the served snapshot.
    pub fn set_records(&self, records: impl IntoIterator<Item = SensorRecord>) {
        self.state.write().snapshot = records
            .into_iter()
            .map(|r| (r.device_id.clone(), Ok(r)))
            .collect();
    }

    /// Appends a device whose stored value is not a valid reading.
    pub fn push_malformed(&self, device_id: &str, reason: &str) {
        self.state
            .write()
            .snapshot
            .push((device_id.to_string(), Err(reason.to_string())));
    }

    /// Makes every following read fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    /// How many snapshots were requested so far.
    pub fn reads(&self) -> usize {
        self.state.read().reads
    }
}

#[async_trait::async_trait]
impl super::SensorSource for InMemorySource {
    async fn snapshot(&self) -> Result<Snapshot> {
        let mut state = self.state.write();
        state.reads += 1;
        if state.unavailable {
            return Err(krishi_relay_utils::Error::SourceUnavailable {
                reason: "in-memory source switched off".into(),
            });
        }
        Ok(state.snapshot.clone())
    }

    async fn health_check(&self) -> Result<()> {
        if self.state.read().unavailable {
            return Err(krishi_relay_utils::Error::SourceUnavailable {
                reason: "in-memory source switched off".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SensorSource;

    fn record(device_id: &str) -> SensorRecord {
        SensorRecord {
            device_id: device_id.into(),
            moisture: 420.0,
            temperature: 26.5,
            humidity: 61.2,
            status: "OK".into(),
            local_date: "2024-03-01".into(),
            local_time: "10:15:00".into(),
            timestamp: 1_709_288_100_000,
        }
    }

    #[tokio::test]
    async fn it_works() {
        let source = InMemorySource::new([record("b"), record("a")]);
        let snapshot = source.snapshot().await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn malformed_devices_keep_their_place() {
        let source = InMemorySource::new([record("a")]);
        source.push_malformed("b", "missing field `status`");
        let snapshot = source.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].1.is_ok());
        assert_eq!(
            snapshot[1],
            ("b".to_string(), Err("missing field `status`".to_string()))
        );
    }

    #[tokio::test]
    async fn can_be_switched_off() {
        let source = InMemorySource::new([record("a")]);
        let handle = source.clone();
        handle.set_unavailable(true);
        assert!(source.snapshot().await.is_err());
        assert!(source.health_check().await.is_err());
        handle.set_unavailable(false);
        handle.set_records(Vec::new());
        assert!(source.snapshot().await.unwrap().is_empty());
        assert_eq!(handle.reads(), 2);
    }
}
