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

use std::time::Duration;

use super::*;

/// How the delay between two attempts of the same record grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffKind {
    /// `base-delay-ms * k` before attempt `k + 1`.
    #[default]
    Linear,
    /// `base-delay-ms * 2^(k-1)` before attempt `k + 1`.
    Exponential,
}

/// Poll loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "kebab-case"))]
pub struct PollerConfig {
    /// Milliseconds between the start of two poll cycles.
    ///
    /// default to 20_000
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Milliseconds to wait between two devices of the same cycle.
    ///
    /// default to 500
    #[serde(default = "defaults::inter_record_delay_ms")]
    pub inter_record_delay_ms: u64,
    /// Attempts per record and cycle, including the first one.
    ///
    /// default to 1
    #[serde(default = "defaults::max_retries")]
    pub max_retries: usize,
    /// Backoff step in milliseconds.
    ///
    /// default to 2_000
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff growth.
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Stop retrying a record as soon as the destination rejects it.
    #[serde(default)]
    pub skip_retry_on_rejection: bool,
}

impl PollerConfig {
    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The inter-record delay as a [`Duration`].
    pub fn inter_record_delay(&self) -> Duration {
        Duration::from_millis(self.inter_record_delay_ms)
    }

    /// The backoff step as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval_ms(),
            inter_record_delay_ms: defaults::inter_record_delay_ms(),
            max_retries: defaults::max_retries(),
            base_delay_ms: defaults::base_delay_ms(),
            backoff: BackoffKind::default(),
            skip_retry_on_rejection: false,
        }
    }
}
