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

use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};

/// A struct definition for collecting metrics in the relayer.
///
/// Every instance owns its registry, so several relayers (or tests) can live
/// in one process.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Poll cycles started.
    pub cycles_total: Counter,
    /// Poll cycles aborted because the source could not be read.
    pub cycles_aborted: Counter,
    /// Records confirmed on chain.
    pub records_succeeded: Counter,
    /// Records that exhausted their attempts.
    pub records_failed: Counter,
    /// Submission attempts beyond the first one.
    pub submission_retries: Counter,
    /// Duration of the last completed cycle, in seconds.
    pub last_cycle_duration: Gauge,
}

impl Metrics {
    /// Instantiates the various metrics and their counters, also creates a registry for the counters and
    /// registers the counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let cycles_total = Counter::new(
            "relay_cycles_total",
            "The total number of poll cycles started",
        )?;
        let cycles_aborted = Counter::new(
            "relay_cycles_aborted_total",
            "Poll cycles aborted because the source was unavailable",
        )?;
        let records_succeeded = Counter::new(
            "relay_records_succeeded_total",
            "Sensor records confirmed on chain",
        )?;
        let records_failed = Counter::new(
            "relay_records_failed_total",
            "Sensor records that failed every attempt in their cycle",
        )?;
        let submission_retries = Counter::new(
            "relay_submission_retries_total",
            "How many times a submission was retried",
        )?;
        let last_cycle_duration = Gauge::new(
            "relay_last_cycle_duration_seconds",
            "Duration of the last completed poll cycle",
        )?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycles_aborted.clone()))?;
        registry.register(Box::new(records_succeeded.clone()))?;
        registry.register(Box::new(records_failed.clone()))?;
        registry.register(Box::new(submission_retries.clone()))?;
        registry.register(Box::new(last_cycle_duration.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            cycles_aborted,
            records_succeeded,
            records_failed,
            submission_retries,
            last_cycle_duration,
        })
    }

    /// Gathers the whole relayer metrics in the Prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, GatherMetricsError> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

/// Failure while rendering the metrics.
#[derive(Debug, thiserror::Error)]
pub enum GatherMetricsError {
    /// Encoding failed.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// The encoder produced invalid UTF-8.
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
}
