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
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use krishi_relay_config::poller::PollerConfig;
use krishi_relay_context::Shutdown;
use krishi_relay_utils::metric::Metrics;
use krishi_relay_utils::{probe, Result};
use krishi_source_backends::SensorSource;
use krishi_tx_submitter::LedgerSubmitter;

use crate::{PollCycleReport, RetryController};

/// Reads the source on a fixed interval and relays every reading it finds,
/// strictly one after the other.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn SensorSource>,
    controller: RetryController,
    poll_interval: Duration,
    inter_record_delay: Duration,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("controller", &self.controller)
            .field("poll_interval", &self.poll_interval)
            .field("inter_record_delay", &self.inter_record_delay)
            .finish()
    }
}

impl Poller {
    /// Creates a poller reading from `source` and writing through `submitter`.
    pub fn new(
        source: Arc<dyn SensorSource>,
        submitter: Arc<dyn LedgerSubmitter>,
        config: &PollerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            source,
            controller: RetryController::new(
                submitter,
                config,
                metrics.clone(),
            ),
            poll_interval: config.poll_interval(),
            inter_record_delay: config.inter_record_delay(),
            metrics,
        }
    }

    /// Runs one cycle: reads a snapshot and relays its records in order.
    ///
    /// Fails only when the snapshot can not be read, record failures are
    /// part of the report. Once `shutdown` fires, the record in flight is
    /// finished and the rest of the snapshot is skipped.
    #[tracing::instrument(skip(self, shutdown))]
    pub async fn run_cycle(
        &self,
        cycle: u64,
        shutdown: &mut Shutdown,
    ) -> Result<PollCycleReport> {
        let started = Instant::now();
        self.metrics.cycles_total.inc();
        tracing::info!(
            "Polling devices at {}",
            chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        );
        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.metrics.cycles_aborted.inc();
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::Sync,
                    %cycle,
                    aborted = true,
                    error = %e,
                );
                return Err(e);
            }
        };

        let mut report = PollCycleReport::new(cycle);
        report.seen = snapshot.len();
        if snapshot.is_empty() {
            tracing::warn!("No devices found in the source");
        }
        for (index, (device_id, entry)) in snapshot.iter().enumerate() {
            if shutdown.is_shutdown() {
                report.skipped = report.seen - index;
                tracing::warn!(
                    "Shutdown requested, skipping the remaining {} device(s)",
                    report.skipped
                );
                break;
            }
            let outcome = match entry {
                Ok(record) => self.controller.relay(record).await,
                Err(reason) => {
                    self.controller.reject(device_id, reason.clone())
                }
            };
            report.record(&outcome);
            // spaces out the writes, the next device waits for it too
            tokio::select! {
                _ = tokio::time::sleep(self.inter_record_delay) => {},
                _ = shutdown.recv() => {},
            }
        }

        report.elapsed = started.elapsed();
        self.metrics
            .last_cycle_duration
            .set(report.elapsed.as_secs_f64());
        tracing::info!("{}", report);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Sync,
            %cycle,
            seen = report.seen,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
        );
        Ok(report)
    }

    /// Runs a cycle right away and then one per poll interval, until
    /// `shutdown` fires.
    ///
    /// Cycles never overlap: a cycle that outlasts the interval delays the
    /// next one instead of queueing more.
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<()> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            "Polling every {:.1} seconds",
            self.poll_interval.as_secs_f64()
        );
        let mut cycle = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = interval.tick() => {},
            }
            cycle += 1;
            if let Err(e) = self.run_cycle(cycle, &mut shutdown).await {
                tracing::error!("Cycle #{} aborted: {}", cycle, e);
            }
            if shutdown.is_shutdown() {
                break;
            }
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            poller = "stopped",
            cycles = cycle,
        );
        tracing::warn!("Poller stopped after {} cycle(s)", cycle);
        Ok(())
    }
}
