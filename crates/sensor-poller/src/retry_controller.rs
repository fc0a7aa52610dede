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

use backoff::backoff::Backoff;
use krishi_relay_config::poller::{BackoffKind, PollerConfig};
use krishi_relay_types::{to_reading_args, SensorRecord};
use krishi_relay_utils::metric::Metrics;
use krishi_relay_utils::retry::{
    ExponentialWithMaxRetryCount, LinearWithMaxRetryCount,
};
use krishi_relay_utils::{probe, Error};
use krishi_tx_submitter::{AttemptOutcome, LedgerSubmitter, SubmissionAttempt};

/// Steps a record goes through within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmissionState {
    Pending,
    Submitting,
    RetryWait,
    Confirmed,
    Failed,
}

fn transition(device_id: &str, from: SubmissionState, to: SubmissionState) {
    tracing::trace!(%device_id, ?from, ?to, "submission state changed");
}

/// The configured backoff, bounded by the retry budget.
#[derive(Debug, Clone)]
enum RetryBackoff {
    Linear(LinearWithMaxRetryCount),
    Exponential(ExponentialWithMaxRetryCount),
}

impl Backoff for RetryBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        match self {
            Self::Linear(b) => b.next_backoff(),
            Self::Exponential(b) => b.next_backoff(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Linear(b) => b.reset(),
            Self::Exponential(b) => b.reset(),
        }
    }
}

/// Relays a single record with a bounded number of attempts.
///
/// The controller never requeues: a record that runs out of attempts is
/// failed for the cycle and comes back with the next snapshot.
#[derive(Clone)]
pub struct RetryController {
    submitter: Arc<dyn LedgerSubmitter>,
    max_retries: usize,
    base_delay: Duration,
    backoff: BackoffKind,
    skip_retry_on_rejection: bool,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("backoff", &self.backoff)
            .field("skip_retry_on_rejection", &self.skip_retry_on_rejection)
            .finish()
    }
}

impl RetryController {
    /// Creates a controller for `submitter` following the poller settings.
    pub fn new(
        submitter: Arc<dyn LedgerSubmitter>,
        config: &PollerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            submitter,
            max_retries: config.max_retries.max(1),
            base_delay: config.base_delay(),
            backoff: config.backoff,
            skip_retry_on_rejection: config.skip_retry_on_rejection,
            metrics,
        }
    }

    fn backoff(&self) -> RetryBackoff {
        // the first attempt is not a retry.
        let retries = self.max_retries - 1;
        match self.backoff {
            BackoffKind::Linear => RetryBackoff::Linear(
                LinearWithMaxRetryCount::new(self.base_delay, retries),
            ),
            BackoffKind::Exponential => RetryBackoff::Exponential(
                ExponentialWithMaxRetryCount::new(self.base_delay, retries),
            ),
        }
    }

    /// Fails a record that can not be turned into a transaction, without
    /// submitting anything.
    pub fn reject(&self, device_id: &str, reason: String) -> AttemptOutcome {
        let err = Error::InvalidRecord {
            device_id: device_id.to_string(),
            reason,
        };
        tracing::error!("{}", err);
        transition(
            device_id,
            SubmissionState::Pending,
            SubmissionState::Failed,
        );
        self.metrics.records_failed.inc();
        AttemptOutcome::Failed(err.to_string())
    }

    /// Transforms and submits `record`, retrying until it is confirmed or
    /// the attempts run out.
    ///
    /// Always returns a final outcome, errors never leave this function.
    #[tracing::instrument(skip_all, fields(device_id = %record.device_id))]
    pub async fn relay(&self, record: &SensorRecord) -> AttemptOutcome {
        let device_id = record.device_id.as_str();
        tracing::debug!(
            moisture = record.moisture,
            temperature = record.temperature,
            humidity = record.humidity,
            status = %record.status,
            timestamp = %record.timestamp_rfc3339(),
            "Raw reading",
        );

        let args = match to_reading_args(record) {
            Ok(args) => args,
            Err(e) => return self.reject(device_id, e.to_string()),
        };

        let max_retries = self.max_retries;
        let skip_retry_on_rejection = self.skip_retry_on_rejection;
        let mut upcoming = SubmissionAttempt::first(args);
        let task = || {
            let attempt = upcoming.clone();
            upcoming = attempt.next();
            let submitter = self.submitter.clone();
            async move {
                let from = if attempt.attempt_number == 1 {
                    SubmissionState::Pending
                } else {
                    SubmissionState::RetryWait
                };
                transition(
                    &attempt.device_id,
                    from,
                    SubmissionState::Submitting,
                );
                tracing::info!(
                    attempt = attempt.attempt_number,
                    "Submitting reading ({}/{})",
                    attempt.attempt_number,
                    max_retries,
                );
                submitter.submit(&attempt).await.map_err(|e| {
                    tracing::warn!(
                        attempt = attempt.attempt_number,
                        "Attempt {} failed: {}",
                        attempt.attempt_number,
                        e,
                    );
                    if skip_retry_on_rejection && e.is_permanent() {
                        backoff::Error::permanent(e)
                    } else {
                        backoff::Error::transient(e)
                    }
                })
            }
        };
        let metrics = self.metrics.clone();
        let notify = |_: Error, wait: Duration| {
            transition(
                device_id,
                SubmissionState::Submitting,
                SubmissionState::RetryWait,
            );
            metrics.submission_retries.inc();
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Retry,
                %device_id,
                wait_ms = wait.as_millis() as u64,
            );
            tracing::info!("Retrying in {:.1} seconds...", wait.as_secs_f64());
        };
        let result =
            backoff::future::retry_notify(self.backoff(), task, notify).await;

        match result {
            Ok(receipt) => {
                transition(
                    device_id,
                    SubmissionState::Submitting,
                    SubmissionState::Confirmed,
                );
                self.metrics.records_succeeded.inc();
                tracing::info!(
                    tx_hash = ?receipt.tx_hash,
                    nonce = %receipt.nonce,
                    "Reading relayed",
                );
                AttemptOutcome::Confirmed(receipt)
            }
            Err(e) => {
                transition(
                    device_id,
                    SubmissionState::Submitting,
                    SubmissionState::Failed,
                );
                self.metrics.records_failed.inc();
                tracing::error!(
                    "Giving up on {} for this cycle: {}",
                    device_id,
                    e,
                );
                AttemptOutcome::Failed(e.to_string())
            }
        }
    }
}
