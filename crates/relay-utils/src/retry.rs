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

//! Retry logic for async calls

use std::time::Duration;

use backoff::backoff::Backoff;

/// Linear with Max Retry Count is a backoff policy which waits `interval * k`
/// after the k-th failure, until it exceeds the maximum retry count.
#[derive(Debug, Clone)]
pub struct LinearWithMaxRetryCount {
    interval: Duration,
    max_retry_count: usize,
    count: usize,
}

impl LinearWithMaxRetryCount {
    /// Creates a new Linear backoff with `interval` and `max_retry_count`.
    /// `interval` is the base step added for every retry, and `max_retry_count` is the maximum
    /// number of retries, after which we return `None` to indicate that we should stop retrying.
    pub fn new(interval: Duration, max_retry_count: usize) -> Self {
        Self {
            interval,
            max_retry_count,
            count: 0,
        }
    }
}

impl Backoff for LinearWithMaxRetryCount {
    fn next_backoff(&mut self) -> Option<Duration> {
        (self.count < self.max_retry_count).then(|| {
            self.count += 1;
            self.interval.saturating_mul(self.count as u32)
        })
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Exponential with Max Retry Count is a backoff policy which waits
/// `interval * 2^(k-1)` after the k-th failure, until it exceeds the maximum retry count.
#[derive(Debug, Clone)]
pub struct ExponentialWithMaxRetryCount {
    interval: Duration,
    max_retry_count: usize,
    count: usize,
}

impl ExponentialWithMaxRetryCount {
    /// Creates a new Exponential backoff with `interval` as the first delay and
    /// `max_retry_count` as the maximum number of retries.
    pub fn new(interval: Duration, max_retry_count: usize) -> Self {
        Self {
            interval,
            max_retry_count,
            count: 0,
        }
    }
}

impl Backoff for ExponentialWithMaxRetryCount {
    fn next_backoff(&mut self) -> Option<Duration> {
        (self.count < self.max_retry_count).then(|| {
            let factor = 1u32.checked_shl(self.count as u32).unwrap_or(u32::MAX);
            self.count += 1;
            self.interval.saturating_mul(factor)
        })
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}
