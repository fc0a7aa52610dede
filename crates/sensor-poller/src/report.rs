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

use std::fmt;
use std::time::Duration;

use krishi_tx_submitter::AttemptOutcome;

/// What happened during one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollCycleReport {
    /// Sequence number of the cycle, starting at 1.
    pub cycle: u64,
    /// Records in the snapshot.
    pub seen: usize,
    /// Records confirmed on chain.
    pub succeeded: usize,
    /// Records that failed every attempt.
    pub failed: usize,
    /// Records left alone because a shutdown was requested.
    pub skipped: usize,
    /// Wall time of the whole cycle, delays included.
    pub elapsed: Duration,
}

impl PollCycleReport {
    /// An empty report for `cycle`.
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Default::default()
        }
    }

    /// Counts the final outcome of one record.
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Confirmed(_) => self.succeeded += 1,
            AttemptOutcome::Failed(_) => self.failed += 1,
            AttemptOutcome::Pending => {}
        }
    }
}

impl fmt::Display for PollCycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle #{} completed in {:.2}s: seen={}, succeeded={}, failed={}",
            self.cycle,
            self.elapsed.as_secs_f64(),
            self.seen,
            self.succeeded,
            self.failed,
        )?;
        if self.skipped > 0 {
            write!(f, ", skipped={}", self.skipped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_log_format() {
        let mut report = PollCycleReport::new(3);
        report.seen = 2;
        report.record(&AttemptOutcome::Failed("nonce too low".into()));
        report.record(&AttemptOutcome::Pending);
        report.elapsed = Duration::from_millis(1234);
        assert_eq!(
            report.to_string(),
            "cycle #3 completed in 1.23s: seen=2, succeeded=0, failed=1"
        );
        report.skipped = 1;
        assert!(report.to_string().ends_with(", skipped=1"));
    }
}
