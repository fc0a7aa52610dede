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

#![warn(missing_docs)]
//! Writes sensor readings to the ledger.
//!
//! A [`LedgerSubmitter`] performs exactly one write per call and only
//! returns once the write is confirmed, retrying is left to the caller.

use ethers::types::{H256, U256};
use krishi_relay_types::SensorReadingArgs;
use krishi_relay_utils::Result;

/// EVM submitter
#[cfg(feature = "evm")]
pub mod evm;

/// One try at writing the reading of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionAttempt {
    /// The device the reading belongs to.
    pub device_id: String,
    /// The contract arguments.
    pub args: SensorReadingArgs,
    /// 1-based attempt number within the current cycle.
    pub attempt_number: usize,
}

impl SubmissionAttempt {
    /// The first attempt for `args`.
    pub fn first(args: SensorReadingArgs) -> Self {
        Self {
            device_id: args.device_id.clone(),
            args,
            attempt_number: 1,
        }
    }

    /// The same arguments, one attempt later.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            attempt_number: self.attempt_number + 1,
            ..self.clone()
        }
    }
}

/// Proof that a write made it into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Hash of the confirmed transaction.
    pub tx_hash: H256,
    /// The nonce the transaction consumed.
    pub nonce: U256,
    /// The block that included the transaction.
    pub block_number: Option<u64>,
}

/// Where an attempt stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Not yet submitted, or waiting for its confirmation.
    Pending,
    /// Confirmed on chain.
    Confirmed(SubmissionReceipt),
    /// The attempt failed.
    Failed(String),
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed(receipt) => {
                write!(f, "confirmed in {:?}", receipt.tx_hash)
            }
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A trait for writing readings to the ledger.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait LedgerSubmitter: Send + Sync {
    /// Submits the attempt and waits for its confirmation.
    ///
    /// Implementations never have two writes in flight at once.
    async fn submit(
        &self,
        attempt: &SubmissionAttempt,
    ) -> Result<SubmissionReceipt>;
}
