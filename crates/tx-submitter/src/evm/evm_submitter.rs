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

use ethers::contract::ContractError;
use ethers::providers::Middleware;
use ethers::types::{Address, BlockNumber, TransactionReceipt, U256};
use tokio::sync::Mutex;
use url::Url;

use krishi_relay_context::RelayerContext;
use krishi_relay_utils::clickable_link::TxLink;
use krishi_relay_utils::{probe, Error, Result, SignerClient};

use super::KrishiSetuContract;
use crate::{SubmissionAttempt, SubmissionReceipt};

/// Writes readings to the KrishiSetu contract of an EVM chain.
///
/// Every submission fetches a fresh `pending` nonce, sends the call with a
/// fixed gas limit and waits for its confirmation, all while holding the
/// submitter lock.
pub struct EvmSubmitter {
    client: Arc<SignerClient>,
    contract: KrishiSetuContract<SignerClient>,
    chain_id: u64,
    gas_limit: U256,
    block_confirmations: usize,
    confirmation_interval: Duration,
    explorer: Option<Url>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for EvmSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSubmitter")
            .field("chain_id", &self.chain_id)
            .field("contract", &self.contract.address())
            .field("relayer", &self.client.address())
            .finish()
    }
}

impl EvmSubmitter {
    /// Creates the submitter for the configured destination.
    pub fn new(ctx: &RelayerContext) -> Result<Self> {
        let destination = &ctx.config.destination;
        let client = Arc::new(ctx.signer_client()?);
        let contract = KrishiSetuContract::new(
            destination.contract_address,
            client.clone(),
        );
        Ok(Self {
            client,
            contract,
            chain_id: destination.chain_id,
            gas_limit: destination.resource_limit.into(),
            block_confirmations: destination.block_confirmations,
            confirmation_interval: Duration::from_millis(
                destination.confirmation_poll_interval_ms,
            ),
            explorer: destination.explorer.clone(),
            lock: Mutex::new(()),
        })
    }

    /// The account paying for the transactions.
    pub fn relayer_address(&self) -> Address {
        self.client.address()
    }

    /// Makes sure the endpoint serves the configured chain.
    pub async fn ensure_chain_id(&self) -> Result<()> {
        let actual = self.client.inner().get_chainid().await?.as_u64();
        if actual != self.chain_id {
            return Err(Error::ChainIdMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    fn link<'a>(&self, tx_hash: &'a str) -> TxLink<'a> {
        TxLink::new(tx_hash, self.explorer.as_ref())
    }

    fn finalize_receipt(
        &self,
        device_id: &str,
        nonce: U256,
        receipt: TransactionReceipt,
    ) -> Result<SubmissionReceipt> {
        let tx_hash_string = format!("0x{:x}", receipt.transaction_hash);
        let block_number = receipt.block_number.map(|n| n.as_u64());
        if receipt.status.map_or(false, |v| v.is_zero()) {
            tracing::warn!("Tx {} Failed", self.link(&tx_hash_string));
            return Err(Error::SubmissionRejected {
                device_id: device_id.to_string(),
                reason: format!(
                    "tx {tx_hash_string} reverted in block {}",
                    block_number.unwrap_or_default()
                ),
            });
        }
        tracing::info!("Tx {} Finalized", self.link(&tx_hash_string));
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxSubmitter,
            ty = "EVM",
            chain_id = %self.chain_id,
            finalized = true,
            %device_id,
            %nonce,
            tx_hash = %tx_hash_string,
        );
        Ok(SubmissionReceipt {
            tx_hash: receipt.transaction_hash,
            nonce,
            block_number,
        })
    }
}

/// Fixed-point readings must fit the contract's unsigned slots.
fn uint_arg(device_id: &str, field: &str, value: i64) -> Result<U256> {
    u64::try_from(value).map(U256::from).map_err(|_| {
        Error::SubmissionRejected {
            device_id: device_id.to_string(),
            reason: format!(
                "{field} {value} can not be encoded as uint256"
            ),
        }
    })
}

/// Reverts and encoding problems are final, everything else may pass on a
/// later attempt.
fn classify_contract_error(
    device_id: &str,
    err: ContractError<SignerClient>,
) -> Error {
    let permanent = err.is_revert()
        || matches!(
            err,
            ContractError::AbiError(_)
                | ContractError::DecodingError(_)
                | ContractError::DetokenizationError(_)
                | ContractError::ContractNotDeployed
        );
    if !permanent {
        return Error::EthersContractCall(err);
    }
    let reason = err
        .decode_revert::<String>()
        .map(|reason| format!("execution reverted: {reason}"))
        .unwrap_or_else(|| err.to_string());
    Error::SubmissionRejected {
        device_id: device_id.to_string(),
        reason,
    }
}

#[async_trait::async_trait]
impl crate::LedgerSubmitter for EvmSubmitter {
    #[tracing::instrument(
        skip_all,
        fields(device_id = %attempt.device_id, attempt = attempt.attempt_number)
    )]
    async fn submit(
        &self,
        attempt: &SubmissionAttempt,
    ) -> Result<SubmissionReceipt> {
        let device_id = attempt.device_id.as_str();
        let args = &attempt.args;
        let temperature = uint_arg(device_id, "temperature", args.temperature)?;
        let humidity = uint_arg(device_id, "humidity", args.humidity)?;

        // held until the receipt is in, so nonces are never shared.
        let _guard = self.lock.lock().await;
        let relayer = self.client.address();
        let nonce = self
            .client
            .inner()
            .get_transaction_count(relayer, Some(BlockNumber::Pending.into()))
            .await?;
        tracing::debug!(%nonce, "Using pending nonce of {:?}", relayer);

        let call = self
            .contract
            .record_sensor_data(
                device_id.to_string(),
                U256::from(args.moisture),
                temperature,
                humidity,
                args.status.clone(),
                args.local_date.clone(),
                args.local_time.clone(),
                U256::from(args.timestamp),
            )
            .gas(self.gas_limit)
            .nonce(nonce);

        let pending = match call.send().await {
            Ok(pending) => pending,
            Err(e) => {
                let err = classify_contract_error(device_id, e);
                tracing::error!("Error while sending tx for {}: {}", device_id, err);
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxSubmitter,
                    ty = "EVM",
                    chain_id = %self.chain_id,
                    errored = true,
                    permanent = err.is_permanent(),
                    %device_id,
                    %nonce,
                    error = %err,
                );
                return Err(err);
            }
        };
        let tx_hash_string = format!("0x{:x}", *pending);
        tracing::info!("Tx {} is submitted and pending!", self.link(&tx_hash_string));
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxSubmitter,
            ty = "EVM",
            chain_id = %self.chain_id,
            pending = true,
            %device_id,
            %nonce,
            tx_hash = %tx_hash_string,
        );

        let receipt = pending
            .confirmations(self.block_confirmations)
            .interval(self.confirmation_interval)
            .await;
        match receipt {
            Ok(Some(receipt)) => self.finalize_receipt(device_id, nonce, receipt),
            Ok(None) => {
                tracing::warn!(
                    "Tx {} Dropped from Mempool!!",
                    self.link(&tx_hash_string)
                );
                Err(Error::TxDropped {
                    tx_hash: tx_hash_string,
                })
            }
            Err(e) => {
                tracing::error!(
                    "Tx {} Errored: {}",
                    self.link(&tx_hash_string),
                    e
                );
                Err(e.into())
            }
        }
    }
}
