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
//! Shared building blocks for the sensor relay: the error type, probe
//! targets, backoff policies and process metrics.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider, RetryClient};
use ethers::signers::LocalWallet;

/// Clickable terminal links for transaction hashes.
pub mod clickable_link;
/// Metrics functionality
pub mod metric;
/// A module used for debugging relayer lifecycle, sync state, or other relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;

/// JSON-RPC provider with a retry strategy for rate limited endpoints.
pub type EthersClient = Provider<RetryClient<Http>>;

/// The provider wrapped with the relayer's signing wallet.
pub type SignerClient = SignerMiddleware<Arc<EthersClient>, LocalWallet>;

/// An enum of all possible errors that could be encountered during the execution of the
/// sensor relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// HTTP Error
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    /// Reqwest error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// Error in Http Provider (ethers client).
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Smart contract error.
    #[error(transparent)]
    EthersContractCall(#[from] ethers::contract::ContractError<SignerClient>),
    /// Ether wallet errors.
    #[error(transparent)]
    EtherWalletError(#[from] ethers::signers::WalletError),
    /// Prometheus registry error.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// The configuration is readable but does not make sense.
    #[error("Invalid config: {}", _0)]
    InvalidConfig(String),
    /// Missing Secrets in the config, the private key or a source credential.
    #[error("Missing required private-key in the config")]
    MissingSecrets,
    /// The RPC endpoint reports another chain than the one configured.
    #[error("Chain id mismatch: configured {expected} but endpoint reports {actual}")]
    ChainIdMismatch {
        /// The configured chain id.
        expected: u64,
        /// The chain id reported by the endpoint.
        actual: u64,
    },
    /// The source store could not deliver a snapshot.
    #[error("Source unavailable: {reason}")]
    SourceUnavailable {
        /// What went wrong while reading.
        reason: String,
    },
    /// A record can not be converted into contract arguments.
    #[error("Invalid record for device {device_id}: {reason}")]
    InvalidRecord {
        /// The device the record belongs to.
        device_id: String,
        /// Why the record was refused.
        reason: String,
    },
    /// The destination refused the write, retrying the same call will not help.
    #[error("Submission rejected for device {device_id}: {reason}")]
    SubmissionRejected {
        /// The device the submission belongs to.
        device_id: String,
        /// The revert reason or encoding failure.
        reason: String,
    },
    /// A submitted transaction disappeared before it was mined.
    #[error("Tx {tx_hash} dropped before confirmation")]
    TxDropped {
        /// Hash of the dropped transaction.
        tx_hash: String,
    },
}

impl Error {
    /// Returns `true` when repeating the same operation can not succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Error::SubmissionRejected { .. } | Error::InvalidRecord { .. }
        )
    }
}

/// A type alias for the result for the sensor relay, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for HandlerError {
    fn from(value: Error) -> Self {
        HandlerError(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}

/// Error type for HTTP handlers
pub struct HandlerError(
    /// HTTP status code for response
    pub StatusCode,
    /// Response message
    pub String,
);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_and_invalid_records_are_permanent() {
        let rejected = Error::SubmissionRejected {
            device_id: "deviceA".into(),
            reason: "execution reverted".into(),
        };
        let invalid = Error::InvalidRecord {
            device_id: "deviceA".into(),
            reason: "temperature is NaN".into(),
        };
        let dropped = Error::TxDropped {
            tx_hash: "0x01".into(),
        };
        let source = Error::SourceUnavailable {
            reason: "timeout".into(),
        };
        assert!(rejected.is_permanent());
        assert!(invalid.is_permanent());
        assert!(!dropped.is_permanent());
        assert!(!source.is_permanent());
    }
}
