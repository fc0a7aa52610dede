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

use ethers::types::Address;
use krishi_relay_types::{env_url::EnvUrl, private_key::PrivateKey};

use super::*;

/// DestinationConfig is the configuration for the EVM chain holding the
/// KrishiSetu contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "kebab-case"))]
pub struct DestinationConfig {
    /// Human-readable name of the chain, used in logs.
    #[serde(default)]
    pub name: String,
    /// Http(s) JSON-RPC endpoint.
    #[serde(skip_serializing)]
    pub http_endpoint: EnvUrl,
    /// chain specific id (output of chainId opcode on EVM networks)
    pub chain_id: u64,
    /// Address of the KrishiSetu contract.
    pub contract_address: Address,
    /// The Private Key of the relaying account
    /// the format is more dynamic here:
    /// 1. if it starts with '0x' then this would be raw (64 bytes) hex encoded
    ///    private key.
    /// 2. if it starts with '$' then it would be considered as an Enviroment variable
    ///    of a hex-encoded private key.
    ///   Example: $PRIVATE_KEY
    #[serde(default, skip_serializing)]
    pub private_key: Option<PrivateKey>,
    /// Gas limit attached to every transaction.
    ///
    /// default to 1_000_000
    #[serde(default = "defaults::resource_limit")]
    pub resource_limit: u64,
    /// Blocks to wait for before a transaction counts as confirmed.
    ///
    /// default to 1
    #[serde(default = "defaults::block_confirmations")]
    pub block_confirmations: usize,
    /// How often a pending transaction is polled, in milliseconds.
    ///
    /// default to 1_000
    #[serde(default = "defaults::confirmation_poll_interval_ms")]
    pub confirmation_poll_interval_ms: u64,
    /// Block Explorer for this chain.
    ///
    /// Optional, and only used for printing a clickable links
    /// for transactions.
    #[serde(default, skip_serializing)]
    pub explorer: Option<url::Url>,
    /// Rate limited JSON-RPC requests are retried this many times.
    ///
    /// default to 10
    #[serde(default = "defaults::rpc_max_retries")]
    pub rpc_max_retries: u32,
    /// First backoff of a rate limited JSON-RPC request, in milliseconds.
    ///
    /// default to 1_000
    #[serde(default = "defaults::rpc_initial_backoff_ms")]
    pub rpc_initial_backoff_ms: u64,
}
