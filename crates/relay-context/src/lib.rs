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
//! Runtime context shared by every task of the sensor relay.

use std::sync::Arc;
use std::time::Duration;

use ethers::prelude::*;
use ethers::providers::RetryClientBuilder;
use tokio::sync::broadcast;

use krishi_relay_config::SensorRelayConfig;
use krishi_relay_utils::metric::Metrics;
use krishi_relay_utils::{EthersClient, SignerClient};

/// Rate limit aware retry policy for JSON-RPC requests.
pub mod ethers_retry_policy;

use ethers_retry_policy::RelayHttpRetryPolicy;

/// RelayerContext contains Relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: SensorRelayConfig,
    /// Broadcasts a shutdown signal to all active tasks.
    ///
    /// When a task is spawned, it is passed a broadcast receiver handle.
    /// When a graceful shutdown is initiated, a `()` value is sent via the
    /// broadcast::Sender. Each task receives it, reaches a safe terminal
    /// state, and completes.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the relayer
    pub metrics: Arc<Metrics>,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(config: SensorRelayConfig) -> krishi_relay_utils::Result<Self> {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// Returns a JSON-RPC provider for the destination chain.
    ///
    /// Rate limited requests are retried with [`RelayHttpRetryPolicy`].
    pub fn evm_provider(&self) -> krishi_relay_utils::Result<EthersClient> {
        let destination = &self.config.destination;
        let http = Http::new(destination.http_endpoint.as_url().clone());
        let policy = RelayHttpRetryPolicy::new().map_err(|_| {
            krishi_relay_utils::Error::Generic("invalid retry policy regex")
        })?;
        let client = RetryClientBuilder::default()
            .rate_limit_retries(destination.rpc_max_retries)
            .timeout_retries(3)
            .initial_backoff(Duration::from_millis(
                destination.rpc_initial_backoff_ms,
            ))
            .build(http, Box::new(policy));
        let provider = Provider::new(client).interval(Duration::from_millis(
            destination.confirmation_poll_interval_ms,
        ));
        Ok(provider)
    }

    /// Sets up and returns the wallet signing the destination transactions.
    pub fn evm_wallet(&self) -> krishi_relay_utils::Result<LocalWallet> {
        let destination = &self.config.destination;
        let private_key = destination
            .private_key
            .as_ref()
            .ok_or(krishi_relay_utils::Error::MissingSecrets)?;
        let wallet = LocalWallet::from_bytes(private_key.as_bytes())?
            .with_chain_id(destination.chain_id);
        Ok(wallet)
    }

    /// The provider wrapped with the relayer's wallet.
    pub fn signer_client(&self) -> krishi_relay_utils::Result<SignerClient> {
        let provider = Arc::new(self.evm_provider()?);
        let wallet = self.evm_wallet()?;
        Ok(SignerMiddleware::new(provider, wallet))
    }

    /// Address of the relayer's account on the destination chain.
    pub fn relayer_address(&self) -> krishi_relay_utils::Result<Address> {
        Ok(self.evm_wallet()?.address())
    }
}

/// Listens for the relayer shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the task
/// should shutdown.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }

    /// Returns `true` if the shutdown signal has been received, without
    /// waiting.
    ///
    /// A dropped sender counts as a shutdown.
    pub fn is_shutdown(&mut self) -> bool {
        use broadcast::error::TryRecvError;
        if !self.shutdown {
            self.shutdown =
                !matches!(self.notify.try_recv(), Err(TryRecvError::Empty));
        }
        self.shutdown
    }
}
