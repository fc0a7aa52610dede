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

//! KrishiSetu Sensor Relay Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use krishi_relay_config::cli::{load_config, setup_logger, Opts};
use krishi_relay_context::RelayerContext;
use krishi_relay_utils::probe;
use krishi_sensor_relay::service::{self, ShutdownSignals};

/// The main entry point for the relay.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose, args.json_logs)?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }
    tracing::info!(
        "🌱 KrishiSetu Sensor Relay v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;

    // The RelayerContext takes a configuration, and populates objects that are needed
    // throughout the lifetime of the relay, such as the wallet, the provider and
    // the metrics.
    let ctx = RelayerContext::new(config)?;

    // before startup, so early signals are held rather than fatal.
    let mut signals = ShutdownSignals::register()?;

    let server_handle = match ctx.config.port {
        Some(port) => {
            let (addr, server) = service::bind_status_server(&ctx, port)?;
            tracing::info!("Starting the status server on {}", addr);
            Some(tokio::spawn(server))
        }
        None => None,
    };

    // checks both ends and starts the poll loop on a background task.
    let mut poller_handle = service::ignite(&ctx).await?;
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        started = true
    );

    tokio::select! {
        _ = signals.recv() => {},
        res = &mut poller_handle => {
            ctx.shutdown();
            return match res? {
                Ok(()) => Err(anyhow::anyhow!("poller stopped unexpectedly")),
                Err(e) => Err(e.into()),
            };
        },
    }

    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        shutdown = true
    );
    tracing::warn!("Shutting down...");
    // send shutdown signal to all of the application.
    ctx.shutdown();
    // the record in flight is finished before the poller stops.
    poller_handle.await??;
    if let Some(handle) = server_handle {
        handle.await??;
    }
    tracing::info!("Clean Exit ..");
    Ok(())
}
