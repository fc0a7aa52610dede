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

//! # Relay Service Module 🕸️
//!
//! A module for starting the long-running tasks of the relay.
//!
//! ## Overview
//!
//! Services are tasks which the relay constantly runs throughout its
//! lifetime: the poll loop and, when a port is configured, the status API.

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::signal::unix::{self, Signal, SignalKind};
use tokio::task::JoinHandle;

use krishi_relay_config::source::SourceConfig;
use krishi_relay_context::RelayerContext;
use krishi_sensor_poller::Poller;
use krishi_source_backends::{FirebaseSource, SensorSource};
use krishi_tx_submitter::evm::EvmSubmitter;

use crate::routes::{handle_health, handle_metric_info, handle_relayer_info};

/// Setup and build the routes of the status API.
pub fn build_axum_services() -> Router<Arc<RelayerContext>> {
    Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_relayer_info))
        .route("/metrics", get(handle_metric_info))
}

/// Sets up the status server on `listener`.
///
/// Returns the bound address and the server future, which resolves once the
/// relay shuts down.
pub fn build_status_server(
    ctx: &RelayerContext,
    listener: TcpListener,
) -> crate::Result<(SocketAddr, impl Future<Output = crate::Result<()>>)> {
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .nest("/api/v1", build_axum_services())
        .with_state(Arc::new(ctx.clone()));
    let mut shutdown_signal = ctx.shutdown_signal();
    let server = axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal.recv().await;
        });
    Ok((addr, async move { server.await.map_err(crate::Error::from) }))
}

/// Binds the status server on every interface at `port`.
pub fn bind_status_server(
    ctx: &RelayerContext,
    port: u16,
) -> crate::Result<(SocketAddr, impl Future<Output = crate::Result<()>>)> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))?;
    build_status_server(ctx, listener)
}

/// Builds the Firebase reader described by `config`.
pub fn build_source(config: &SourceConfig) -> FirebaseSource {
    let database_url = config.database_url.as_url().clone();
    let timeout = Duration::from_millis(config.request_timeout_ms);
    match config.auth_token.clone() {
        Some(token) => FirebaseSource::builder()
            .database_url(database_url)
            .collection(config.collection.as_str())
            .auth_token(token)
            .timeout(timeout)
            .build(),
        None => FirebaseSource::builder()
            .database_url(database_url)
            .collection(config.collection.as_str())
            .timeout(timeout)
            .build(),
    }
}

/// Checks both ends of the relay and starts the poll loop in the background.
///
/// Fails before anything is spawned when the RPC endpoint serves another
/// chain or either end can not be reached.
///
/// # Arguments
///
/// * `ctx` - RelayContext reference that holds the configuration
pub async fn ignite(
    ctx: &RelayerContext,
) -> crate::Result<JoinHandle<crate::Result<()>>> {
    tracing::debug!(
        "Relay configuration: {}",
        serde_json::to_string_pretty(&ctx.config)?
    );
    let destination = &ctx.config.destination;

    let submitter = EvmSubmitter::new(ctx)?;
    submitter.ensure_chain_id().await?;
    tracing::info!(
        "Writing to {} on {} (chain {}) as {:?}",
        destination.contract_address,
        destination.name,
        destination.chain_id,
        submitter.relayer_address(),
    );

    let source = build_source(&ctx.config.source);
    source.health_check().await?;
    tracing::info!(
        "Reading {}/{}",
        ctx.config.source.database_url,
        ctx.config.source.collection,
    );

    let poller = Poller::new(
        Arc::new(source),
        Arc::new(submitter),
        &ctx.config.poller,
        ctx.metrics.clone(),
    );
    let shutdown = ctx.shutdown_signal();
    tracing::debug!("Starting the poller");
    Ok(tokio::spawn(async move { poller.run(shutdown).await }))
}

/// The process signals that stop the relay.
///
/// Registering replaces the default disposition, so a signal that arrives
/// while the relay is still starting is held until [`ShutdownSignals::recv`]
/// is polled instead of killing the process.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
}

impl ShutdownSignals {
    /// Installs the SIGINT, SIGTERM and SIGQUIT handlers.
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: unix::signal(SignalKind::interrupt())?,
            terminate: unix::signal(SignalKind::terminate())?,
            quit: unix::signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next signal and logs which one it was.
    pub async fn recv(&mut self) -> SignalKind {
        tokio::select! {
            _ = self.interrupt.recv() => {
                tracing::warn!("Interrupted (Ctrl+C) ...");
                SignalKind::interrupt()
            },
            _ = self.terminate.recv() => {
                tracing::warn!("Got Terminate signal ...");
                SignalKind::terminate()
            },
            _ = self.quit.recv() => {
                tracing::warn!("Quitting ...");
                SignalKind::quit()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Json;
    use serde_json::{json, Value};

    use krishi_relay_config::SensorRelayConfig;
    use krishi_relay_utils::Error;

    use super::*;

    const HARDHAT_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        addr
    }

    /// A JSON-RPC endpoint answering `eth_chainId` and a database whose
    /// sensor collection answers with `status` and `body`.
    fn backend(chain_id: u64, status: StatusCode, body: &'static str) -> SocketAddr {
        let app = Router::new()
            .route(
                "/",
                post(move |Json(request): Json<Value>| async move {
                    Json(json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": format!("{chain_id:#x}"),
                    }))
                }),
            )
            .route("/sensor_data.json", get(move || async move { (status, body) }));
        serve(app)
    }

    fn config(addr: SocketAddr) -> SensorRelayConfig {
        serde_json::from_value(json!({
            "source": { "database-url": format!("http://{addr}") },
            "destination": {
                "http-endpoint": format!("http://{addr}"),
                "chain-id": 31337,
                "contract-address": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                "private-key": HARDHAT_KEY,
                "rpc-initial-backoff-ms": 1
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn ignite_refuses_another_chain() {
        let addr = backend(1, StatusCode::OK, "null");
        let ctx = RelayerContext::new(config(addr)).unwrap();
        let err = ignite(&ctx).await.unwrap_err();
        assert!(
            matches!(err, Error::ChainIdMismatch { expected: 31337, actual: 1 }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn ignite_fails_when_the_source_is_down() {
        let addr = backend(31337, StatusCode::UNAUTHORIZED, "Permission denied");
        let ctx = RelayerContext::new(config(addr)).unwrap();
        let err = ignite(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }), "{err}");
    }

    #[tokio::test]
    async fn ignited_poller_stops_on_shutdown() {
        let addr = backend(31337, StatusCode::OK, "null");
        let ctx = RelayerContext::new(config(addr)).unwrap();
        let handle = ignite(&ctx).await.unwrap();
        ctx.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[test]
    fn source_follows_the_config() {
        let mut config = config(SocketAddr::from(([127, 0, 0, 1], 9000)));
        config.source.collection = "farm-1/sensors".into();
        let source = build_source(&config.source);
        let debug = format!("{source:?}");
        assert!(debug.contains("farm-1/sensors"));
    }

    #[tokio::test]
    async fn status_api_serves_health_info_and_metrics() {
        let ctx = RelayerContext::new(config(SocketAddr::from((
            [127, 0, 0, 1],
            9000,
        ))))
        .unwrap();
        ctx.metrics.cycles_total.inc();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (addr, server) = build_status_server(&ctx, listener).unwrap();
        let server = tokio::spawn(server);
        let base = format!("http://{addr}/api/v1");
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "up");

        let info = client
            .get(format!("{base}/info"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let info_json: Value = serde_json::from_str(&info).unwrap();
        assert_eq!(
            info_json["relayerAddress"],
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(info_json["destination"]["chainId"], 31337);
        assert!(!info.contains(&HARDHAT_KEY[2..]));

        let metrics = client
            .get(format!("{base}/metrics"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("relay_cycles_total 1"));

        ctx.shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn signals_sent_before_waiting_are_held() {
        let mut signals = ShutdownSignals::register().unwrap();
        // delivered while nothing is waiting yet, as during startup
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let kind = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
        assert_eq!(kind, SignalKind::terminate());
        assert!(logs_contain("Got Terminate signal"));
    }
}
