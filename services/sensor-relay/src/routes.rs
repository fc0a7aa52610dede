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

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ethers::types::Address;
use serde::Serialize;

use krishi_relay_config::SensorRelayConfig;
use krishi_relay_context::RelayerContext;
use krishi_relay_utils::HandlerError;

/// Health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Answers as long as the process is up.
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Relay information response, the config without its secrets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerInformationResponse {
    #[serde(flatten)]
    config: SensorRelayConfig,
    relayer_address: Address,
}

/// Handles relay configuration requests
///
/// Returns a Result with the `RelayerInformationResponse` on success
///
/// # Arguments
///
/// * `ctx` - RelayContext reference that holds the configuration
pub async fn handle_relayer_info(
    State(ctx): State<Arc<RelayerContext>>,
) -> Result<Json<RelayerInformationResponse>, HandlerError> {
    let relayer_address = ctx.relayer_address()?;
    Ok(Json(RelayerInformationResponse {
        config: ctx.config.clone(),
        relayer_address,
    }))
}

/// Handles relay metric requests, in the Prometheus text format.
pub async fn handle_metric_info(
    State(ctx): State<Arc<RelayerContext>>,
) -> Result<String, HandlerError> {
    ctx.metrics.gather_metrics().map_err(|e| {
        HandlerError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}
