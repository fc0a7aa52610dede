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

use krishi_relay_types::{env_url::EnvUrl, secret::SecretString};

use super::*;

/// Realtime database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "kebab-case"))]
pub struct SourceConfig {
    /// Root URL of the database, e.g. `https://<project>.firebaseio.com`.
    pub database_url: EnvUrl,
    /// Path of the collection holding one reading per device.
    ///
    /// default to `sensor_data`
    #[serde(default = "defaults::collection")]
    pub collection: String,
    /// Database secret or ID token, sent as the `auth` query parameter.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<SecretString>,
    /// Request timeout in milliseconds.
    ///
    /// default to 10_000
    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}
