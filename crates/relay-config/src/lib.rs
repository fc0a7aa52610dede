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

//! # Sensor Relay Configuration Module
//!
//! A module for configuring the sensor relay.
//!
//! ## Overview
//!
//! The configuration is read from every `.toml`/`.json` file of a config
//! directory and then overridden by a fixed set of environment variables.
//! Sections:
//! * `port`: optional port of the status HTTP server, disabled when unset.
//! * `poller`: cycle interval, retry budget and backoff. See [`poller::PollerConfig`].
//! * `source`: the realtime database holding the latest readings. See [`source::SourceConfig`].
//! * `destination`: chain, contract and signing key. See [`destination::DestinationConfig`].

/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Default values of optional settings
pub mod defaults;
/// Destination chain configuration
pub mod destination;
/// Poll loop and retry configuration
pub mod poller;
/// Source store configuration
pub mod source;
/// Utils for processing configuration
pub mod utils;

use destination::DestinationConfig;
use poller::PollerConfig;
use serde::{Deserialize, Serialize};
use source::SourceConfig;

/// SensorRelayConfig is the configuration for the sensor relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "kebab-case"))]
pub struct SensorRelayConfig {
    /// Status HTTP server port.
    ///
    /// The server is not started when unset.
    #[serde(default)]
    pub port: Option<u16>,
    /// Poll loop configuration.
    #[serde(default)]
    pub poller: PollerConfig,
    /// Where the readings are read from.
    pub source: SourceConfig,
    /// Where the readings are written to.
    pub destination: DestinationConfig,
}

impl SensorRelayConfig {
    /// Makes sure that the config is valid, by going
    /// through the whole config and doing some basic checks.
    pub fn verify(&self) -> krishi_relay_utils::Result<()> {
        use krishi_relay_utils::Error;
        if self.poller.max_retries == 0 {
            return Err(Error::InvalidConfig(
                "poller.max-retries must be at least 1".into(),
            ));
        }
        if self.poller.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "poller.poll-interval-ms must be greater than 0".into(),
            ));
        }
        if self.source.collection.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "source.collection must not be empty".into(),
            ));
        }
        if self.destination.block_confirmations == 0 {
            return Err(Error::InvalidConfig(
                "destination.block-confirmations must be at least 1".into(),
            ));
        }
        self.destination
            .private_key
            .as_ref()
            .map(|_| ())
            .ok_or(Error::MissingSecrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_config_files_are_correct() {
        // Every directory under `config/` at the workspace root must hold a
        // loadable configuration, given its `.env.example`.
        let config_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config");
        let config_dirs = std::fs::read_dir(&config_dir)
            .expect("Failed to read config directory")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();
        assert!(
            !config_dirs.is_empty(),
            "No config directories found in the config directory"
        );
        for config_subdir in config_dirs {
            let _ = dotenv::from_path(config_subdir.join(".env.example"));
            match utils::load(&config_subdir) {
                Ok(config) => config.verify().unwrap_or_else(|e| {
                    panic!("Invalid config in {config_subdir:?}: {e}")
                }),
                Err(e) => panic!("Failed to parse config file in directory: {config_subdir:?} with error: {e}"),
            }
        }
    }
}
