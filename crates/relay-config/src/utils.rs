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

use config::{Config, File};
use std::path::{Path, PathBuf};

use super::*;

/// Environment variables that override a single config key.
///
/// They are the names the relay has always been deployed with, so they are
/// read as-is, without any prefix.
pub const ENV_OVERRIDES: [(&str, &str); 9] = [
    ("POLL_INTERVAL_MS", "poller.poll-interval-ms"),
    ("MAX_RETRIES", "poller.max-retries"),
    ("FIREBASE_DB_URL", "source.database-url"),
    ("FIREBASE_AUTH_TOKEN", "source.auth-token"),
    ("RPC_URL", "destination.http-endpoint"),
    ("CHAIN_ID", "destination.chain-id"),
    ("DESTINATION_ADDRESS", "destination.contract-address"),
    ("PRIVATE_KEY", "destination.private-key"),
    ("RESOURCE_LIMIT", "destination.resource-limit"),
];

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(
    base_dir: P,
) -> krishi_relay_utils::Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(krishi_relay_utils::Error::from))
        .collect()
}

/// Try to parse the [`SensorRelayConfig`] from the given config file(s),
/// overridden by the process environment.
pub fn parse_from_files(
    files: &[PathBuf],
) -> krishi_relay_utils::Result<SensorRelayConfig> {
    parse_from_files_with_env(files, |name| std::env::var(name).ok())
}

/// Same as [`parse_from_files`], but the environment is read through `env`.
///
/// Only the names listed in [`ENV_OVERRIDES`] are looked up. Empty values
/// are ignored.
pub fn parse_from_files_with_env<F>(
    files: &[PathBuf],
    env: F,
) -> krishi_relay_utils::Result<SensorRelayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        let ext = config_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    for (name, key) in ENV_OVERRIDES {
        let Some(value) = env(name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        tracing::trace!("Overriding {} from ${}", key, name);
        builder = builder.set_override(key, value.trim().to_string())?;
    }

    let cfg = builder.build()?;
    let config: Result<
        SensorRelayConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Load the configuration files and
///
/// Returns `Ok(SensorRelayConfig)` on success, or `Err(Error)` on failure.
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> krishi_relay_utils::Result<SensorRelayConfig> {
    parse_from_files(&search_config_files(path)?)
}

/// The postloading_process exists to validate configuration and standardize
/// the format of the configuration
pub fn postloading_process(
    mut config: SensorRelayConfig,
) -> krishi_relay_utils::Result<SensorRelayConfig> {
    tracing::trace!("Checking configration sanity ...");

    config.source.collection =
        config.source.collection.trim_matches('/').to_string();
    if config.destination.name.is_empty() {
        config.destination.name = config.destination.chain_id.to_string();
    }
    if config.poller.inter_record_delay_ms >= config.poller.poll_interval_ms {
        tracing::warn!(
            "!!WARNING!!: inter-record-delay-ms ({}) is not smaller than poll-interval-ms ({}), \
            cycles with more than one device will overrun the interval",
            config.poller.inter_record_delay_ms,
            config.poller.poll_interval_ms,
        );
    }
    if config.destination.explorer.is_none() {
        tracing::debug!(
            "No explorer configured for {}, tx hashes will be logged as-is",
            config.destination.name
        );
    }
    config.verify()?;

    tracing::trace!(
        "postloaded config: {}",
        serde_json::to_string_pretty(&config)?
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::poller::BackoffKind;

    const KEY: &str =
        "0x000000000000000000000000000000000000000000000000000000000000beef";

    const BASE: &str = r#"
[source]
database-url = "https://krishi-demo.firebaseio.com"

[destination]
name = "hardhat"
http-endpoint = "http://127.0.0.1:8545"
chain-id = 31337
contract-address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
private-key = "0x000000000000000000000000000000000000000000000000000000000000beef"
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "relayer.toml", BASE);
        let config = parse_from_files_with_env(&[file], no_env).unwrap();
        assert_eq!(config.poller.poll_interval_ms, 20_000);
        assert_eq!(config.poller.inter_record_delay_ms, 500);
        assert_eq!(config.poller.max_retries, 1);
        assert_eq!(config.poller.base_delay_ms, 2_000);
        assert_eq!(config.poller.backoff, BackoffKind::Linear);
        assert!(!config.poller.skip_retry_on_rejection);
        assert_eq!(config.source.collection, "sensor_data");
        assert_eq!(config.destination.resource_limit, 1_000_000);
        assert_eq!(config.destination.block_confirmations, 1);
        assert_eq!(config.port, None);
    }

    #[test]
    fn env_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "relayer.toml", BASE);
        let env: HashMap<&str, &str> = [
            ("POLL_INTERVAL_MS", "5000"),
            ("MAX_RETRIES", "3"),
            ("CHAIN_ID", "1337"),
            ("RESOURCE_LIMIT", "250000"),
            ("FIREBASE_DB_URL", "https://other.firebaseio.com"),
            ("DESTINATION_ADDRESS", "0x0000000000000000000000000000000000000001"),
            ("PRIVATE_KEY", " "),
        ]
        .into_iter()
        .collect();
        let config = parse_from_files_with_env(&[file], |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.poller.poll_interval_ms, 5_000);
        assert_eq!(config.poller.max_retries, 3);
        assert_eq!(config.destination.chain_id, 1337);
        assert_eq!(config.destination.resource_limit, 250_000);
        assert_eq!(
            config.source.database_url.as_url().host_str(),
            Some("other.firebaseio.com")
        );
        assert_eq!(
            config.destination.contract_address,
            "0x0000000000000000000000000000000000000001".parse().unwrap()
        );
        // blank values do not clear what the files set
        assert!(config.destination.private_key.is_some());
    }

    #[test]
    fn env_alone_is_enough() {
        let env: HashMap<&str, &str> = [
            ("FIREBASE_DB_URL", "https://krishi-demo.firebaseio.com"),
            ("RPC_URL", "http://127.0.0.1:8545"),
            ("CHAIN_ID", "31337"),
            ("DESTINATION_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            ("PRIVATE_KEY", KEY),
        ]
        .into_iter()
        .collect();
        let config = parse_from_files_with_env(&[], |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.destination.chain_id, 31337);
        assert_eq!(config.destination.name, "31337");
    }

    #[test]
    fn files_are_merged_and_json_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let toml = write(dir.path(), "relayer.toml", BASE);
        let json = write(
            dir.path(),
            "poller.json",
            r#"{ "poller": { "max-retries": 4, "backoff": "exponential", "skip-retry-on-rejection": true } }"#,
        );
        let files = search_config_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&toml) && files.contains(&json));
        let config = parse_from_files_with_env(&files, no_env).unwrap();
        assert_eq!(config.poller.max_retries, 4);
        assert_eq!(config.poller.backoff, BackoffKind::Exponential);
        assert!(config.poller.skip_retry_on_rejection);
    }

    #[test]
    fn collection_slashes_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "relayer.toml", BASE);
        let extra = write(
            dir.path(),
            "source.toml",
            "[source]\ncollection = \"/farms/north/\"\n",
        );
        let config =
            parse_from_files_with_env(&[file, extra], no_env).unwrap();
        assert_eq!(config.source.collection, "farms/north");
    }

    #[test]
    fn zero_retries_are_refused() {
        let env = |name: &str| (name == "MAX_RETRIES").then(|| "0".to_string());
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "relayer.toml", BASE);
        let err = parse_from_files_with_env(&[file], env).unwrap_err();
        assert!(matches!(err, krishi_relay_utils::Error::InvalidConfig(_)));
    }

    #[test]
    fn missing_private_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "relayer.toml",
            &BASE.replace(&format!("private-key = \"{KEY}\"\n"), ""),
        );
        let err = parse_from_files_with_env(&[file], no_env).unwrap_err();
        assert!(matches!(err, krishi_relay_utils::Error::MissingSecrets));
    }

    #[test]
    fn missing_source_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "relayer.toml",
            "[destination]\nchain-id = 1\n",
        );
        let err = parse_from_files_with_env(&[file], no_env).unwrap_err();
        assert!(matches!(err, krishi_relay_utils::Error::ParseConfig(_)));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "relayer.toml", BASE);
        let config = parse_from_files_with_env(&[file], no_env).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("beef"));
        assert!(!json.contains("privateKey"));
        assert!(json.contains("contractAddress"));
    }
}
