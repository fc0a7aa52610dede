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

use crate::SensorRelayConfig;
use anyhow::Context;
use directories_next::ProjectDirs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Package identifier, where the default configuration is defined.
/// If the user does not start the relay with the `--config-dir`
/// it will default to read from the default location depending on the OS.
pub const PACKAGE_ID: [&str; 3] = ["org", "krishisetu", "sensor-relay"];

/// The KrishiSetu Sensor Relay Command-line tool
///
/// Start the relay from a config directory:
///
/// $ sensor-relay -vvv -c <CONFIG_DIR_PATH>
#[derive(StructOpt)]
#[structopt(name = "KrishiSetu Sensor Relay")]
pub struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: i32,
    /// Directory that contains configration files.
    #[structopt(
        short = "c",
        long = "config-dir",
        value_name = "PATH",
        parse(from_os_str)
    )]
    pub config_dir: Option<PathBuf>,
    /// Emit logs as JSON lines instead of the pretty format.
    #[structopt(long)]
    pub json_logs: bool,
}

/// Loads the configuration from the given directory.
///
/// Without a directory, the OS default config location is used when it
/// exists, and the environment alone otherwise.
pub fn load_config<P>(
    config_dir: Option<P>,
) -> Result<SensorRelayConfig, anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = match config_dir {
        Some(p) => {
            let path = p.as_ref().to_path_buf();
            // return an error if the path is not a directory.
            if !path.is_dir() {
                return Err(anyhow::anyhow!(
                    "{} is not a directory",
                    path.display()
                ));
            }
            Some(path)
        }
        None => {
            tracing::debug!("Getting default dirs for sensor relay");
            ProjectDirs::from(PACKAGE_ID[0], PACKAGE_ID[1], PACKAGE_ID[2])
                .map(|dirs| dirs.config_dir().to_path_buf())
                .filter(|p| p.is_dir())
        }
    };
    let v = match path {
        Some(path) => {
            tracing::trace!("Loading Config from {} ..", path.display());
            crate::utils::load(&path).with_context(|| {
                format!("failed to load config from {}", path.display())
            })?
        }
        None => {
            tracing::trace!("Loading Config from the environment ..");
            crate::utils::parse_from_files(&[])
                .context("failed to load config from the environment")?
        }
    };
    tracing::trace!("Config loaded..");
    Ok(v)
}

/// Sets up the logger for the relay, based on the verbosity level passed in.
///
/// `RUST_LOG` directives are honoured on top of the verbosity.
pub fn setup_logger(verbosity: i32, json: bool) -> anyhow::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in [
        "sensor_relay",
        "krishi_relay_config",
        "krishi_relay_context",
        "krishi_source_backends",
        "krishi_tx_submitter",
        "krishi_sensor_poller",
        krishi_relay_utils::probe::TARGET,
    ] {
        env_filter =
            env_filter.add_directive(format!("{target}={log_level}").parse()?);
    }
    let logger = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter);
    let result = if json {
        logger
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init()
    } else {
        logger.pretty().try_init()
    };
    result.map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn verbosity_flags_are_counted() {
        let opts = Opts::from_iter(["sensor-relay", "-vvv", "-c", "/tmp"]);
        assert_eq!(opts.verbose, 3);
        assert_eq!(opts.config_dir, Some(PathBuf::from("/tmp")));
        assert!(!opts.json_logs);
    }
}
