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

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # KrishiSetu Sensor Relay 🌱
//!
//! Field devices write their latest soil and climate reading into a
//! Firebase Realtime Database. The relay polls that database on a fixed
//! interval and writes every reading it finds to the KrishiSetu contract
//! through `recordSensorData`, one signed transaction per device and cycle.
//!
//! ## Overview
//!
//! The service is a thin shell around the library crates:
//!
//! * [`krishi_source_backends`] reads the snapshot of the latest readings.
//! * [`krishi_tx_submitter`] signs, sends and confirms the transactions.
//! * [`krishi_sensor_poller`] drives the cycles and the retries.
//!
//! This crate wires them from the loaded configuration, checks that both
//! ends are reachable before the first cycle, and optionally exposes a
//! small status API.

/// HTTP handlers of the status API.
pub mod routes;
/// Startup of the background services and the status server.
pub mod service;

pub use krishi_relay_utils::{Error, Result};
