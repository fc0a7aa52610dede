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
//! Types shared between the sensor source, the transformer and the
//! transaction submitter, plus the config value wrappers that can be read
//! from environment variables.

/// Config strings that may point at an environment variable.
mod env;
/// A URL loaded from config.
pub mod env_url;
/// An ethereum private key loaded from config.
pub mod private_key;
/// A secret string (API token) loaded from config.
pub mod secret;
/// Raw sensor readings as stored by the devices.
pub mod sensor;
/// Fixed-point conversion of readings into contract arguments.
pub mod transform;

pub use sensor::SensorRecord;
pub use transform::{to_reading_args, SensorReadingArgs, TransformError};
