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

use serde::{Deserialize, Serialize};

/// A Wrapper around [`url::Url`] to support the `serde` deserialization
/// from environment variables (`$NAME`).
///
/// Used for the JSON-RPC endpoint and the realtime database address.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvUrl(url::Url);

impl EnvUrl {
    /// Returns the inner [`url::Url`].
    pub fn as_url(&self) -> &url::Url {
        &self.0
    }
}

impl std::fmt::Display for EnvUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials in the userinfo part are never printed.
        write!(f, "{}", self.0.scheme())?;
        if let Some(host) = self.0.host_str() {
            write!(f, "://{host}")?;
        }
        if let Some(port) = self.0.port() {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.0.path())
    }
}

impl std::fmt::Debug for EnvUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl From<EnvUrl> for url::Url {
    fn from(value: EnvUrl) -> Self {
        value.0
    }
}

impl From<url::Url> for EnvUrl {
    fn from(url: url::Url) -> Self {
        EnvUrl(url)
    }
}

impl std::ops::Deref for EnvUrl {
    type Target = url::Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for EnvUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EnvUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = crate::env::resolve::<D::Error>(&raw)?;
        url::Url::parse(value.trim())
            .map(Self)
            .map_err(|e| serde::de::Error::custom(format!("{e:?}")))
    }
}
