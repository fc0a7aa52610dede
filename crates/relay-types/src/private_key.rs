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

use std::str::FromStr;

use ethers::types::H256;
use serde::Deserialize;

/// PrivateKey represents the relayer's signing key.
///
/// Accepted forms:
/// 1. a `0x` prefixed, 32 byte hex string,
/// 2. `$NAME`, the hex string is read from the environment variable `NAME`.
#[derive(Clone)]
pub struct PrivateKey(H256);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").finish()
    }
}

impl From<H256> for PrivateKey {
    fn from(secret: H256) -> Self {
        PrivateKey(secret)
    }
}

impl std::ops::Deref for PrivateKey {
    type Target = H256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = crate::env::resolve::<D::Error>(&raw)?;
        let hex = value.trim();
        if !hex.starts_with("0x") {
            return Err(serde::de::Error::custom(
                "expected a 0x prefixed hex private key",
            ));
        }
        H256::from_str(hex).map(Self).map_err(|e| {
            serde::de::Error::custom(format!(
                "{e}\n expected a 66 chars string (including the 0x prefix) but found {} chars",
                hex.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str =
        "0x8917174396171783496173419137618235192359106130478137647163400318";

    #[test]
    fn parses_hex_key() {
        let key: PrivateKey =
            serde_json::from_value(serde_json::json!(KEY)).unwrap();
        assert_eq!(format!("{:?}", key), "PrivateKey");
        assert_eq!(key.as_bytes()[0], 0x89);
    }

    #[test]
    fn reads_key_from_env() {
        std::env::set_var("KRISHI_TEST_PRIVATE_KEY", KEY);
        let key: PrivateKey = serde_json::from_value(serde_json::json!(
            "$KRISHI_TEST_PRIVATE_KEY"
        ))
        .unwrap();
        assert_eq!(key.as_bytes()[31], 0x18);
    }

    #[test]
    fn rejects_unprefixed_key() {
        let result: Result<PrivateKey, _> =
            serde_json::from_value(serde_json::json!("not a key"));
        assert!(result.is_err());
    }
}
