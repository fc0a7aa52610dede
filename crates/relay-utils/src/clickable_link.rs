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

use std::fmt;

/// A transaction hash rendered as an OSC 8 hyperlink to a block explorer,
/// or as plain text when no explorer is configured.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TxLink<'a> {
    tx_hash: &'a str,
    url: Option<url::Url>,
}

impl<'a> TxLink<'a> {
    /// Creates a link to `tx/<hash>` under the given explorer.
    pub fn new(tx_hash: &'a str, explorer: Option<&url::Url>) -> Self {
        let url = explorer.map(|explorer| {
            let mut url = explorer.clone();
            url.set_path(&format!("tx/{tx_hash}"));
            url
        });
        Self { tx_hash, url }
    }
}

impl fmt::Display for TxLink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(
                f,
                "\u{1b}]8;;{}\u{1b}\\{}\u{1b}]8;;\u{1b}\\",
                url, self.tx_hash
            ),
            None => write!(f, "{}", self.tx_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_hash_without_explorer() {
        let link = TxLink::new("0xabc", None);
        assert_eq!(link.to_string(), "0xabc");
    }

    #[test]
    fn renders_explorer_link() {
        let explorer = url::Url::parse("https://curtis.explorer.caldera.xyz")
            .unwrap();
        let link = TxLink::new("0xabc", Some(&explorer));
        let rendered = link.to_string();
        assert!(rendered
            .contains("https://curtis.explorer.caldera.xyz/tx/0xabc"));
        assert!(rendered.ends_with("0xabc\u{1b}]8;;\u{1b}\\"));
    }
}
