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

use std::time::Duration;

use ethers::providers::{HttpClientError, JsonRpcError, RetryPolicy};

/// Implements [RetryPolicy] that will retry requests that errored with
/// status code 429 i.e. TOO_MANY_REQUESTS
///
/// Hosted endpoints often fail with a `"header not found"` rpc error which is apparently linked to load
/// balancing, which are retried as well.
#[derive(Debug)]
pub struct RelayHttpRetryPolicy {
    err_regex: regex::Regex,
}

impl RelayHttpRetryPolicy {
    /// Creates the policy.
    pub fn new() -> Result<Self, regex::Error> {
        let err_regex = regex::Regex::new(
            r"(?mixU)\b(?:rate|limit|429|Too \s Many \s Requests)\b",
        )?;
        Ok(Self { err_regex })
    }
}

fn should_retry_json_rpc_error(err: &JsonRpcError) -> bool {
    let JsonRpcError { code, message, .. } = err;
    // alchemy throws it this way
    if *code == 429 {
        return true;
    }

    // infura `exceeded project rate limit`
    if *code == -32005 {
        return true;
    }

    // alternative alchemy error for specific IPs
    if *code == -32016 && message.contains("rate limit") {
        return true;
    }

    matches!(
        message.as_str(),
        "header not found"
            | "daily request count exceeded, request rate limited"
    )
}

impl RelayHttpRetryPolicy {
    // some providers send invalid JSON RPC in the error case (no `id:u64`), but the
    // text should be a `JsonRpcError`
    fn should_retry_text(&self, text: &str) -> bool {
        #[derive(serde::Deserialize)]
        struct Resp {
            error: JsonRpcError,
        }

        if let Ok(resp) = serde_json::from_str::<Resp>(text) {
            return should_retry_json_rpc_error(&resp.error);
        }

        // last resort, the body is not JSON at all but may still say that we
        // are rate limited.
        let err_text = text.to_lowercase();
        let should_retry = self.err_regex.is_match(&err_text);
        tracing::event!(
            target: krishi_relay_utils::probe::TARGET,
            tracing::Level::DEBUG,
            kind = %krishi_relay_utils::probe::Kind::Retry,
            should_retry = should_retry,
            error = %err_text,
        );
        should_retry
    }
}

impl RetryPolicy<HttpClientError> for RelayHttpRetryPolicy {
    fn should_retry(&self, error: &HttpClientError) -> bool {
        tracing::debug!("should_retry: {:?}", error);
        match error {
            HttpClientError::ReqwestError(err) => {
                err.status().map(|s| s.as_u16()) == Some(429)
            }
            HttpClientError::JsonRpcError(err) => {
                should_retry_json_rpc_error(err)
            }
            HttpClientError::SerdeJson { text, .. } => {
                self.should_retry_text(text)
            }
        }
    }

    fn backoff_hint(&self, error: &HttpClientError) -> Option<Duration> {
        if let HttpClientError::JsonRpcError(JsonRpcError {
            data: Some(data),
            ..
        }) = error
        {
            // infura returns the requested backoff when the daily limit is hit
            let backoff_seconds =
                data.get("rate").and_then(|v| v.get("backoff_seconds"));
            if let Some(seconds) = backoff_seconds.and_then(|v| v.as_u64()) {
                return Some(Duration::from_secs(seconds));
            }
            if let Some(seconds) = backoff_seconds.and_then(|v| v.as_f64()) {
                return Some(Duration::from_secs(seconds as u64 + 1));
            }
        }
        None
    }
}
