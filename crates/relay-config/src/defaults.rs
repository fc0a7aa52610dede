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

/// A poll cycle starts every `20_000` ms by default.
pub const fn poll_interval_ms() -> u64 {
    20_000
}
/// Devices of one cycle are spaced by `500` ms by default.
pub const fn inter_record_delay_ms() -> u64 {
    500
}
/// One attempt per record and cycle by default.
pub const fn max_retries() -> usize {
    1
}
/// The retry backoff step is `2_000` ms by default.
pub const fn base_delay_ms() -> u64 {
    2_000
}
/// The readings live under `sensor_data` by default.
pub fn collection() -> String {
    String::from("sensor_data")
}
/// Source reads time out after `10_000` ms by default.
pub const fn request_timeout_ms() -> u64 {
    10_000
}
/// Gas limit attached to every transaction, `1_000_000` by default.
pub const fn resource_limit() -> u64 {
    1_000_000
}
/// One block confirmation by default.
pub const fn block_confirmations() -> usize {
    1
}
/// Pending transactions are polled every `1_000` ms by default.
pub const fn confirmation_poll_interval_ms() -> u64 {
    1_000
}
/// JSON-RPC requests are retried up to `10` times on rate limits by default.
pub const fn rpc_max_retries() -> u32 {
    10
}
/// The first JSON-RPC retry waits `1_000` ms by default.
pub const fn rpc_initial_backoff_ms() -> u64 {
    1_000
}
