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

mod evm_submitter;

#[doc(hidden)]
pub use evm_submitter::*;

#[allow(missing_docs)]
mod contract {
    ethers::contract::abigen!(
        KrishiSetuContract,
        r#"[
            function recordSensorData(string deviceId, uint256 moisture, uint256 temperature, uint256 humidity, string status, string localDate, string localTime, uint256 timestamp) external
        ]"#,
    );
}

pub use contract::*;
