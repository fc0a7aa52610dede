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
//! # Sensor Poller
//!
//! Drives the relay: a [`Poller`] reads the whole sensor collection once per
//! interval and hands every reading to a [`RetryController`], which submits
//! it to the ledger with a bounded number of attempts.
//!
//! Records are handled one at a time, in snapshot order, and a cycle always
//! finishes before the next one starts. This is what keeps the relayer's
//! nonces free of collisions.

mod poller;
mod report;
mod retry_controller;

pub use poller::Poller;
pub use report::PollCycleReport;
pub use retry_controller::RetryController;
