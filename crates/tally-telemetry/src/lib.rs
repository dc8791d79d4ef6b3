// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Tally Telemetry
//!
//! Services built around `tally-core`: the heartbeat reporter that samples
//! running tasks, the configuration it reads, logging bootstrap, and the spill
//! directory that charges spilled bytes to a task.

#![warn(missing_docs)]

pub mod config;
pub mod heartbeat;
pub mod logging;
pub mod spill;

pub use config::{ConfigError, HeartbeatConfig, SpillConfig, TallyConfigFile};
pub use heartbeat::{HeartbeatReport, HeartbeatReporter, TaskId};
pub use spill::SpillDirectory;
