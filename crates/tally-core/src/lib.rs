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

//! # Tally Core
//!
//! Foundational crate for per-task execution metrics. It defines the record a
//! running task writes its counters into, the shuffle-read aggregation that a
//! heartbeat thread samples, and the small helpers (unit parsing, spill-file
//! cleanup, lineage and serialization diagnostics) that surround them.

#![warn(missing_docs)]

pub mod debug;
pub mod fs;
pub mod metrics;
pub mod units;

pub use metrics::{
    BlockStatus, Counter, DataReadMethod, DataWriteMethod, InputMetrics, OutputMetrics,
    ShuffleReadAggregator, ShuffleReadMetrics, ShuffleReadSnapshot, ShuffleWriteMetrics,
    StorageLevel, TaskMetrics, TaskMetricsSnapshot, TaskPhase,
};
pub use units::{ByteUnit, TimeUnit, UnitParseError};
