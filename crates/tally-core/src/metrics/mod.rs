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

//! The metrics model for a single executing task.
//!
//! A [`TaskMetrics`] record is created when a task starts and is written by the
//! thread running that task. A heartbeat thread may read it at any time: scalar
//! counters are relaxed atomics, so a reader sees values that are eventually
//! consistent, while the shuffle-read aggregate is published under a lock by
//! [`ShuffleReadAggregator::merge`].

pub mod block;
pub mod counter;
pub mod io;
pub mod shuffle_read;
pub mod task;

pub use self::block::{BlockStatus, StorageLevel};
pub use self::counter::Counter;
pub use self::io::{
    DataReadMethod, DataWriteMethod, InputMetrics, InputSnapshot, OutputMetrics, OutputSnapshot,
    ShuffleWriteMetrics, ShuffleWriteSnapshot,
};
pub use self::shuffle_read::{ShuffleReadAggregator, ShuffleReadMetrics, ShuffleReadSnapshot};
pub use self::task::{TaskMetrics, TaskMetricsSnapshot, TaskPhase};
