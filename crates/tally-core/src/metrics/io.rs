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

//! Input, output and shuffle-write sub-records.
//!
//! These are attached lazily to a [`TaskMetrics`](super::TaskMetrics) the
//! first time the task performs that kind of I/O.

use super::counter::Counter;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Where a task read its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataReadMethod {
    /// Blocks already cached in memory.
    Memory,
    /// Blocks stored on local disk.
    Disk,
    /// A Hadoop-compatible input format.
    Hadoop,
    /// Blocks fetched over the network.
    Network,
}

impl Display for DataReadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataReadMethod::Memory => "memory",
            DataReadMethod::Disk => "disk",
            DataReadMethod::Hadoop => "hadoop",
            DataReadMethod::Network => "network",
        };
        f.write_str(name)
    }
}

/// Where a task wrote its output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWriteMethod {
    /// A Hadoop-compatible output format.
    Hadoop,
}

impl Display for DataWriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWriteMethod::Hadoop => f.write_str("hadoop"),
        }
    }
}

/// Bytes and records a task read from its input source.
#[derive(Debug)]
pub struct InputMetrics {
    read_method: DataReadMethod,
    /// Total bytes read.
    pub bytes_read: Counter,
    /// Total records read.
    pub records_read: Counter,
}

impl InputMetrics {
    /// Creates an empty input record for the given read method.
    pub fn new(read_method: DataReadMethod) -> Self {
        Self {
            read_method,
            bytes_read: Counter::new(),
            records_read: Counter::new(),
        }
    }

    /// The method this input was read with.
    pub fn read_method(&self) -> DataReadMethod {
        self.read_method
    }

    /// Copies the current values into a plain snapshot.
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            read_method: self.read_method,
            bytes_read: self.bytes_read.get(),
            records_read: self.records_read.get(),
        }
    }
}

/// Point-in-time copy of an [`InputMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// The method the input was read with.
    pub read_method: DataReadMethod,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Total records read.
    pub records_read: u64,
}

/// Bytes and records a task wrote to its output sink.
#[derive(Debug)]
pub struct OutputMetrics {
    write_method: DataWriteMethod,
    /// Total bytes written.
    pub bytes_written: Counter,
    /// Total records written.
    pub records_written: Counter,
}

impl OutputMetrics {
    /// Creates an empty output record for the given write method.
    pub fn new(write_method: DataWriteMethod) -> Self {
        Self {
            write_method,
            bytes_written: Counter::new(),
            records_written: Counter::new(),
        }
    }

    /// The method this output was written with.
    pub fn write_method(&self) -> DataWriteMethod {
        self.write_method
    }

    /// Copies the current values into a plain snapshot.
    pub fn snapshot(&self) -> OutputSnapshot {
        OutputSnapshot {
            write_method: self.write_method,
            bytes_written: self.bytes_written.get(),
            records_written: self.records_written.get(),
        }
    }
}

/// Point-in-time copy of an [`OutputMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSnapshot {
    /// The method the output was written with.
    pub write_method: DataWriteMethod,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Total records written.
    pub records_written: u64,
}

/// Shuffle data written by a map-side task.
#[derive(Debug, Default)]
pub struct ShuffleWriteMetrics {
    /// Bytes written to shuffle files.
    pub bytes_written: Counter,
    /// Time spent blocked on writes, in nanoseconds.
    pub write_time: Counter,
    /// Records written to shuffle files.
    pub records_written: Counter,
}

impl ShuffleWriteMetrics {
    /// Creates an empty shuffle-write record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current values into a plain snapshot.
    pub fn snapshot(&self) -> ShuffleWriteSnapshot {
        ShuffleWriteSnapshot {
            bytes_written: self.bytes_written.get(),
            write_time: self.write_time.get(),
            records_written: self.records_written.get(),
        }
    }
}

/// Point-in-time copy of a [`ShuffleWriteMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleWriteSnapshot {
    /// Bytes written to shuffle files.
    pub bytes_written: u64,
    /// Time spent blocked on writes, in nanoseconds.
    pub write_time: u64,
    /// Records written to shuffle files.
    pub records_written: u64,
}
