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

//! Storage blocks whose status a task changed.

use serde::{Deserialize, Serialize};

/// How a block is held by the block manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLevel {
    /// Not stored anywhere (dropped or evicted).
    None,
    /// Held in memory only.
    Memory,
    /// Held on disk only.
    Disk,
    /// Held in memory, overflowing to disk.
    MemoryAndDisk,
    /// Held in off-heap memory.
    OffHeap,
}

/// The status of a block after the task touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatus {
    /// Where the block now lives.
    pub storage_level: StorageLevel,
    /// Bytes the block occupies in memory.
    pub memory_size: u64,
    /// Bytes the block occupies on disk.
    pub disk_size: u64,
}

impl BlockStatus {
    /// Creates a status entry.
    pub fn new(storage_level: StorageLevel, memory_size: u64, disk_size: u64) -> Self {
        Self {
            storage_level,
            memory_size,
            disk_size,
        }
    }

    /// Returns `true` if the block is stored somewhere.
    pub fn is_cached(&self) -> bool {
        self.storage_level != StorageLevel::None
            && self.memory_size.saturating_add(self.disk_size) > 0
    }
}
