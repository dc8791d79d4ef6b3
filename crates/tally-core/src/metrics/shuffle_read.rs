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

//! Per-dependency shuffle-read metrics and their merged view.
//!
//! A task that consumes several shuffle dependencies registers one
//! [`ShuffleReadMetrics`] per dependency with the [`ShuffleReadAggregator`].
//! Each entry has exactly one writer (the reader of that dependency), so its
//! fields are written without taking any lock. Only the collection of entries
//! and the published [`ShuffleReadSnapshot`] are guarded, by a single mutex
//! held for the duration of an append or of a full merge.
//!
//! A merge always recomputes the snapshot from every registered entry. Entries
//! are never drained, so accumulating onto the previous snapshot would count
//! an entry once per heartbeat. Until the first dependency registers there is
//! nothing to merge and no snapshot is published.

use super::counter::Counter;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shuffle-read counters for one dependency.
///
/// `total_blocks_fetched` is not stored: it is always `local + remote`.
#[derive(Debug, Default)]
pub struct ShuffleReadMetrics {
    /// Blocks fetched from remote executors.
    pub remote_blocks_fetched: Counter,
    /// Blocks read from the local block manager.
    pub local_blocks_fetched: Counter,
    /// Bytes read from remote executors.
    pub remote_bytes_read: Counter,
    /// Time spent waiting for remote blocks, in milliseconds.
    pub fetch_wait_time: Counter,
}

impl ShuffleReadMetrics {
    /// Creates an entry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Local plus remote blocks fetched.
    pub fn total_blocks_fetched(&self) -> u64 {
        self.local_blocks_fetched
            .get()
            .wrapping_add(self.remote_blocks_fetched.get())
    }
}

/// The merged shuffle-read view across every registered dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShuffleReadSnapshot {
    /// Sum of fetch-wait time, in milliseconds.
    pub fetch_wait_time: u64,
    /// Sum of local blocks fetched.
    pub local_blocks_fetched: u64,
    /// Sum of remote blocks fetched.
    pub remote_blocks_fetched: u64,
    /// Sum of remote bytes read.
    pub remote_bytes_read: u64,
}

impl ShuffleReadSnapshot {
    /// Local plus remote blocks fetched, derived from the merged sums.
    pub fn total_blocks_fetched(&self) -> u64 {
        self.local_blocks_fetched.wrapping_add(self.remote_blocks_fetched)
    }

    fn accumulate(&mut self, entry: &ShuffleReadMetrics) {
        self.fetch_wait_time = self
            .fetch_wait_time
            .wrapping_add(entry.fetch_wait_time.get());
        self.local_blocks_fetched = self
            .local_blocks_fetched
            .wrapping_add(entry.local_blocks_fetched.get());
        self.remote_blocks_fetched = self
            .remote_blocks_fetched
            .wrapping_add(entry.remote_blocks_fetched.get());
        self.remote_bytes_read = self
            .remote_bytes_read
            .wrapping_add(entry.remote_bytes_read.get());
    }
}

#[derive(Debug, Default)]
struct AggregatorState {
    dependencies: Vec<Arc<ShuffleReadMetrics>>,
    merged: Option<ShuffleReadSnapshot>,
}

/// Owns the per-dependency entries of one task and publishes their merge.
///
/// `register_dependency` and `merge` may be called from different threads at
/// the same time. Both take the same lock, so every published snapshot is the
/// result of one complete pass over the entries as they stood at one instant;
/// a registration that races with a merge is either fully counted or not
/// counted at all.
#[derive(Debug, Default)]
pub struct ShuffleReadAggregator {
    state: Mutex<AggregatorState>,
}

impl ShuffleReadAggregator {
    /// Creates an aggregator with no dependencies and no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic under the lock cannot leave an entry half-appended.
    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates a new entry for one shuffle dependency and appends it.
    ///
    /// The returned handle is meant for a single writer. Its counters can be
    /// updated without any further synchronization.
    pub fn register_dependency(&self) -> Arc<ShuffleReadMetrics> {
        let entry = Arc::new(ShuffleReadMetrics::new());
        let mut state = self.lock();
        state.dependencies.push(Arc::clone(&entry));
        log::trace!("Registered shuffle dependency #{}", state.dependencies.len());
        entry
    }

    /// Recomputes the merged snapshot from every registered entry and
    /// publishes it.
    ///
    /// Returns `None`, and publishes nothing, while no dependency is
    /// registered. Calling `merge` twice with no registration in between
    /// returns equal snapshots.
    pub fn merge(&self) -> Option<ShuffleReadSnapshot> {
        let mut state = self.lock();
        if state.dependencies.is_empty() {
            return state.merged;
        }
        let mut merged = ShuffleReadSnapshot::default();
        for entry in &state.dependencies {
            merged.accumulate(entry);
        }
        state.merged = Some(merged);
        state.merged
    }

    /// The last published snapshot, or `None` if no merge has happened yet.
    pub fn latest(&self) -> Option<ShuffleReadSnapshot> {
        self.lock().merged
    }

    /// Number of dependencies registered so far.
    pub fn dependency_count(&self) -> usize {
        self.lock().dependencies.len()
    }
}
