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

//! The per-task metrics record.

use super::block::BlockStatus;
use super::counter::Counter;
use super::io::{
    DataReadMethod, DataWriteMethod, InputMetrics, InputSnapshot, OutputMetrics, OutputSnapshot,
    ShuffleWriteMetrics, ShuffleWriteSnapshot,
};
use super::shuffle_read::{ShuffleReadAggregator, ShuffleReadMetrics, ShuffleReadSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

/// Where a task's metrics record is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Created, nothing registered, attached or merged yet.
    Initialized,
    /// The task is executing; registrations, writes and merges may interleave.
    Running,
    /// The task reported completion and the final snapshot was taken.
    Finalized,
}

impl TaskPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskPhase::Initialized,
            1 => TaskPhase::Running,
            _ => TaskPhase::Finalized,
        }
    }
}

/// Performance counters accumulated by a single task while it runs.
///
/// The record is written by the thread executing the task. A heartbeat thread
/// holding the same `Arc<TaskMetrics>` may read any scalar at any time and may
/// call [`merge_shuffle_read`](Self::merge_shuffle_read) to refresh the
/// shuffle-read aggregate. Scalar reads are eventually consistent with the
/// writer; nothing is validated, and a record is not locked against writes
/// once finalized.
///
/// Timings are in milliseconds and sizes in bytes.
#[derive(Debug)]
pub struct TaskMetrics {
    host_name: RwLock<String>,

    /// Time spent deserializing the task before running it.
    pub executor_deserialize_time: Counter,
    /// Time the executor spent running the task.
    pub executor_run_time: Counter,
    /// Time spent in garbage collection while the task ran.
    pub gc_time: Counter,
    /// Time spent serializing the task result.
    pub result_serialization_time: Counter,
    /// Size of the serialized task result.
    pub result_size: Counter,
    /// In-memory size of data spilled to disk.
    pub memory_bytes_spilled: Counter,
    /// On-disk size of data spilled to disk.
    pub disk_bytes_spilled: Counter,

    input: OnceLock<Arc<InputMetrics>>,
    output: OnceLock<Arc<OutputMetrics>>,
    shuffle_write: OnceLock<Arc<ShuffleWriteMetrics>>,
    shuffle_read: ShuffleReadAggregator,
    updated_blocks: Mutex<Option<Vec<(String, BlockStatus)>>>,
    phase: AtomicU8,
}

impl Default for TaskMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskMetrics {
    /// Creates a record with every counter at zero and no sub-records.
    pub fn new() -> Self {
        Self {
            host_name: RwLock::new(String::new()),
            executor_deserialize_time: Counter::new(),
            executor_run_time: Counter::new(),
            gc_time: Counter::new(),
            result_serialization_time: Counter::new(),
            result_size: Counter::new(),
            memory_bytes_spilled: Counter::new(),
            disk_bytes_spilled: Counter::new(),
            input: OnceLock::new(),
            output: OnceLock::new(),
            shuffle_write: OnceLock::new(),
            shuffle_read: ShuffleReadAggregator::new(),
            updated_blocks: Mutex::new(None),
            phase: AtomicU8::new(TaskPhase::Initialized as u8),
        }
    }

    /// The host the task runs on.
    pub fn host_name(&self) -> String {
        self.host_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the host the task runs on.
    pub fn set_host_name(&self, host_name: impl Into<String>) {
        *self
            .host_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = host_name.into();
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> TaskPhase {
        TaskPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn mark_running(&self) {
        let _ = self.phase.compare_exchange(
            TaskPhase::Initialized as u8,
            TaskPhase::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    // --- Optional sub-records ---

    /// Returns the input record, creating it with `read_method` on first use.
    ///
    /// Later calls return the existing record, even with a different method.
    pub fn attach_input(&self, read_method: DataReadMethod) -> Arc<InputMetrics> {
        self.mark_running();
        Arc::clone(self.input.get_or_init(|| {
            log::debug!("Attaching input metrics (read method: {read_method})");
            Arc::new(InputMetrics::new(read_method))
        }))
    }

    /// Returns the output record, creating it with `write_method` on first use.
    pub fn attach_output(&self, write_method: DataWriteMethod) -> Arc<OutputMetrics> {
        self.mark_running();
        Arc::clone(self.output.get_or_init(|| {
            log::debug!("Attaching output metrics (write method: {write_method})");
            Arc::new(OutputMetrics::new(write_method))
        }))
    }

    /// Returns the shuffle-write record, creating it on first use.
    pub fn attach_shuffle_write(&self) -> Arc<ShuffleWriteMetrics> {
        self.mark_running();
        Arc::clone(self.shuffle_write.get_or_init(|| {
            log::debug!("Attaching shuffle write metrics");
            Arc::new(ShuffleWriteMetrics::new())
        }))
    }

    /// The input record, if the task read any input.
    pub fn input_metrics(&self) -> Option<Arc<InputMetrics>> {
        self.input.get().cloned()
    }

    /// The output record, if the task wrote any output.
    pub fn output_metrics(&self) -> Option<Arc<OutputMetrics>> {
        self.output.get().cloned()
    }

    /// The shuffle-write record, if the task wrote shuffle data.
    pub fn shuffle_write_metrics(&self) -> Option<Arc<ShuffleWriteMetrics>> {
        self.shuffle_write.get().cloned()
    }

    // --- Shuffle read ---

    /// Registers a new shuffle dependency and returns its entry for the
    /// dependency reader to write into.
    pub fn register_shuffle_dependency(&self) -> Arc<ShuffleReadMetrics> {
        if self.phase() == TaskPhase::Finalized {
            log::warn!("Shuffle dependency registered after the task metrics were finalized");
        }
        self.mark_running();
        self.shuffle_read.register_dependency()
    }

    /// Recomputes the shuffle-read aggregate from every registered dependency.
    ///
    /// Returns `None` while no dependency is registered.
    pub fn merge_shuffle_read(&self) -> Option<ShuffleReadSnapshot> {
        self.mark_running();
        self.shuffle_read.merge()
    }

    /// The last merged shuffle-read aggregate, or `None` before the first merge.
    pub fn shuffle_read_metrics(&self) -> Option<ShuffleReadSnapshot> {
        self.shuffle_read.latest()
    }

    /// Number of shuffle dependencies registered so far.
    pub fn shuffle_dependency_count(&self) -> usize {
        self.shuffle_read.dependency_count()
    }

    // --- Updated blocks ---

    /// Records that the task changed the status of a storage block.
    pub fn record_updated_block(&self, block_id: impl Into<String>, status: BlockStatus) {
        self.mark_running();
        self.updated_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(Vec::new)
            .push((block_id.into(), status));
    }

    /// Blocks whose status the task changed, or `None` if there were none.
    pub fn updated_blocks(&self) -> Option<Vec<(String, BlockStatus)>> {
        self.updated_blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- Lifecycle ---

    /// Moves the record to [`TaskPhase::Finalized`] and takes the terminal
    /// shuffle-read merge.
    ///
    /// The phase flips before the merge, so a dependency registered
    /// concurrently is either in the terminal merge or warned about.
    pub fn finalize(&self) -> Option<ShuffleReadSnapshot> {
        let previous = self
            .phase
            .swap(TaskPhase::Finalized as u8, Ordering::AcqRel);
        if TaskPhase::from_u8(previous) == TaskPhase::Finalized {
            log::debug!("Task metrics finalized more than once");
        }
        self.shuffle_read.merge()
    }

    /// Copies every field into a plain value for a reporting layer.
    ///
    /// The shuffle-read aggregate is the last published one; this does not
    /// trigger a merge.
    pub fn snapshot(&self) -> TaskMetricsSnapshot {
        TaskMetricsSnapshot {
            host_name: self.host_name(),
            phase: self.phase(),
            executor_deserialize_time: self.executor_deserialize_time.get(),
            executor_run_time: self.executor_run_time.get(),
            gc_time: self.gc_time.get(),
            result_serialization_time: self.result_serialization_time.get(),
            result_size: self.result_size.get(),
            memory_bytes_spilled: self.memory_bytes_spilled.get(),
            disk_bytes_spilled: self.disk_bytes_spilled.get(),
            input: self.input.get().map(|input| input.snapshot()),
            output: self.output.get().map(|output| output.snapshot()),
            shuffle_write: self.shuffle_write.get().map(|write| write.snapshot()),
            shuffle_read: self.shuffle_read_metrics(),
            updated_blocks: self.updated_blocks(),
        }
    }
}

/// A serializable, point-in-time copy of a [`TaskMetrics`] record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetricsSnapshot {
    /// The host the task ran on.
    pub host_name: String,
    /// The record's lifecycle phase when the snapshot was taken.
    pub phase: TaskPhase,
    /// Time spent deserializing the task, in milliseconds.
    pub executor_deserialize_time: u64,
    /// Time spent running the task, in milliseconds.
    pub executor_run_time: u64,
    /// Time spent in garbage collection, in milliseconds.
    pub gc_time: u64,
    /// Time spent serializing the result, in milliseconds.
    pub result_serialization_time: u64,
    /// Size of the serialized result, in bytes.
    pub result_size: u64,
    /// In-memory size of spilled data, in bytes.
    pub memory_bytes_spilled: u64,
    /// On-disk size of spilled data, in bytes.
    pub disk_bytes_spilled: u64,
    /// Input activity, if any.
    pub input: Option<InputSnapshot>,
    /// Output activity, if any.
    pub output: Option<OutputSnapshot>,
    /// Shuffle-write activity, if any.
    pub shuffle_write: Option<ShuffleWriteSnapshot>,
    /// The last merged shuffle-read aggregate, if a merge happened.
    pub shuffle_read: Option<ShuffleReadSnapshot>,
    /// Blocks whose status the task changed, if any.
    pub updated_blocks: Option<Vec<(String, BlockStatus)>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::block::StorageLevel;

    #[test]
    fn test_new_record_is_empty() {
        let metrics = TaskMetrics::new();
        assert_eq!(metrics.host_name(), "");
        assert_eq!(metrics.executor_run_time.get(), 0);
        assert_eq!(metrics.disk_bytes_spilled.get(), 0);
        assert!(metrics.input_metrics().is_none());
        assert!(metrics.output_metrics().is_none());
        assert!(metrics.shuffle_write_metrics().is_none());
        assert!(metrics.shuffle_read_metrics().is_none());
        assert!(metrics.updated_blocks().is_none());
        assert_eq!(metrics.phase(), TaskPhase::Initialized);
    }

    #[test]
    fn test_scalar_setters_overwrite() {
        let metrics = TaskMetrics::new();
        metrics.set_host_name("worker-3");
        metrics.executor_run_time.set(120);
        metrics.executor_run_time.set(95);
        metrics.result_size.inc(2048);
        metrics.memory_bytes_spilled.inc(100);
        metrics.memory_bytes_spilled.dec(40);

        assert_eq!(metrics.host_name(), "worker-3");
        assert_eq!(metrics.executor_run_time.get(), 95);
        assert_eq!(metrics.result_size.get(), 2048);
        assert_eq!(metrics.memory_bytes_spilled.get(), 60);
    }

    #[test]
    fn test_attach_input_is_lazy_and_stable() {
        let metrics = TaskMetrics::new();
        assert!(metrics.input_metrics().is_none());

        let first = metrics.attach_input(DataReadMethod::Memory);
        assert_eq!(first.read_method(), DataReadMethod::Memory);
        assert_eq!(first.bytes_read.get(), 0);

        first.bytes_read.inc(10);
        let second = metrics.attach_input(DataReadMethod::Disk);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.read_method(), DataReadMethod::Memory);
        assert_eq!(second.bytes_read.get(), 10);
    }

    #[test]
    fn test_attach_output_and_shuffle_write() {
        let metrics = TaskMetrics::new();
        let output = metrics.attach_output(DataWriteMethod::Hadoop);
        output.bytes_written.inc(99);
        let write = metrics.attach_shuffle_write();
        write.bytes_written.inc(7);

        assert!(Arc::ptr_eq(&output, &metrics.attach_output(DataWriteMethod::Hadoop)));
        assert!(Arc::ptr_eq(&write, &metrics.attach_shuffle_write()));
        assert_eq!(metrics.phase(), TaskPhase::Running);
    }

    #[test]
    fn test_shuffle_read_scenario() {
        let metrics = TaskMetrics::new();
        assert_eq!(metrics.shuffle_read_metrics(), None);

        let a = metrics.register_shuffle_dependency();
        a.local_blocks_fetched.inc(3);
        a.remote_blocks_fetched.inc(2);
        a.remote_bytes_read.inc(1000);
        a.fetch_wait_time.inc(50);

        let b = metrics.register_shuffle_dependency();
        b.local_blocks_fetched.inc(1);
        b.remote_blocks_fetched.inc(4);
        b.remote_bytes_read.inc(2000);
        b.fetch_wait_time.inc(30);

        metrics.merge_shuffle_read();
        let merged = metrics.shuffle_read_metrics().unwrap();
        assert_eq!(merged.local_blocks_fetched, 4);
        assert_eq!(merged.remote_blocks_fetched, 6);
        assert_eq!(merged.remote_bytes_read, 3000);
        assert_eq!(merged.fetch_wait_time, 80);
        assert_eq!(metrics.shuffle_dependency_count(), 2);
    }

    #[test]
    fn test_finalize_takes_terminal_merge() {
        let metrics = TaskMetrics::new();
        let entry = metrics.register_shuffle_dependency();
        metrics.merge_shuffle_read();
        entry.remote_bytes_read.inc(512);

        let last = metrics.finalize().unwrap();
        assert_eq!(last.remote_bytes_read, 512);
        assert_eq!(metrics.phase(), TaskPhase::Finalized);
        assert_eq!(metrics.shuffle_read_metrics(), Some(last));

        // Finalized is terminal.
        metrics.attach_shuffle_write();
        assert_eq!(metrics.phase(), TaskPhase::Finalized);
    }

    #[test]
    fn test_no_dependencies_merges_to_none() {
        let metrics = TaskMetrics::new();
        assert_eq!(metrics.merge_shuffle_read(), None);
        assert_eq!(metrics.shuffle_read_metrics(), None);

        assert_eq!(metrics.finalize(), None);
        assert_eq!(metrics.phase(), TaskPhase::Finalized);
        assert_eq!(metrics.snapshot().shuffle_read, None);
    }

    #[test]
    fn test_registration_after_finalize_stays_out_of_terminal_merge() {
        let metrics = TaskMetrics::new();
        metrics.register_shuffle_dependency().remote_bytes_read.inc(10);
        let terminal = metrics.finalize().unwrap();
        assert_eq!(metrics.phase(), TaskPhase::Finalized);

        // Late registration is accepted with a warning but does not revive
        // the record or change the terminal merge it already returned.
        metrics.register_shuffle_dependency().remote_bytes_read.inc(99);
        assert_eq!(metrics.phase(), TaskPhase::Finalized);
        assert_eq!(terminal.remote_bytes_read, 10);
        assert_eq!(metrics.shuffle_read_metrics(), Some(terminal));
        assert_eq!(metrics.shuffle_dependency_count(), 2);
    }

    #[test]
    fn test_updated_blocks() {
        let metrics = TaskMetrics::new();
        metrics.record_updated_block("rdd_2_0", BlockStatus::new(StorageLevel::Memory, 64, 0));
        metrics.record_updated_block("rdd_2_1", BlockStatus::new(StorageLevel::Disk, 0, 128));

        let blocks = metrics.updated_blocks().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].0, "rdd_2_1");
        assert_eq!(blocks[1].1.disk_size, 128);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = TaskMetrics::new();
        metrics.set_host_name("node-a");
        metrics.gc_time.set(12);
        metrics.attach_input(DataReadMethod::Network).bytes_read.inc(300);
        metrics.register_shuffle_dependency().local_blocks_fetched.inc(1);
        metrics.merge_shuffle_read();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.gc_time, 12);
        assert_eq!(snapshot.input.unwrap().bytes_read, 300);
        assert!(snapshot.output.is_none());
        assert_eq!(snapshot.shuffle_read.unwrap().local_blocks_fetched, 1);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TaskMetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
