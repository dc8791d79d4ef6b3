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

//! Periodic sampling of running tasks.
//!
//! The [`HeartbeatReporter`] owns a background thread that, once per interval,
//! merges the shuffle-read aggregate of every tracked task and sends a
//! [`HeartbeatReport`] down a bounded channel. A pass holds the task table
//! for its whole duration and [`HeartbeatReporter::complete`] finalizes under
//! the same lock, so a task's final report is always the last one sent for it.
//! Sends never block; a full channel drops the report.

use anyhow::Context as _;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tally_core::{TaskMetrics, TaskMetricsSnapshot, TaskPhase};

use crate::config::HeartbeatConfig;

/// Identifies a task tracked by the reporter.
pub type TaskId = u64;

/// The progress of one task at one heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReport {
    /// The task being reported.
    pub task_id: TaskId,
    /// Its metrics at the time of the heartbeat.
    pub metrics: TaskMetricsSnapshot,
}

impl HeartbeatReport {
    /// Encodes the report as JSON for a reporting layer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

type TaskTable = Mutex<HashMap<TaskId, Arc<TaskMetrics>>>;

/// Samples every tracked task on a fixed interval from a background thread.
pub struct HeartbeatReporter {
    config: HeartbeatConfig,
    tasks: Arc<TaskTable>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
    report_tx: Sender<HeartbeatReport>,
}

impl HeartbeatReporter {
    /// Creates a stopped reporter and the receiving end of its reports.
    pub fn new(config: HeartbeatConfig) -> (Self, Receiver<HeartbeatReport>) {
        let (tx, rx) = crossbeam_channel::bounded(config.report_buffer_size);
        let reporter = Self {
            config,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            shutdown_tx: None,
            report_tx: tx,
        };
        (reporter, rx)
    }

    /// Starts reporting `metrics` under `task_id` on every heartbeat.
    pub fn track(&self, task_id: TaskId, metrics: Arc<TaskMetrics>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.insert(task_id, metrics).is_some() {
            log::warn!("Task {task_id} was already tracked; replacing its metrics");
        }
        log::debug!("Tracking task {task_id}");
    }

    /// Stops reporting a task and returns its metrics.
    pub fn untrack(&self, task_id: TaskId) -> Option<Arc<TaskMetrics>> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id)
    }

    /// Number of tasks currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Finalizes a task, stops tracking it, and sends its final report.
    ///
    /// Returns `None` if the task was not tracked.
    pub fn complete(&self, task_id: TaskId) -> Option<HeartbeatReport> {
        // Held until the final report is queued so no pass can send after it.
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = tasks.remove(&task_id)?;
        metrics.finalize();
        let report = HeartbeatReport {
            task_id,
            metrics: metrics.snapshot(),
        };
        send_report(&self.report_tx, report.clone());
        drop(tasks);
        log::info!("Task {task_id} completed");
        Some(report)
    }

    /// Runs one heartbeat pass on the calling thread and returns the number
    /// of reports sent.
    pub fn poll(&self) -> usize {
        heartbeat_pass(&self.tasks, &self.report_tx)
    }

    /// Returns `true` while the background thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the background heartbeat thread. Does nothing if already running.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let running = Arc::clone(&self.running);
        let tasks = Arc::clone(&self.tasks);
        let report_tx = self.report_tx.clone();
        let interval = self.config.interval;

        running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("tally-heartbeat".to_string())
            .spawn(move || {
                log::info!("Heartbeat thread started (interval: {interval:?}).");
                while running.load(Ordering::Relaxed) {
                    let sent = heartbeat_pass(&tasks, &report_tx);
                    log::trace!("Heartbeat sent {sent} report(s)");

                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                running.store(false, Ordering::SeqCst);
                log::info!("Heartbeat thread stopped.");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                e
            })
            .context("failed to spawn heartbeat thread")?;

        self.handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    /// Stops the background thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Heartbeat thread panicked");
            }
        }
    }
}

impl Drop for HeartbeatReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn heartbeat_pass(tasks: &TaskTable, report_tx: &Sender<HeartbeatReport>) -> usize {
    let tasks = tasks.lock().unwrap_or_else(PoisonError::into_inner);

    let mut sent = 0;
    for (&task_id, metrics) in tasks.iter() {
        // Finalized records belong to `complete`; only it reports them.
        if metrics.phase() == TaskPhase::Finalized {
            continue;
        }
        metrics.merge_shuffle_read();
        let report = HeartbeatReport {
            task_id,
            metrics: metrics.snapshot(),
        };
        if send_report(report_tx, report) {
            sent += 1;
        }
    }
    sent
}

fn send_report(report_tx: &Sender<HeartbeatReport>, report: HeartbeatReport) -> bool {
    match report_tx.try_send(report) {
        Ok(()) => true,
        Err(TrySendError::Full(report)) => {
            log::warn!(
                "Heartbeat report buffer full, dropping report for task {}",
                report.task_id
            );
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            log::debug!("Heartbeat receiver dropped");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_reporter_lifecycle() {
        let (mut reporter, _rx) = HeartbeatReporter::new(fast_config());
        reporter.start().unwrap();
        assert!(reporter.is_running());
        reporter.stop();
        assert!(!reporter.is_running());
    }

    #[test]
    fn test_poll_reports_merged_shuffle_read() {
        let (reporter, rx) = HeartbeatReporter::new(fast_config());
        let metrics = Arc::new(TaskMetrics::new());
        reporter.track(1, Arc::clone(&metrics));

        let entry = metrics.register_shuffle_dependency();
        entry.remote_bytes_read.inc(4096);

        assert_eq!(reporter.poll(), 1);
        let report = rx.try_recv().unwrap();
        assert_eq!(report.task_id, 1);
        assert_eq!(report.metrics.shuffle_read.unwrap().remote_bytes_read, 4096);
    }

    #[test]
    fn test_poll_without_dependencies_reports_no_shuffle_read() {
        let (reporter, rx) = HeartbeatReporter::new(fast_config());
        let metrics = Arc::new(TaskMetrics::new());
        metrics.attach_input(tally_core::DataReadMethod::Memory).bytes_read.inc(10);
        reporter.track(4, metrics);

        assert_eq!(reporter.poll(), 1);
        let report = rx.try_recv().unwrap();
        assert_eq!(report.metrics.shuffle_read, None);
        assert_eq!(report.metrics.input.unwrap().bytes_read, 10);
    }

    #[test]
    fn test_poll_skips_finalized_records() {
        let (reporter, rx) = HeartbeatReporter::new(fast_config());
        let metrics = Arc::new(TaskMetrics::new());
        reporter.track(6, Arc::clone(&metrics));
        metrics.finalize();

        assert_eq!(reporter.poll(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_final_report_is_last_while_thread_runs() {
        for task_id in 0..50 {
            let (mut reporter, rx) = HeartbeatReporter::new(HeartbeatConfig {
                interval: Duration::from_micros(1),
                report_buffer_size: 100_000,
            });
            let metrics = Arc::new(TaskMetrics::new());
            let entry = metrics.register_shuffle_dependency();
            reporter.track(task_id, Arc::clone(&metrics));
            reporter.start().unwrap();

            entry.remote_bytes_read.inc(1);
            let _ = rx.recv_timeout(Duration::from_secs(5));
            entry.remote_bytes_read.inc(1);
            let final_report = reporter.complete(task_id).unwrap();
            // Let the thread run a few more passes before stopping it.
            thread::sleep(Duration::from_millis(2));
            reporter.stop();

            let received: Vec<_> = rx.try_iter().collect();
            assert_eq!(received.last(), Some(&final_report));
            assert_eq!(final_report.metrics.phase, TaskPhase::Finalized);
            assert_eq!(
                received
                    .iter()
                    .filter(|r| r.metrics.phase == TaskPhase::Finalized)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_full_buffer_drops_reports() {
        let (reporter, rx) = HeartbeatReporter::new(HeartbeatConfig {
            report_buffer_size: 1,
            ..fast_config()
        });
        reporter.track(1, Arc::new(TaskMetrics::new()));
        reporter.track(2, Arc::new(TaskMetrics::new()));

        assert_eq!(reporter.poll(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_complete_untracks_and_finalizes() {
        let (reporter, rx) = HeartbeatReporter::new(fast_config());
        let metrics = Arc::new(TaskMetrics::new());
        reporter.track(9, Arc::clone(&metrics));

        let report = reporter.complete(9).unwrap();
        assert_eq!(report.metrics.phase, tally_core::TaskPhase::Finalized);
        assert_eq!(reporter.tracked_count(), 0);
        assert_eq!(rx.try_recv().unwrap(), report);
        assert!(reporter.complete(9).is_none());
    }

    #[test]
    fn test_background_thread_sends_reports() {
        let (mut reporter, rx) = HeartbeatReporter::new(fast_config());
        let metrics = Arc::new(TaskMetrics::new());
        metrics.executor_run_time.set(3);
        reporter.track(5, metrics);
        reporter.start().unwrap();

        let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        reporter.stop();

        assert_eq!(report.task_id, 5);
        assert_eq!(report.metrics.executor_run_time, 3);
    }

    #[test]
    fn test_report_to_json() {
        let report = HeartbeatReport {
            task_id: 3,
            metrics: TaskMetrics::new().snapshot(),
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"task_id\":3"));
        assert!(json.contains("\"shuffle_read\":null"));
    }
}
