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

//! Spill files written on behalf of a task, and their cleanup.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tally_core::fs::{close_quietly, delete_recursively};
use tally_core::TaskMetrics;

use crate::config::SpillConfig;

/// A directory of spill files whose sizes are charged to task metrics.
#[derive(Debug)]
pub struct SpillDirectory {
    config: SpillConfig,
    next_file: AtomicU64,
}

impl SpillDirectory {
    /// Creates the spill directory if needed.
    pub fn new(config: SpillConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.directory)?;
        log::debug!("Spill directory ready at {}", config.directory.display());
        Ok(Self {
            config,
            next_file: AtomicU64::new(0),
        })
    }

    /// The directory spill files are written under.
    pub fn path(&self) -> &Path {
        &self.config.directory
    }

    /// Returns `true` once `buffered_bytes` reaches the configured threshold.
    pub fn should_spill(&self, buffered_bytes: u64) -> bool {
        buffered_bytes >= self.config.threshold_bytes
    }

    /// Writes `data` to a new spill file and charges it to `metrics`.
    ///
    /// `in_memory_bytes` is the size the data occupied before it was
    /// serialized; it is added to `memory_bytes_spilled`, while the written
    /// length is added to `disk_bytes_spilled`.
    pub fn spill(
        &self,
        metrics: &TaskMetrics,
        in_memory_bytes: u64,
        data: &[u8],
    ) -> io::Result<PathBuf> {
        let id = self.next_file.fetch_add(1, Ordering::Relaxed);
        let path = self.config.directory.join(format!("spill-{id}.bin"));

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(data)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        close_quietly(file);

        metrics.memory_bytes_spilled.inc(in_memory_bytes);
        metrics.disk_bytes_spilled.inc(data.len() as u64);
        log::debug!(
            "Spilled {} bytes ({} in memory) to {}",
            data.len(),
            in_memory_bytes,
            path.display()
        );
        Ok(path)
    }

    /// Deletes the spill directory and everything in it.
    pub fn cleanup(&self) -> io::Result<()> {
        log::debug!("Removing spill directory {}", self.config.directory.display());
        delete_recursively(&self.config.directory)
    }
}
