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

//! Filesystem housekeeping for spill files.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

/// Flushes and drops `resource`, logging instead of returning any error.
pub fn close_quietly<W: Write>(mut resource: W) {
    if let Err(e) = resource.flush() {
        log::error!("Error while closing resource, ignoring: {e}");
    }
}

/// Deletes a file or a directory tree.
///
/// Symlinks are removed but never followed. A path that does not exist is not
/// an error. If some children cannot be deleted the rest are still attempted,
/// and the last error encountered is returned.
pub fn delete_recursively(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        let mut last_error = None;
        for entry in fs::read_dir(path)? {
            let outcome = entry.and_then(|entry| delete_recursively(&entry.path()));
            if let Err(e) = outcome {
                log::warn!("Failed to delete under {}: {e}", path.display());
                last_error = Some(e);
            }
        }
        if let Some(e) = last_error {
            return Err(e);
        }
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
