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

//! A single-writer counter that can be read from any thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// An unsigned 64-bit counter backed by a relaxed atomic.
///
/// Every metric field in this crate is a `Counter`. The owning thread is the
/// only writer; other threads may read at any time and observe a value that is
/// eventually, not sequentially, consistent with the writer.
///
/// No validation is applied. Decrementing below zero wraps around, which is a
/// contract violation on the caller's side rather than a runtime error.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a counter starting at zero.
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Returns the current value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Overwrites the current value.
    #[inline]
    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Adds `delta` to the counter.
    #[inline]
    pub fn inc(&self, delta: u64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    /// Subtracts `delta` from the counter, used to correct over-counted work.
    #[inline]
    pub fn dec(&self, delta: u64) {
        self.0.fetch_sub(delta, Ordering::Relaxed);
    }
}

impl From<u64> for Counter {
    fn from(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_zero() {
        assert_eq!(Counter::new().get(), 0);
        assert_eq!(Counter::default().get(), 0);
    }

    #[test]
    fn test_counter_set_inc_dec() {
        let counter = Counter::new();
        counter.set(10);
        counter.inc(5);
        counter.dec(3);
        assert_eq!(counter.get(), 12);

        counter.set(1);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_counter_from_value() {
        assert_eq!(Counter::from(42).get(), 42);
    }
}
