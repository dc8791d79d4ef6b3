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

//! Breadth-first listing of a node's ancestors.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Returns every ancestor of `root`, each once, in breadth-first discovery
/// order. `root` itself is not included, even if a cycle leads back to it.
///
/// `parents` yields the direct parents of a node. The frontier and the
/// visited set live for the duration of this call only, so walks running at
/// the same time never share state.
pub fn ancestors<T, F, I>(root: &T, mut parents: F) -> Vec<T>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut visited: HashSet<T> = HashSet::new();
    visited.insert(root.clone());

    let mut frontier: VecDeque<T> = VecDeque::new();
    frontier.push_back(root.clone());

    let mut found = Vec::new();
    while let Some(node) = frontier.pop_front() {
        for parent in parents(&node) {
            if visited.insert(parent.clone()) {
                found.push(parent.clone());
                frontier.push_back(parent);
            }
        }
    }
    found
}
