// Dweve Sift - Rule-Driven Text Parsing Engine
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The engine's stash: named variables shared between rules.
//!
//! The stash has two tiers. The transient tier is cleared at the start of
//! every read; the persistent tier (pre-stash) survives reads until
//! explicitly forgotten. Reads resolve the transient tier first, so a rule
//! assigning `~name` shadows a pre-stashed value for the rest of the read
//! without destroying it.

use crate::expr::Value;
use std::collections::HashMap;

/// Two-tier map of named variables accessible to rules as `~name`.
#[derive(Debug, Clone, Default)]
pub struct Stash {
    transient: HashMap<String, Value>,
    persistent: HashMap<String, Value>,
}

impl Stash {
    /// Create an empty stash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a variable: transient tier first, then persistent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.transient
            .get(name)
            .or_else(|| self.persistent.get(name))
    }

    /// Write a variable into the transient tier.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.transient.insert(name.into(), value);
    }

    /// Write a variable into the persistent tier (pre-stash).
    pub fn set_persistent(&mut self, name: impl Into<String>, value: Value) {
        self.persistent.insert(name.into(), value);
    }

    /// Remove a variable from the transient tier only, returning it.
    ///
    /// A persistent copy of the same name is untouched and becomes visible
    /// again.
    pub fn delete_transient(&mut self, name: &str) -> Option<Value> {
        self.transient.remove(name)
    }

    /// Erase a variable from both tiers.
    pub fn forget(&mut self, name: &str) {
        self.transient.remove(name);
        self.persistent.remove(name);
    }

    /// Returns `true` if the unified view contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.transient.contains_key(name) || self.persistent.contains_key(name)
    }

    /// Returns `true` if the unified view is empty.
    pub fn is_empty(&self) -> bool {
        self.transient.is_empty() && self.persistent.is_empty()
    }

    /// Number of entries across both tiers (shadowed names count once).
    pub fn len(&self) -> usize {
        self.transient.len()
            + self
                .persistent
                .keys()
                .filter(|k| !self.transient.contains_key(*k))
                .count()
    }

    /// Drop the whole transient tier. Called at the start and end of a read.
    pub fn clear_transient(&mut self) {
        self.transient.clear();
    }

    /// Total entry count used for limit enforcement; shadowed names count
    /// in both tiers.
    pub(crate) fn raw_len(&self) -> usize {
        self.transient.len() + self.persistent.len()
    }
}
