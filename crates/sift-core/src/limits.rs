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

//! Security limits for reading and rule compilation.

/// Configurable limits for engine security.
///
/// These limits protect against denial-of-service and memory exhaustion by
/// bounding the resources consumed while reading input and compiling rules.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum physical line length in bytes (default: 1MB).
    pub max_line_length: usize,
    /// Maximum logical line length in bytes after unwrapping (default: 16MB).
    ///
    /// A hostile input under `slurp` or a custom unwrap style can otherwise
    /// accumulate an unbounded buffer from many small physical lines.
    pub max_logical_line_length: usize,
    /// Maximum number of fields per logical line (default: 10k).
    pub max_fields: usize,
    /// Maximum number of accumulated records per read (default: 10M).
    pub max_records: usize,
    /// Maximum nesting depth of a rule expression (default: 64).
    pub max_expr_depth: usize,
    /// Maximum number of rules on one engine, instance plus class (default: 1k).
    pub max_rules: usize,
    /// Maximum number of stash entries across both tiers (default: 100k).
    pub max_stash_entries: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_length: 1024 * 1024,                // 1MB
            max_logical_line_length: 16 * 1024 * 1024,   // 16MB
            max_fields: 10_000,
            max_records: 10_000_000,
            max_expr_depth: 64,
            max_rules: 1_000,
            max_stash_entries: 100_000,
        }
    }
}

impl Limits {
    /// Create limits with no restrictions (for testing).
    pub fn unlimited() -> Self {
        Self {
            max_line_length: usize::MAX,
            max_logical_line_length: usize::MAX,
            max_fields: usize::MAX,
            max_records: usize::MAX,
            max_expr_depth: usize::MAX,
            max_rules: usize::MAX,
            max_stash_entries: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Default limits tests ====================

    #[test]
    fn test_default_max_line_length() {
        let limits = Limits::default();
        assert_eq!(limits.max_line_length, 1024 * 1024); // 1MB
    }

    #[test]
    fn test_default_max_logical_line_length() {
        let limits = Limits::default();
        assert_eq!(limits.max_logical_line_length, 16 * 1024 * 1024); // 16MB
    }

    #[test]
    fn test_default_max_fields() {
        let limits = Limits::default();
        assert_eq!(limits.max_fields, 10_000);
    }

    #[test]
    fn test_default_max_records() {
        let limits = Limits::default();
        assert_eq!(limits.max_records, 10_000_000);
    }

    #[test]
    fn test_default_max_expr_depth() {
        let limits = Limits::default();
        assert_eq!(limits.max_expr_depth, 64);
    }

    #[test]
    fn test_default_max_rules() {
        let limits = Limits::default();
        assert_eq!(limits.max_rules, 1_000);
    }

    #[test]
    fn test_logical_line_not_smaller_than_physical() {
        let limits = Limits::default();
        assert!(
            limits.max_logical_line_length >= limits.max_line_length,
            "max_logical_line_length ({}) should not be smaller than max_line_length ({})",
            limits.max_logical_line_length,
            limits.max_line_length
        );
    }

    // ==================== Unlimited limits tests ====================

    #[test]
    fn test_unlimited_max_line_length() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_line_length, usize::MAX);
    }

    #[test]
    fn test_unlimited_max_fields() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_fields, usize::MAX);
    }

    #[test]
    fn test_unlimited_max_expr_depth() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_expr_depth, usize::MAX);
    }

    // ==================== Clone and Debug tests ====================

    #[test]
    fn test_limits_clone() {
        let original = Limits::default();
        let cloned = original.clone();
        assert_eq!(original.max_line_length, cloned.max_line_length);
        assert_eq!(original.max_fields, cloned.max_fields);
        assert_eq!(original.max_records, cloned.max_records);
        assert_eq!(original.max_rules, cloned.max_rules);
    }

    #[test]
    fn test_limits_debug() {
        let limits = Limits::default();
        let debug = format!("{:?}", limits);
        assert!(debug.contains("max_line_length"));
        assert!(debug.contains("max_fields"));
        assert!(debug.contains("max_expr_depth"));
    }

    // ==================== Custom limits tests ====================

    #[test]
    fn test_custom_limits() {
        let limits = Limits {
            max_line_length: 100,
            max_logical_line_length: 200,
            max_fields: 5,
            max_records: 1000,
            max_expr_depth: 8,
            max_rules: 10,
            max_stash_entries: 50,
        };
        assert_eq!(limits.max_line_length, 100);
        assert_eq!(limits.max_logical_line_length, 200);
        assert_eq!(limits.max_fields, 5);
        assert_eq!(limits.max_records, 1000);
        assert_eq!(limits.max_expr_depth, 8);
        assert_eq!(limits.max_rules, 10);
        assert_eq!(limits.max_stash_entries, 50);
    }
}
