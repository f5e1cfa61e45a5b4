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

//! Shared test fixtures and utilities for the Sift engine.
//!
//! This crate provides canonical test inputs (log files, SPICE decks,
//! CSV-ish tables, wrapped text) and pre-configured parsers so integration
//! tests across the workspace don't re-declare the same scaffolding.
//!
//! ```rust
//! use sift_test::{fixtures, records_as_strings};
//!
//! let mut parser = fixtures::parsers::error_scanner();
//! parser.read_text(fixtures::inputs::APP_LOG).unwrap();
//! let errors = records_as_strings(&parser);
//! assert!(errors.iter().all(|r| r.contains("disk") || r.contains("quota") || r.contains("net")));
//! ```

pub mod fixtures;

use sift_core::{Parser, Record};

/// Collect the string records of a parser, skipping non-string records.
pub fn records_as_strings(parser: &Parser) -> Vec<String> {
    parser
        .get_records()
        .iter()
        .filter_map(Record::as_str)
        .map(str::to_string)
        .collect()
}

/// Collect the list records of a parser, skipping non-list records.
pub fn records_as_lists(parser: &Parser) -> Vec<Vec<String>> {
    parser
        .get_records()
        .iter()
        .filter_map(Record::as_list)
        .map(<[String]>::to_vec)
        .collect()
}
