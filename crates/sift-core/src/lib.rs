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

//! Core engine and data model for Sift.
//!
//! Sift replaces hand-written line-by-line read loops with a small language
//! of **rules**: predicate/action pairs in an AWK-inspired mini-language
//! that run over the logical lines of a text input, accumulate **records**,
//! and share a **stash** of named variables.
//!
//! ```
//! use sift_core::{Parser, RuleOpts, Options, Record};
//!
//! let mut parser = Parser::with_options(
//!     Options::builder().auto_split(true).auto_chomp(true).build(),
//! );
//! parser
//!     .add_rule(RuleOpts::new().when("$1 eq 'NAME:'").action("return ${2+}"))
//!     .unwrap();
//! parser
//!     .add_rule(RuleOpts::new().when("$1 eq 'EMAIL:'").action("return $2"))
//!     .unwrap();
//!
//! parser.read_text("NAME: Audrey C Miller\nEMAIL: aud@a.io\n").unwrap();
//! let got: Vec<_> = parser
//!     .get_records()
//!     .iter()
//!     .filter_map(Record::as_str)
//!     .collect();
//! assert_eq!(got, vec!["Audrey C Miller", "aud@a.io"]);
//! ```
//!
//! # Modules
//!
//! - [`expr`]: the rule expression mini-language (compiler + evaluator)
//! - [`registry`]: process-wide class-level rule registry
//!
//! # Line unwrapping
//!
//! Inputs where one logical line spans several physical lines (SPICE
//! decks, backslash continuations, paragraphs) are joined before rules see
//! them; see [`WrapStyle`] and [`UnwrapRoutines`].

mod context;
mod engine;
mod error;
pub mod expr;
mod limits;
mod options;
mod record;
pub mod registry;
mod rule;
mod source;
mod stash;
mod unwrap;

pub use context::LineContext;
pub use engine::Parser;
pub use error::{SiftError, SiftErrorKind, SiftResult};
pub use expr::{ExprError, ExprResult, Value};
pub use limits::Limits;
pub use options::{LineTrimmer, Options, OptionsBuilder, TrimStyle};
pub use record::Record;
pub use registry::{ClassDefaults, RuleOverrides, RuleSelector};
pub use rule::{Anchor, Rule, RuleOpts};
pub use stash::Stash;
pub use unwrap::{IsWrappedFn, JoinFn, MultilineType, UnwrapRoutines, WrapStyle};
