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

//! # Sift - Rule-Driven Text Parsing Engine
//!
//! Sift turns hand-written line-by-line read loops into declarative rules:
//! predicate/action pairs in a small AWK-inspired language that run over
//! the lines of a text input, collect records, and share a stash of named
//! variables.
//!
//! ## Quick Start
//!
//! ```rust
//! use sift::{Parser, RuleOpts, Options, Record};
//!
//! let mut parser = Parser::with_options(
//!     Options::builder().auto_split(true).auto_chomp(true).build(),
//! );
//!
//! // Count ERROR lines and keep their messages
//! parser.begin_rule(RuleOpts::new().action("~errors = 0")).unwrap();
//! parser
//!     .add_rule(
//!         RuleOpts::new()
//!             .when("$1 eq 'ERROR:'")
//!             .action("~errors++; return ${2+}"),
//!     )
//!     .unwrap();
//! parser.end_rule(RuleOpts::new().action("return ~errors")).unwrap();
//!
//! parser
//!     .read_text("ERROR: disk full\nINFO: fine\nERROR: flat tire\n")
//!     .unwrap();
//!
//! assert_eq!(parser.get_records().len(), 3); // two messages + the count
//! assert_eq!(parser.last_record(), Some(&Record::Int(2)));
//! ```
//!
//! ## Features
//!
//! - **Rules**: `if`-like predicates with `do`-like actions, compiled at
//!   definition time, dispatched in order with first-match-stops semantics
//!   (opt out per rule with `continue_to_next`)
//! - **Positional surface**: `$1`, `${-1}`, `${2+}`, `@{1+}` over
//!   auto-split fields
//! - **Stash**: `~name` variables shared between rules, with a persistent
//!   pre-stash tier surviving reads
//! - **Line unwrapping**: trailing-backslash, SPICE, paragraph and slurp
//!   styles, plus custom routines
//! - **Rule classes**: named, inheritable rule sets in a process-wide
//!   registry ([`registry`])
//!
//! ## Modules
//!
//! - [`expr`]: the rule expression mini-language
//! - [`registry`]: class-level rule registration and inheritance

// Re-export core types
pub use sift_core::{
    // Engine
    Parser,
    // Configuration
    Options,
    OptionsBuilder,
    TrimStyle,
    Limits,
    LineTrimmer,
    // Rules
    Rule,
    RuleOpts,
    Anchor,
    // Records and values
    Record,
    Value,
    // Line context
    LineContext,
    // Unwrapping
    WrapStyle,
    MultilineType,
    UnwrapRoutines,
    IsWrappedFn,
    JoinFn,
    // Errors
    SiftError,
    SiftErrorKind,
    SiftResult,
    ExprError,
    ExprResult,
    // Stash
    Stash,
};

// Error handling extensions
mod error_ext;
pub use error_ext::SiftResultExt;

// Re-export the expression mini-language
pub mod expr {
    //! The rule expression mini-language.
    pub use sift_core::expr::{
        compile_action, compile_predicate, eval_predicate, eval_program, AssignOp, BinaryOp,
        Expr, ExprError, ExprResult, Program, Stmt, UnaryOp, Value,
    };
}

// Re-export the class rule registry
pub mod registry {
    //! Process-wide class-level rule registry.
    pub use sift_core::registry::{
        applies_rule, class_defaults, clones_rule, define_class, disables_superclass_rules,
        reset, rule_names_for, rules_for, unwraps_lines_using, ClassDefaults, RuleOverrides,
        RuleSelector,
    };
}
