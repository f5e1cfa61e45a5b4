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

//! The rule expression mini-language: compiler and evaluator.
//!
//! Rule predicates and actions are written in a small AWK-inspired surface:
//!
//! ```text
//! $0  $_            the whole logical line
//! $1 .. $N          fields, 1-based
//! ${-1}             fields from the end
//! ${2+}  ${-2+}     fields 2..last (or -2..last), joined
//! @{1+}             fields as a list
//! ~name             stash variable
//! $1 eq "NAME:"     string comparison (eq ne lt le gt ge)
//! NF >= 3           numeric comparison on the field count
//! $0 =~ /^#/        regex match
//! ~c++; return ~c   statements, separated by ;
//! ```
//!
//! Compilation is two-phase: [`token::tokenize`] lexes the positional
//! surface into dedicated tokens, [`parser`] builds a [`Program`] AST and
//! validates builtin names and arities. Evaluation interprets the AST
//! against a [`LineContext`](crate::context::LineContext). There is no
//! host-language eval: the language is closed, which keeps rule errors
//! predictable and sandboxed.

mod ast;
mod builtins;
mod error;
mod eval;
mod parser;
mod token;
mod value;

pub use ast::{AssignOp, BinaryOp, Expr, Program, Stmt, UnaryOp};
pub use error::{ExprError, ExprResult};
pub use eval::{eval_predicate, eval_program};
pub use value::Value;

/// Compile a predicate source: a single expression.
pub fn compile_predicate(source: &str, max_depth: usize) -> ExprResult<Program> {
    parser::parse_predicate(token::tokenize(source)?, max_depth)
}

/// Compile an action source: a statement list.
pub fn compile_action(source: &str, max_depth: usize) -> ExprResult<Program> {
    parser::parse_program(token::tokenize(source)?, max_depth)
}
