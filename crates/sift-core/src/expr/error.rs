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

//! Unified error type for the rule expression mini-language.
//!
//! This enum covers both phases of an expression's life: compilation
//! (lexing and parsing of a rule source string) and evaluation (running the
//! compiled form against a line context). Compile errors surface at rule
//! definition time; evaluation errors abort the read that triggered them.

use thiserror::Error;

/// Error raised while compiling or evaluating a rule expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    // ==================== Lexing errors ====================
    /// Unexpected character in the source.
    #[error("offset {pos}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: usize },

    /// A string literal was not terminated.
    #[error("offset {pos}: unterminated string literal")]
    UnterminatedString { pos: usize },

    /// A regex literal was not terminated.
    #[error("offset {pos}: unterminated regex literal")]
    UnterminatedRegex { pos: usize },

    /// A malformed positional reference such as `${+}` or `${}`.
    #[error("offset {pos}: invalid field reference '{text}'")]
    InvalidFieldRef { text: String, pos: usize },

    /// A numeric literal failed to parse.
    #[error("offset {pos}: invalid number '{text}'")]
    InvalidNumber { text: String, pos: usize },

    // ==================== Parsing errors ====================
    /// Unexpected token.
    #[error("offset {pos}: unexpected {found}")]
    UnexpectedToken { found: String, pos: usize },

    /// Source ended where more input was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A regex literal failed to compile.
    #[error("invalid regex /{pattern}/: {message}")]
    InvalidRegex { pattern: String, message: String },

    /// Call to a function the mini-language does not provide.
    #[error("offset {pos}: unknown function '{name}'")]
    UnknownFunction { name: String, pos: usize },

    /// A known function called with the wrong number of arguments.
    #[error("offset {pos}: {name} expects {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: String,
        got: usize,
        pos: usize,
    },

    /// Assignment target is not a stash variable.
    #[error("offset {pos}: only stash variables can be assigned")]
    NotAssignable { pos: usize },

    /// Expression nesting exceeded the configured depth limit.
    #[error("expression nesting depth {depth} exceeds maximum {max}")]
    TooDeep { depth: usize, max: usize },

    // ==================== Evaluation errors ====================
    /// A field index fell outside the current field list.
    #[error("field index {index} out of range (NF = {nf})")]
    FieldOutOfRange { index: i64, nf: usize },

    /// A value had the wrong type for an operation.
    #[error("cannot apply {op} to {value}")]
    TypeMismatch { op: String, value: String },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Stash entry count exceeded the configured limit.
    #[error("stash entry count exceeds maximum {max}")]
    StashOverflow { max: usize },

    /// Line data was accessed from a context with no current line
    /// (a BEGIN or END rule).
    #[error("rule run improperly: no line context")]
    NoContext,
}

impl ExprError {
    /// Returns `true` if this error arises at compile time (lexing/parsing).
    #[inline]
    pub fn is_compile_error(&self) -> bool {
        !self.is_eval_error()
    }

    /// Returns `true` if this error arises while evaluating against a line.
    #[inline]
    pub fn is_eval_error(&self) -> bool {
        matches!(
            self,
            ExprError::FieldOutOfRange { .. }
                | ExprError::TypeMismatch { .. }
                | ExprError::DivisionByZero
                | ExprError::StashOverflow { .. }
                | ExprError::NoContext
        )
    }

    /// Get the source offset where this error occurred, if available.
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        match self {
            ExprError::UnexpectedChar { pos, .. }
            | ExprError::UnterminatedString { pos }
            | ExprError::UnterminatedRegex { pos }
            | ExprError::InvalidFieldRef { pos, .. }
            | ExprError::InvalidNumber { pos, .. }
            | ExprError::UnexpectedToken { pos, .. }
            | ExprError::UnknownFunction { pos, .. }
            | ExprError::WrongArity { pos, .. }
            | ExprError::NotAssignable { pos } => Some(*pos),
            _ => None,
        }
    }
}

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;
