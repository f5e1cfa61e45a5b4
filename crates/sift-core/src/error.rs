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

//! Error types for the Sift engine.

use std::fmt;
use thiserror::Error;

/// The kind of error that occurred while configuring or running the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiftErrorKind {
    /// Input source problem: file not found, not readable, not plain text.
    Input,
    /// Line-unwrap violation: unexpected EOF with a pending buffer, a
    /// continuation with no previous line, or misconfigured custom routines.
    Unwrap,
    /// A rule predicate/action/precondition source failed to compile.
    RuleCompile,
    /// A rule was created with an illegal shape (no predicate and no action,
    /// or `continue_to_next` without `dont_record`).
    RuleShape,
    /// A rule action was run without a usable line context.
    RuleRun,
    /// Rule-class registry violation (duplicate names, bad anchors, ...).
    Registry,
    /// A rule predicate or action failed while evaluating during a read.
    Runtime,
    /// Security limit exceeded.
    Security,
}

impl fmt::Display for SiftErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "InputError"),
            Self::Unwrap => write!(f, "UnwrapError"),
            Self::RuleCompile => write!(f, "RuleCompileError"),
            Self::RuleShape => write!(f, "RuleShapeError"),
            Self::RuleRun => write!(f, "RuleRunError"),
            Self::Registry => write!(f, "RegistryError"),
            Self::Runtime => write!(f, "RuntimeError"),
            Self::Security => write!(f, "SecurityError"),
        }
    }
}

/// An error raised by the Sift engine.
///
/// Errors carry structured context: the kind, a human-readable message, the
/// physical line number where the failure occurred (0 when not tied to a
/// line), and optionally the offending rule source text and additional
/// context such as the normalized form of a rule that failed to compile.
#[derive(Debug, Clone, Error)]
#[error("{kind} at line {line}: {message}")]
pub struct SiftError {
    /// The kind of error.
    pub kind: SiftErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Physical line number (1-based; 0 when not applicable).
    pub line: usize,
    /// Column number (1-based, optional).
    pub column: Option<usize>,
    /// Additional context (e.g. the normalized rule body, or the pending
    /// unwrap buffer at EOF).
    pub context: Option<String>,
    /// The offending source text (e.g. the rule predicate/action as given).
    pub source_text: Option<String>,
}

impl SiftError {
    /// Create a new error.
    pub fn new(kind: SiftErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column: None,
            context: None,
            source_text: None,
        }
    }

    /// Add column information.
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Add context information.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach the offending source text.
    pub fn with_source_text(mut self, source: impl Into<String>) -> Self {
        self.source_text = Some(source.into());
        self
    }

    // Convenience constructors for each error kind

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(SiftErrorKind::Input, message, 0)
    }

    pub fn unwrap(message: impl Into<String>, line: usize) -> Self {
        Self::new(SiftErrorKind::Unwrap, message, line)
    }

    pub fn rule_compile(message: impl Into<String>) -> Self {
        Self::new(SiftErrorKind::RuleCompile, message, 0)
    }

    pub fn rule_shape(message: impl Into<String>) -> Self {
        Self::new(SiftErrorKind::RuleShape, message, 0)
    }

    pub fn rule_run(message: impl Into<String>, line: usize) -> Self {
        Self::new(SiftErrorKind::RuleRun, message, line)
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::new(SiftErrorKind::Registry, message, 0)
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        Self::new(SiftErrorKind::Runtime, message, line)
    }

    pub fn security(message: impl Into<String>, line: usize) -> Self {
        Self::new(SiftErrorKind::Security, message, line)
    }
}

/// Result type for Sift operations.
pub type SiftResult<T> = Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== SiftErrorKind Display tests ====================

    #[test]
    fn test_error_kind_display_input() {
        assert_eq!(format!("{}", SiftErrorKind::Input), "InputError");
    }

    #[test]
    fn test_error_kind_display_unwrap() {
        assert_eq!(format!("{}", SiftErrorKind::Unwrap), "UnwrapError");
    }

    #[test]
    fn test_error_kind_display_rule_compile() {
        assert_eq!(format!("{}", SiftErrorKind::RuleCompile), "RuleCompileError");
    }

    #[test]
    fn test_error_kind_display_rule_shape() {
        assert_eq!(format!("{}", SiftErrorKind::RuleShape), "RuleShapeError");
    }

    #[test]
    fn test_error_kind_display_rule_run() {
        assert_eq!(format!("{}", SiftErrorKind::RuleRun), "RuleRunError");
    }

    #[test]
    fn test_error_kind_display_registry() {
        assert_eq!(format!("{}", SiftErrorKind::Registry), "RegistryError");
    }

    #[test]
    fn test_error_kind_display_runtime() {
        assert_eq!(format!("{}", SiftErrorKind::Runtime), "RuntimeError");
    }

    #[test]
    fn test_error_kind_display_security() {
        assert_eq!(format!("{}", SiftErrorKind::Security), "SecurityError");
    }

    #[test]
    fn test_error_kind_equality() {
        assert_eq!(SiftErrorKind::Input, SiftErrorKind::Input);
        assert_ne!(SiftErrorKind::Input, SiftErrorKind::Unwrap);
    }

    // ==================== SiftError Display tests ====================

    #[test]
    fn test_error_display() {
        let err = SiftError::new(SiftErrorKind::Unwrap, "unexpected EOF", 42);
        let msg = format!("{}", err);
        assert!(msg.contains("UnwrapError"));
        assert!(msg.contains("line 42"));
        assert!(msg.contains("unexpected EOF"));
    }

    #[test]
    fn test_error_with_column() {
        let err = SiftError::unwrap("error", 5).with_column(10);
        assert_eq!(err.column, Some(10));
    }

    #[test]
    fn test_error_with_context() {
        let err = SiftError::rule_compile("bad token").with_context("field(1) eq");
        assert_eq!(err.context, Some("field(1) eq".to_string()));
    }

    #[test]
    fn test_error_with_source_text() {
        let err = SiftError::rule_compile("bad token").with_source_text("$1 eq");
        assert_eq!(err.source_text, Some("$1 eq".to_string()));
    }

    // ==================== Convenience constructor tests ====================

    #[test]
    fn test_error_input() {
        let err = SiftError::input("no such file");
        assert_eq!(err.kind, SiftErrorKind::Input);
        assert_eq!(err.line, 0);
    }

    #[test]
    fn test_error_unwrap() {
        let err = SiftError::unwrap("unexpected continuation", 1);
        assert_eq!(err.kind, SiftErrorKind::Unwrap);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_error_rule_compile() {
        let err = SiftError::rule_compile("unexpected token");
        assert_eq!(err.kind, SiftErrorKind::RuleCompile);
    }

    #[test]
    fn test_error_rule_shape() {
        let err = SiftError::rule_shape("illegal rule cont");
        assert_eq!(err.kind, SiftErrorKind::RuleShape);
    }

    #[test]
    fn test_error_rule_run() {
        let err = SiftError::rule_run("rule run improperly", 3);
        assert_eq!(err.kind, SiftErrorKind::RuleRun);
    }

    #[test]
    fn test_error_registry() {
        let err = SiftError::registry("duplicate rule name");
        assert_eq!(err.kind, SiftErrorKind::Registry);
    }

    #[test]
    fn test_error_runtime() {
        let err = SiftError::runtime("field out of range", 9);
        assert_eq!(err.kind, SiftErrorKind::Runtime);
        assert_eq!(err.line, 9);
    }

    #[test]
    fn test_error_security() {
        let err = SiftError::security("line too long", 10);
        assert_eq!(err.kind, SiftErrorKind::Security);
    }

    // ==================== Error trait tests ====================

    #[test]
    fn test_error_is_std_error() {
        fn accepts_error<E: std::error::Error>(_: E) {}
        accepts_error(SiftError::input("test"));
    }

    #[test]
    fn test_error_clone() {
        let original = SiftError::rule_compile("message")
            .with_source_text("$1 +")
            .with_context("normalized");
        let cloned = original.clone();
        assert_eq!(original.kind, cloned.kind);
        assert_eq!(original.message, cloned.message);
        assert_eq!(original.source_text, cloned.source_text);
        assert_eq!(original.context, cloned.context);
    }

    #[test]
    fn test_error_chained_builders() {
        let err = SiftError::unwrap("error", 5)
            .with_column(10)
            .with_context("pending buffer");
        assert_eq!(err.column, Some(10));
        assert_eq!(err.context, Some("pending buffer".to_string()));
    }
}
