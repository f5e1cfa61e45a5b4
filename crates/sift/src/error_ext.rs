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

//! Error context helpers for improved ergonomics.
//!
//! This module provides an extension trait for `Result<T, SiftError>` (and
//! `Result<T, std::io::Error>`) that makes it easy to add contextual
//! information to errors as they propagate through the call stack.
//!
//! # Examples
//!
//! ```rust
//! use sift::{Parser, SiftResultExt};
//!
//! fn scan_log(parser: &mut Parser, path: &str) -> Result<usize, sift::SiftError> {
//!     parser
//!         .read_file(path)
//!         .with_context(|| format!("while scanning {}", path))?;
//!     Ok(parser.get_records().len())
//! }
//! ```
//!
//! Converting foreign errors:
//!
//! ```rust
//! use sift::{SiftError, SiftResultExt};
//! use std::fs;
//!
//! fn read_rules(path: &str) -> Result<String, SiftError> {
//!     fs::read_to_string(path)
//!         .map_err_to_sift(|e| SiftError::input(format!("failed to read {}: {}", path, e)))
//! }
//! ```

use crate::SiftError;
use std::fmt;

/// Extension trait for adding context to results carrying [`SiftError`].
///
/// Context is appended to the error's `context` field without modifying
/// the original message. `context` evaluates its message eagerly; prefer
/// [`with_context`](SiftResultExt::with_context) when the message is
/// expensive to build, since the closure only runs on the error path.
pub trait SiftResultExt<T> {
    /// The error type of the underlying result.
    type ErrorType;

    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T, SiftError>
    where
        C: fmt::Display;

    /// Add context to an error using a closure, evaluated only on the
    /// error path.
    fn with_context<C, F>(self, f: F) -> Result<T, SiftError>
    where
        C: fmt::Display,
        F: FnOnce() -> C;

    /// Convert a foreign error type to [`SiftError`] with full access to
    /// the original error.
    fn map_err_to_sift<F>(self, f: F) -> Result<T, SiftError>
    where
        F: FnOnce(Self::ErrorType) -> SiftError,
        Self: Sized;
}

impl<T> SiftResultExt<T> for Result<T, SiftError> {
    type ErrorType = SiftError;

    fn context<C>(self, context: C) -> Result<T, SiftError>
    where
        C: fmt::Display,
    {
        self.map_err(|e| append_context(e, context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, SiftError>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| append_context(e, f().to_string()))
    }

    fn map_err_to_sift<F>(self, _f: F) -> Result<T, SiftError>
    where
        F: FnOnce(Self::ErrorType) -> SiftError,
    {
        // The error already is a SiftError; nothing to convert
        self
    }
}

impl<T> SiftResultExt<T> for Result<T, std::io::Error> {
    type ErrorType = std::io::Error;

    fn context<C>(self, context: C) -> Result<T, SiftError>
    where
        C: fmt::Display,
    {
        self.map_err(|e| append_context(SiftError::input(e.to_string()), context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, SiftError>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| append_context(SiftError::input(e.to_string()), f().to_string()))
    }

    fn map_err_to_sift<F>(self, f: F) -> Result<T, SiftError>
    where
        F: FnOnce(Self::ErrorType) -> SiftError,
    {
        self.map_err(f)
    }
}

fn append_context(mut error: SiftError, context: String) -> SiftError {
    error.context = Some(match error.context.take() {
        None => context,
        Some(existing) => format!("{}; {}", existing, context),
    });
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SiftErrorKind;

    fn failing() -> Result<(), SiftError> {
        Err(SiftError::input("boom"))
    }

    #[test]
    fn test_context_added() {
        let err = failing().context("while testing").unwrap_err();
        assert_eq!(err.context.as_deref(), Some("while testing"));
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_context_chains() {
        let err = failing()
            .context("inner")
            .context("outer")
            .unwrap_err();
        let ctx = err.context.unwrap();
        assert!(ctx.contains("inner"));
        assert!(ctx.contains("outer"));
    }

    #[test]
    fn test_with_context_lazy() {
        let ok: Result<i32, SiftError> = Ok(1);
        let mut called = false;
        let got = ok.with_context(|| {
            called = true;
            "never"
        });
        assert_eq!(got.unwrap(), 1);
        assert!(!called);
    }

    #[test]
    fn test_io_error_conversion() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = io.context("reading input").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Input);
        assert!(err.message.contains("gone"));
        assert_eq!(err.context.as_deref(), Some("reading input"));
    }

    #[test]
    fn test_map_err_to_sift() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        let err = io
            .map_err_to_sift(|e| SiftError::input(format!("wrapped: {}", e)))
            .unwrap_err();
        assert!(err.message.contains("wrapped: nope"));
    }
}
