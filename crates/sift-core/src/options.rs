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

//! Engine configuration.
//!
//! `Options` provides both direct field access and a fluent builder API.
//!
//! ```
//! use sift_core::{Options, TrimStyle, WrapStyle};
//! use regex::Regex;
//!
//! let opts = Options::builder()
//!     .auto_chomp(true)
//!     .auto_split(true)
//!     .field_separator(Regex::new(",").unwrap())
//!     .line_wrap_style(WrapStyle::TrailingBackslash)
//!     .build();
//! assert_eq!(opts.auto_trim, TrimStyle::None);
//! ```

use crate::limits::Limits;
use crate::unwrap::WrapStyle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Default field separator: runs of whitespace.
static DEFAULT_FS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Whitespace trimming applied to each logical line before splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimStyle {
    /// Leave the line as read.
    #[default]
    None,
    /// Trim leading whitespace.
    Left,
    /// Trim trailing whitespace.
    Right,
    /// Trim both ends.
    Both,
}

/// A user-supplied replacement for the built-in trimming.
pub type LineTrimmer = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Configuration for a [`Parser`](crate::Parser).
#[derive(Clone)]
pub struct Options {
    /// Strip the line terminator from each logical line.
    pub auto_chomp: bool,
    /// Split each logical line into fields on `field_separator`.
    pub auto_split: bool,
    /// Built-in whitespace trimming (ignored if a custom trimmer is set).
    pub auto_trim: TrimStyle,
    /// Custom trimmer; replaces `auto_trim` when present.
    pub custom_line_trimmer: Option<LineTrimmer>,
    /// Field separator used by auto-split (default: `\s+`).
    pub field_separator: Regex,
    /// Separator used when joining field ranges (default: a single space).
    pub output_field_separator: String,
    /// Count leading `indentation_str` repetitions per line.
    pub track_indentation: bool,
    /// The indentation unit (default: one space).
    pub indentation_str: String,
    /// How physical lines join into logical lines.
    pub line_wrap_style: WrapStyle,
    /// Security limits.
    pub limits: Limits,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            auto_chomp: false,
            auto_split: false,
            auto_trim: TrimStyle::None,
            custom_line_trimmer: None,
            field_separator: DEFAULT_FS.clone(),
            output_field_separator: " ".to_string(),
            track_indentation: false,
            indentation_str: " ".to_string(),
            line_wrap_style: WrapStyle::None,
            limits: Limits::default(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("auto_chomp", &self.auto_chomp)
            .field("auto_split", &self.auto_split)
            .field("auto_trim", &self.auto_trim)
            .field(
                "custom_line_trimmer",
                &self.custom_line_trimmer.as_ref().map(|_| "<fn>"),
            )
            .field("field_separator", &self.field_separator.as_str())
            .field("output_field_separator", &self.output_field_separator)
            .field("track_indentation", &self.track_indentation)
            .field("indentation_str", &self.indentation_str)
            .field("line_wrap_style", &self.line_wrap_style)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Options {
    /// Create a new builder.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

/// Builder for ergonomic construction of [`Options`].
#[derive(Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            options: Options::default(),
        }
    }

    /// Strip line terminators from logical lines.
    pub fn auto_chomp(mut self, flag: bool) -> Self {
        self.options.auto_chomp = flag;
        self
    }

    /// Split logical lines into fields.
    pub fn auto_split(mut self, flag: bool) -> Self {
        self.options.auto_split = flag;
        self
    }

    /// Set the built-in trim style.
    pub fn auto_trim(mut self, style: TrimStyle) -> Self {
        self.options.auto_trim = style;
        self
    }

    /// Install a custom line trimmer, replacing the built-in trimming.
    pub fn custom_line_trimmer(
        mut self,
        trimmer: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.options.custom_line_trimmer = Some(Arc::new(trimmer));
        self
    }

    /// Set the field separator regex.
    pub fn field_separator(mut self, fs: Regex) -> Self {
        self.options.field_separator = fs;
        self
    }

    /// Set the separator used when joining field ranges.
    pub fn output_field_separator(mut self, ofs: impl Into<String>) -> Self {
        self.options.output_field_separator = ofs.into();
        self
    }

    /// Track leading indentation per line.
    pub fn track_indentation(mut self, flag: bool) -> Self {
        self.options.track_indentation = flag;
        self
    }

    /// Set the indentation unit counted by indent tracking.
    pub fn indentation_str(mut self, unit: impl Into<String>) -> Self {
        self.options.indentation_str = unit.into();
        self
    }

    /// Select the line-unwrap style.
    pub fn line_wrap_style(mut self, style: WrapStyle) -> Self {
        self.options.line_wrap_style = style;
        self
    }

    /// Replace the security limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.options.limits = limits;
        self
    }

    /// Finish the builder.
    pub fn build(self) -> Options {
        self.options
    }
}
