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

//! The parsing engine: the read loop and its public surface.
//!
//! A read proceeds as:
//!
//! 1. Reset per-read state (records, transient stash, line counter, abort).
//! 2. Run the BEGIN rule with an empty line context.
//! 3. Feed physical lines through the unwrap FSM; for each logical line,
//!    chomp/trim/split/measure indent, then walk the rule chain (class
//!    rules first, then instance rules). A matching rule stops the walk
//!    unless it is marked `continue_to_next`.
//! 4. Stop early when a rule called `abort_reading` (sticky, checked after
//!    each line's dispatch).
//! 5. Run the END rule, also after an abort. Errors skip it and propagate
//!    once the input source is released.
//!
//! Path sources are opened per read and closed on every exit path;
//! caller-supplied readers are borrowed for the read and handed back.

use crate::context::LineContext;
use crate::error::{SiftError, SiftResult};
use crate::expr::Value;
use crate::options::{Options, TrimStyle};
use crate::record::Record;
use crate::registry;
use crate::rule::{Rule, RuleOpts};
use crate::source::{open_path, LineFeed, Source};
use crate::stash::Stash;
use crate::unwrap::{MultilineType, UnwrapRoutines, Unwrapper, WrapStyle};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// A declarative, rule-driven text parser.
///
/// ```
/// use sift_core::{Parser, RuleOpts, Options, Record};
/// use regex::Regex;
///
/// let mut parser = Parser::with_options(
///     Options::builder()
///         .auto_split(true)
///         .field_separator(Regex::new(",").unwrap())
///         .build(),
/// );
/// parser
///     .add_rule(RuleOpts::new().action("return @{1+}"))
///     .unwrap();
/// parser.read_text("a,b,c\n1,2,3\n").unwrap();
///
/// let lists: Vec<_> = parser
///     .get_records()
///     .iter()
///     .filter_map(Record::as_list)
///     .collect();
/// assert_eq!(lists, vec![&["a", "b", "c"][..], &["1", "2", "3"][..]]);
/// ```
#[derive(Debug)]
pub struct Parser {
    options: Options,
    class: Option<String>,
    custom_unwrap: Option<UnwrapRoutines>,
    rules: Vec<Rule>,
    begin_rule: Option<Rule>,
    end_rule: Option<Rule>,
    source: Source,

    // Per-read state
    records: Vec<Record>,
    stash: Stash,
    lines_parsed: usize,
    aborted: bool,
    this_line: Option<String>,
    this_indent: usize,
    fields: Vec<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create an engine with the given options.
    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            class: None,
            custom_unwrap: None,
            rules: Vec::new(),
            begin_rule: None,
            end_rule: None,
            source: Source::None,
            records: Vec::new(),
            stash: Stash::new(),
            lines_parsed: 0,
            aborted: false,
            this_line: None,
            this_indent: 0,
            fields: Vec::new(),
        }
    }

    /// Create an engine bound to a registered rule class.
    ///
    /// The class's rules dispatch before any instance rules. A class with
    /// rules turns auto-split on; a class-installed custom unwrapper
    /// becomes the engine's wrap style.
    pub fn of_class(class: impl Into<String>) -> Self {
        Self::of_class_with_options(class, Options::default())
    }

    /// [`of_class`](Self::of_class) with explicit base options.
    pub fn of_class_with_options(class: impl Into<String>, mut options: Options) -> Self {
        let class = class.into();
        let defaults = registry::class_defaults(&class);
        if defaults.auto_split {
            options.auto_split = true;
        }
        if let Some(style) = defaults.line_wrap_style {
            options.line_wrap_style = style;
        }
        let mut parser = Self::with_options(options);
        parser.custom_unwrap = defaults.unwrap_routines;
        parser.class = Some(class);
        parser
    }

    /// The engine's options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The rule class this engine is bound to, if any.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The multiline direction implied by the configured wrap style.
    pub fn multiline_type(&self) -> MultilineType {
        match self.options.line_wrap_style.multiline_type() {
            Some(mt) => mt,
            None => self
                .custom_unwrap
                .as_ref()
                .map(|r| r.multiline_type)
                .unwrap_or(MultilineType::None),
        }
    }

    // ==================== Rules ====================

    /// Add an instance rule. Rules dispatch in insertion order, after any
    /// class rules.
    pub fn add_rule(&mut self, opts: RuleOpts) -> SiftResult<()> {
        if !opts.anchors().is_empty() {
            return Err(SiftError::registry(
                "before/after anchors apply to class rules only",
            ));
        }
        if self.rules.len() + 1 > self.options.limits.max_rules {
            return Err(SiftError::security(
                format!("rule count exceeds maximum {}", self.options.limits.max_rules),
                0,
            ));
        }
        let rule = Rule::compile(opts, &self.options.limits)?;
        self.rules.push(rule);
        Ok(())
    }

    /// Drop all rules, including BEGIN and END.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
        self.begin_rule = None;
        self.end_rule = None;
    }

    /// Set the BEGIN rule, run once before the first line with an empty
    /// line context. A second call concatenates the action source onto the
    /// existing rule. BEGIN values are never recorded.
    pub fn begin_rule(&mut self, opts: RuleOpts) -> SiftResult<()> {
        let rule = self.compile_boundary_rule(opts, "BEGIN")?;
        self.merge_boundary_rule(rule, true)
    }

    /// Set the END rule, run once after the last line (also after an
    /// abort) with an empty line context. Its value is recorded unless the
    /// rule says `dont_record`. A second call concatenates action sources.
    pub fn end_rule(&mut self, opts: RuleOpts) -> SiftResult<()> {
        let rule = self.compile_boundary_rule(opts, "END")?;
        self.merge_boundary_rule(rule, false)
    }

    fn compile_boundary_rule(&self, opts: RuleOpts, which: &str) -> SiftResult<Rule> {
        if opts.has_predicate() {
            return Err(SiftError::rule_shape(format!(
                "{} rule takes only an action",
                which
            )));
        }
        if !opts.has_action() {
            return Err(SiftError::rule_shape(format!(
                "{} rule needs an action",
                which
            )));
        }
        Rule::compile(opts, &self.options.limits)
    }

    fn merge_boundary_rule(&mut self, mut rule: Rule, is_begin: bool) -> SiftResult<()> {
        if is_begin {
            rule.set_dont_record(true)?;
        }
        let slot = if is_begin {
            &mut self.begin_rule
        } else {
            &mut self.end_rule
        };
        match slot {
            None => *slot = Some(rule),
            Some(existing) => {
                let appended = rule.action_src().unwrap_or_default().to_string();
                existing.append_action(&appended, &self.options.limits)?;
            }
        }
        Ok(())
    }

    /// Install custom unwrap routines. `line_wrap_style` must already be
    /// [`WrapStyle::Custom`].
    pub fn custom_line_unwrap_routines(&mut self, routines: UnwrapRoutines) -> SiftResult<()> {
        if self.options.line_wrap_style != WrapStyle::Custom {
            return Err(SiftError::unwrap(
                "line_wrap_style must be custom before installing unwrap routines",
                0,
            ));
        }
        self.custom_unwrap = Some(routines);
        Ok(())
    }

    // ==================== Input selection ====================

    /// The configured filename, if the current source is a path.
    pub fn filename(&self) -> Option<&Path> {
        match &self.source {
            Source::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Select a file path as the persistent input source, replacing any
    /// previous source. The path is validated now: it must exist, be
    /// readable and look like plain text.
    pub fn set_filename(&mut self, path: impl Into<PathBuf>) -> SiftResult<()> {
        let path = path.into();
        // Validation open; the per-read open happens in read()
        drop(open_path(&path)?);
        self.source = Source::Path(path);
        Ok(())
    }

    /// Select a caller-owned reader as the persistent input source,
    /// replacing any previous source. The engine never closes it.
    pub fn set_filehandle(&mut self, reader: impl BufRead + Send + 'static) {
        self.source = Source::Handle(Box::new(reader));
    }

    /// Select in-memory text as the persistent input source.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.source = Source::Text(text.into());
    }

    /// Clear the input source.
    pub fn clear_source(&mut self) {
        self.source = Source::None;
    }

    // ==================== Reading ====================

    /// Read from the configured source. With no source configured this is
    /// a no-op that leaves all state untouched.
    pub fn read(&mut self) -> SiftResult<()> {
        let source = std::mem::replace(&mut self.source, Source::None);
        match source {
            Source::None => Ok(()),
            Source::Path(path) => {
                let result = match open_path(&path) {
                    Ok(reader) => {
                        let limits = self.options.limits.clone();
                        self.read_feed(LineFeed::from_reader(reader, &limits))
                    }
                    Err(e) => Err(e),
                };
                // The reader (and file) is dropped by now, on every path
                self.source = Source::Path(path);
                result
            }
            Source::Handle(mut handle) => {
                let limits = self.options.limits.clone();
                let result = self.read_feed(LineFeed::from_reader(&mut handle, &limits));
                self.source = Source::Handle(handle);
                result
            }
            Source::Text(text) => {
                let limits = self.options.limits.clone();
                let result = self.read_feed(LineFeed::from_text(&text, &limits));
                self.source = Source::Text(text);
                result
            }
        }
    }

    /// Select `path` and read it.
    pub fn read_file(&mut self, path: impl Into<PathBuf>) -> SiftResult<()> {
        self.set_filename(path)?;
        self.read()
    }

    /// Select `reader` and read it.
    pub fn read_handle(&mut self, reader: impl BufRead + Send + 'static) -> SiftResult<()> {
        self.set_filehandle(reader);
        self.read()
    }

    /// Select `text` and read it.
    pub fn read_text(&mut self, text: impl Into<String>) -> SiftResult<()> {
        self.set_text(text);
        self.read()
    }

    fn read_feed(&mut self, mut feed: LineFeed<'_>) -> SiftResult<()> {
        // Per-read reset
        self.records.clear();
        self.stash.clear_transient();
        self.lines_parsed = 0;
        self.aborted = false;
        self.this_line = None;
        self.this_indent = 0;
        self.fields.clear();

        let class_rules = match &self.class {
            Some(class) => registry::rules_for(class),
            None => Vec::new(),
        };
        let total_rules = class_rules.len() + self.rules.len();
        if total_rules > self.options.limits.max_rules {
            return Err(SiftError::security(
                format!("rule count exceeds maximum {}", self.options.limits.max_rules),
                0,
            ));
        }

        if let Some(begin) = self.begin_rule.clone() {
            self.run_boundary_rule(&begin, 0)?;
        }

        let mut unwrapper = Unwrapper::new(
            self.options.line_wrap_style,
            self.custom_unwrap.as_ref(),
            self.options.limits.max_logical_line_length,
        )?;

        while let Some(raw) = feed.next_line()? {
            self.lines_parsed += 1;
            if let Some(logical) = unwrapper.push(raw, self.lines_parsed)? {
                self.process_logical(logical, &class_rules)?;
                if self.aborted {
                    break;
                }
            }
        }
        if !self.aborted {
            if let Some(pending) = unwrapper.finish(self.lines_parsed)? {
                self.process_logical(pending, &class_rules)?;
            }
        }

        if let Some(end) = self.end_rule.clone() {
            self.run_boundary_rule(&end, self.lines_parsed)?;
        }

        // Tear down the transient line context
        self.this_line = None;
        self.fields.clear();
        self.stash.clear_transient();
        Ok(())
    }

    /// Dispatch one logical line through the rule chain.
    fn process_logical(&mut self, mut line: String, class_rules: &[Rule]) -> SiftResult<()> {
        if self.options.auto_chomp {
            chomp_in_place(&mut line);
        }
        line = match &self.options.custom_line_trimmer {
            Some(trimmer) => trimmer(line),
            None => match self.options.auto_trim {
                TrimStyle::None => line,
                TrimStyle::Left => line.trim_start().to_string(),
                TrimStyle::Right => line.trim_end().to_string(),
                TrimStyle::Both => line.trim().to_string(),
            },
        };

        self.fields = if self.options.auto_split {
            // The line's outer whitespace goes before splitting so a
            // leading separator does not produce a phantom empty field.
            let trimmed = line.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                let fields: Vec<String> = self
                    .options
                    .field_separator
                    .split(trimmed)
                    .map(str::to_string)
                    .collect();
                if fields.len() > self.options.limits.max_fields {
                    return Err(SiftError::security(
                        format!(
                            "field count {} exceeds maximum {}",
                            fields.len(),
                            self.options.limits.max_fields
                        ),
                        self.lines_parsed,
                    ));
                }
                fields
            }
        } else {
            Vec::new()
        };

        self.this_indent = if self.options.track_indentation {
            count_indent(&line, &self.options.indentation_str)
        } else {
            0
        };

        self.this_line = Some(line.clone());

        let mut ctx = LineContext::new(
            Some(&line),
            self.lines_parsed,
            self.this_indent,
            self.lines_parsed,
            &mut self.fields,
            &mut self.stash,
            &mut self.aborted,
            &self.options.output_field_separator,
            self.options.auto_split,
            self.options.limits.max_stash_entries,
        );

        for rule in class_rules.iter().chain(self.rules.iter()) {
            if rule.test(&mut ctx)? {
                if let Some(record) = rule.run(&mut ctx)? {
                    if self.records.len() + 1 > self.options.limits.max_records {
                        return Err(SiftError::security(
                            format!(
                                "record count exceeds maximum {}",
                                self.options.limits.max_records
                            ),
                            self.lines_parsed,
                        ));
                    }
                    self.records.push(record);
                }
                if !rule.continue_to_next() {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run a BEGIN/END rule with an empty line context.
    fn run_boundary_rule(&mut self, rule: &Rule, nr: usize) -> SiftResult<()> {
        let mut empty_fields = Vec::new();
        let mut ctx = LineContext::new(
            None,
            nr,
            0,
            self.lines_parsed,
            &mut empty_fields,
            &mut self.stash,
            &mut self.aborted,
            &self.options.output_field_separator,
            self.options.auto_split,
            self.options.limits.max_stash_entries,
        );
        if let Some(record) = rule.run(&mut ctx)? {
            self.records.push(record);
        }
        Ok(())
    }

    // ==================== Records ====================

    /// All records accumulated by the last read (plus any pushed since).
    pub fn get_records(&self) -> &[Record] {
        &self.records
    }

    /// The most recent record.
    pub fn last_record(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Remove and return the most recent record.
    pub fn pop_record(&mut self) -> Option<Record> {
        self.records.pop()
    }

    /// Append records directly.
    pub fn push_records(&mut self, records: impl IntoIterator<Item = Record>) -> SiftResult<()> {
        for record in records {
            if self.records.len() + 1 > self.options.limits.max_records {
                return Err(SiftError::security(
                    format!(
                        "record count exceeds maximum {}",
                        self.options.limits.max_records
                    ),
                    0,
                ));
            }
            self.records.push(record);
        }
        Ok(())
    }

    // ==================== Stash ====================

    /// Read a stash variable (transient tier first, then persistent).
    pub fn stashed(&self, name: &str) -> Option<&Value> {
        self.stash.get(name)
    }

    /// Set a persistent (pre-stash) variable; it survives reads until
    /// forgotten.
    pub fn prestash(&mut self, name: impl Into<String>, value: impl Into<Value>) -> SiftResult<()> {
        let name = name.into();
        if !self.stash.contains(&name)
            && self.stash.raw_len() >= self.options.limits.max_stash_entries
        {
            return Err(SiftError::security(
                format!(
                    "stash entry count exceeds maximum {}",
                    self.options.limits.max_stash_entries
                ),
                0,
            ));
        }
        self.stash.set_persistent(name, value.into());
        Ok(())
    }

    /// Erase variables from both stash tiers.
    pub fn forget<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.stash.forget(name.as_ref());
        }
    }

    /// Whether the unified stash view contains `name`.
    pub fn has_stashed(&self, name: &str) -> bool {
        self.stash.contains(name)
    }

    /// Whether the unified stash view is empty.
    pub fn has_empty_stash(&self) -> bool {
        self.stash.is_empty()
    }

    // ==================== Read state ====================

    /// Physical lines consumed by the last read.
    pub fn lines_parsed(&self) -> usize {
        self.lines_parsed
    }

    /// Whether the last read was stopped by `abort_reading`.
    pub fn has_aborted(&self) -> bool {
        self.aborted
    }

    /// The last logical line of the current read, while one is held.
    pub fn this_line(&self) -> Option<&str> {
        self.this_line.as_deref()
    }

    /// The indentation count of the last logical line.
    pub fn this_indent(&self) -> usize {
        self.this_indent
    }

    /// Cooperatively stop the current read after the current line.
    pub fn abort_reading(&mut self) {
        self.aborted = true;
    }
}

/// Strip one trailing LF or CRLF in place.
fn chomp_in_place(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// Count leading repetitions of the indentation unit.
fn count_indent(line: &str, unit: &str) -> usize {
    if unit.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = line;
    while let Some(stripped) = rest.strip_prefix(unit) {
        count += 1;
        rest = stripped;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiftErrorKind;
    use regex::Regex;

    fn splitting_parser() -> Parser {
        Parser::with_options(Options::builder().auto_split(true).auto_chomp(true).build())
    }

    // ==================== Basic read loop ====================

    #[test]
    fn test_read_without_source_is_noop() {
        let mut p = Parser::new();
        p.read().unwrap();
        assert!(p.get_records().is_empty());
        assert_eq!(p.lines_parsed(), 0);
    }

    #[test]
    fn test_default_rule_records_lines() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("NF > 0")).unwrap();
        p.read_text("one\ntwo\n").unwrap();
        let got: Vec<_> = p.get_records().iter().filter_map(Record::as_str).collect();
        assert_eq!(got, vec!["one", "two"]);
        assert_eq!(p.lines_parsed(), 2);
    }

    #[test]
    fn test_records_cleared_between_reads() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("NF > 0")).unwrap();
        p.read_text("a\n").unwrap();
        assert_eq!(p.get_records().len(), 1);
        p.read_text("b\nc\n").unwrap();
        assert_eq!(p.get_records().len(), 2);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("$1 eq 'x'").action("return 'first'"))
            .unwrap();
        p.add_rule(RuleOpts::new().when("$1 eq 'x'").action("return 'second'"))
            .unwrap();
        p.read_text("x\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("first".into())]);
    }

    #[test]
    fn test_continue_to_next_keeps_dispatching() {
        let mut p = splitting_parser();
        p.add_rule(
            RuleOpts::new()
                .when("$1 eq 'x'")
                .action("~seen = 1")
                .dont_record(true)
                .continue_to_next(true),
        )
        .unwrap();
        p.add_rule(RuleOpts::new().when("~seen == 1").action("return 'both ran'"))
            .unwrap();
        p.read_text("x\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("both ran".into())]);
    }

    #[test]
    fn test_min_nf_skips_short_lines() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("$3 eq 'z'").action("return $3"))
            .unwrap();
        p.read_text("a b\nx y z\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("z".into())]);
    }

    // ==================== Options behavior ====================

    #[test]
    fn test_auto_chomp() {
        let mut p = Parser::with_options(
            Options::builder().auto_split(true).auto_chomp(true).build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text("keep\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("keep".into())]);
    }

    #[test]
    fn test_no_chomp_keeps_terminator() {
        let mut p = Parser::with_options(Options::builder().auto_split(true).build());
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text("keep\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("keep\n".into())]);
    }

    #[test]
    fn test_auto_trim_both() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .auto_trim(TrimStyle::Both)
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text("   padded   \n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("padded".into())]);
    }

    #[test]
    fn test_custom_line_trimmer() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .custom_line_trimmer(|s| s.trim_start_matches('>').trim().to_string())
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text(">>> quoted\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("quoted".into())]);
    }

    #[test]
    fn test_custom_field_separator() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .field_separator(Regex::new(",").unwrap())
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $2"))
            .unwrap();
        p.read_text("a,b,c\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("b".into())]);
    }

    #[test]
    fn test_track_indentation() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .track_indentation(true)
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return this_indent()"))
            .unwrap();
        p.read_text("none\n  two\n    four\n").unwrap();
        assert_eq!(
            p.get_records(),
            &[Record::Int(0), Record::Int(2), Record::Int(4)]
        );
    }

    #[test]
    fn test_indentation_unit() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .track_indentation(true)
                .indentation_str("    ")
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return this_indent()"))
            .unwrap();
        p.read_text("        deep\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Int(2)]);
    }

    #[test]
    fn test_blank_line_has_no_fields() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("NF == 0").action("return 'blank'"))
            .unwrap();
        p.read_text("\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("blank".into())]);
    }

    // ==================== BEGIN / END ====================

    #[test]
    fn test_begin_initializes_stash_without_recording() {
        let mut p = splitting_parser();
        p.begin_rule(RuleOpts::new().action("~c = 10")).unwrap();
        p.add_rule(
            RuleOpts::new()
                .when("NF > 0")
                .action("~c++")
                .dont_record(true),
        )
        .unwrap();
        p.end_rule(RuleOpts::new().action("return ~c")).unwrap();
        p.read_text("a\nb\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Int(12)]);
    }

    #[test]
    fn test_successive_begin_rules_concatenate() {
        let mut p = splitting_parser();
        p.begin_rule(RuleOpts::new().action("~a = 1")).unwrap();
        p.begin_rule(RuleOpts::new().action("~b = 2")).unwrap();
        p.end_rule(RuleOpts::new().action("return ~a + ~b")).unwrap();
        p.read_text("x\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Int(3)]);
    }

    #[test]
    fn test_begin_rule_with_predicate_rejected() {
        let mut p = Parser::new();
        let err = p
            .begin_rule(RuleOpts::new().when("1").action("~x = 1"))
            .unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::RuleShape);
    }

    #[test]
    fn test_begin_rule_touching_line_fails() {
        let mut p = splitting_parser();
        p.begin_rule(RuleOpts::new().action("return $0")).unwrap();
        let err = p.read_text("x\n").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::RuleRun);
    }

    #[test]
    fn test_end_runs_with_empty_input() {
        let mut p = splitting_parser();
        p.end_rule(RuleOpts::new().action("return 'done'")).unwrap();
        p.read_text("").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("done".into())]);
    }

    // ==================== Abort ====================

    #[test]
    fn test_abort_stops_after_current_line() {
        let mut p = splitting_parser();
        p.add_rule(
            RuleOpts::new()
                .when("$1 eq 'STOP'")
                .action("$this.abort_reading(); return $_"),
        )
        .unwrap();
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text("a\nSTOP\nc\n").unwrap();
        assert!(p.has_aborted());
        let got: Vec<_> = p.get_records().iter().filter_map(Record::as_str).collect();
        assert_eq!(got, vec!["a", "STOP"]);
    }

    #[test]
    fn test_end_runs_after_abort() {
        let mut p = splitting_parser();
        p.add_rule(
            RuleOpts::new()
                .when("NF > 0")
                .action("abort_reading()")
                .dont_record(true),
        )
        .unwrap();
        p.end_rule(RuleOpts::new().action("return 'end ran'")).unwrap();
        p.read_text("x\ny\n").unwrap();
        assert!(p.has_aborted());
        assert_eq!(p.get_records(), &[Record::Str("end ran".into())]);
        assert_eq!(p.lines_parsed(), 1);
    }

    #[test]
    fn test_abort_flag_reset_on_next_read() {
        let mut p = splitting_parser();
        p.add_rule(
            RuleOpts::new()
                .when("$1 eq 'STOP'")
                .action("abort_reading()")
                .dont_record(true),
        )
        .unwrap();
        p.read_text("STOP\n").unwrap();
        assert!(p.has_aborted());
        p.read_text("fine\n").unwrap();
        assert!(!p.has_aborted());
    }

    // ==================== Stash lifecycle ====================

    #[test]
    fn test_prestash_survives_reads() {
        let mut p = splitting_parser();
        p.prestash("marker", "persistent").unwrap();
        p.add_rule(RuleOpts::new().when("NF > 0").action("return ~marker"))
            .unwrap();
        p.read_text("x\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("persistent".into())]);
        p.read_text("y\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("persistent".into())]);
    }

    #[test]
    fn test_transient_stash_cleared_per_read() {
        let mut p = splitting_parser();
        p.add_rule(
            RuleOpts::new()
                .when("NF > 0")
                .action("~c++; return ~c"),
        )
        .unwrap();
        p.read_text("a\nb\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Int(1), Record::Int(2)]);
        p.read_text("c\n").unwrap();
        // Counter restarted: the transient tier was cleared
        assert_eq!(p.get_records(), &[Record::Int(1)]);
    }

    #[test]
    fn test_transient_delete_preserves_prestash() {
        let mut p = splitting_parser();
        p.prestash("k", "kept").unwrap();
        p.add_rule(
            RuleOpts::new()
                .when("NF > 0")
                .action("~k = 'shadow'; delete ~k; return ~k"),
        )
        .unwrap();
        p.read_text("x\n").unwrap();
        assert_eq!(p.get_records(), &[Record::Str("kept".into())]);
    }

    #[test]
    fn test_forget_erases_prestash() {
        let mut p = Parser::new();
        p.prestash("a", 1i64).unwrap();
        p.prestash("b", 2i64).unwrap();
        assert!(p.has_stashed("a"));
        p.forget(["a"]);
        assert!(!p.has_stashed("a"));
        assert!(p.has_stashed("b"));
        p.forget(["b"]);
        assert!(p.has_empty_stash());
    }

    // ==================== Records API ====================

    #[test]
    fn test_record_manipulation() {
        let mut p = Parser::new();
        p.push_records([Record::Int(1), Record::Int(2)]).unwrap();
        assert_eq!(p.last_record(), Some(&Record::Int(2)));
        assert_eq!(p.pop_record(), Some(Record::Int(2)));
        assert_eq!(p.get_records(), &[Record::Int(1)]);
    }

    // ==================== Unwrap integration ====================

    #[test]
    fn test_trailing_backslash_read() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .line_wrap_style(WrapStyle::TrailingBackslash)
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))
            .unwrap();
        p.read_text("Garbage In.\\\nGarbage Out!\n").unwrap();
        assert_eq!(
            p.get_records(),
            &[Record::Str("Garbage In. Garbage Out!".into())]
        );
        assert_eq!(p.lines_parsed(), 2);
    }

    #[test]
    fn test_unwrap_error_propagates_and_does_not_set_abort() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .line_wrap_style(WrapStyle::Spice)
                .build(),
        );
        let err = p.read_text("+ continuation first\n").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Unwrap);
        assert!(!p.has_aborted());
    }

    #[test]
    fn test_custom_unwrap_requires_custom_style() {
        let mut p = Parser::new();
        let routines = UnwrapRoutines::new(
            MultilineType::JoinNext,
            std::sync::Arc::new(|_, _| false),
            std::sync::Arc::new(|l, _| l),
        )
        .unwrap();
        let err = p.custom_line_unwrap_routines(routines).unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Unwrap);
    }

    #[test]
    fn test_custom_style_without_routines_fails_at_read() {
        let mut p = Parser::with_options(
            Options::builder().line_wrap_style(WrapStyle::Custom).build(),
        );
        let err = p.read_text("x\n").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Unwrap);
    }

    // ==================== Sources ====================

    #[test]
    fn test_read_handle() {
        let mut p = splitting_parser();
        p.add_rule(RuleOpts::new().when("NF > 0")).unwrap();
        let cursor = std::io::Cursor::new("h1\nh2\n".to_string());
        p.read_handle(cursor).unwrap();
        assert_eq!(p.get_records().len(), 2);
    }

    #[test]
    fn test_filename_and_filehandle_are_exclusive() {
        let mut p = Parser::new();
        p.set_filehandle(std::io::Cursor::new(String::new()));
        assert!(p.filename().is_none());
        p.set_text("x");
        assert!(p.filename().is_none());
    }

    #[test]
    fn test_set_filename_validates_eagerly() {
        let mut p = Parser::new();
        let err = p.set_filename("/no/such/sift/input.txt").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Input);
    }

    // ==================== Limits ====================

    #[test]
    fn test_max_records_limit() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .limits(crate::Limits {
                    max_records: 1,
                    ..crate::Limits::default()
                })
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0")).unwrap();
        let err = p.read_text("a\nb\n").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Security);
    }

    #[test]
    fn test_max_fields_limit() {
        let mut p = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .limits(crate::Limits {
                    max_fields: 2,
                    ..crate::Limits::default()
                })
                .build(),
        );
        p.add_rule(RuleOpts::new().when("NF > 0")).unwrap();
        let err = p.read_text("a b c\n").unwrap_err();
        assert_eq!(err.kind, SiftErrorKind::Security);
    }

    // ==================== Helpers ====================

    #[test]
    fn test_chomp_in_place() {
        let mut s = "x\r\n".to_string();
        chomp_in_place(&mut s);
        assert_eq!(s, "x");
        let mut s = "x".to_string();
        chomp_in_place(&mut s);
        assert_eq!(s, "x");
    }

    #[test]
    fn test_count_indent() {
        assert_eq!(count_indent("    x", " "), 4);
        assert_eq!(count_indent("    x", "  "), 2);
        assert_eq!(count_indent("x", " "), 0);
        assert_eq!(count_indent("\t\tx", "\t"), 2);
        assert_eq!(count_indent("x", ""), 0);
    }
}
