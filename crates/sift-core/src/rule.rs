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

//! Rules: compiled predicate/action pairs.
//!
//! A rule tests a line context with its predicate (plus any preconditions,
//! ANDed in order before it) and, when the test passes, runs its action.
//! The action's value becomes a record unless `dont_record` is set. Rules
//! are compiled once at definition time; a source that fails to compile is
//! rejected synchronously with the offending text attached.

use crate::context::LineContext;
use crate::error::{SiftError, SiftResult};
use crate::expr::{self, ExprError, Program};
use crate::limits::Limits;
use crate::record::Record;

/// Position anchor for rules registered into a class: insert the new rule
/// before or after an inherited rule, named by its fully-qualified
/// `Class/rule` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Before(String),
    After(String),
}

/// Options for defining a rule.
///
/// At least one of a predicate (`when`) and an action (`action`) is
/// required. A missing predicate matches every line; a missing action
/// returns the whole line. `continue_to_next` may only be combined with
/// `dont_record`.
#[derive(Debug, Clone, Default)]
pub struct RuleOpts {
    name: Option<String>,
    predicate: Option<String>,
    action: Option<String>,
    dont_record: bool,
    continue_to_next: bool,
    preconditions: Vec<String>,
    anchors: Vec<Anchor>,
}

impl RuleOpts {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the rule (required for class-registered rules).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the predicate source (the `if` of the rule).
    pub fn when(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Set the action source (the `do` of the rule).
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Don't push the action's value onto the record list.
    pub fn dont_record(mut self, flag: bool) -> Self {
        self.dont_record = flag;
        self
    }

    /// Keep dispatching further rules after this one matches.
    pub fn continue_to_next(mut self, flag: bool) -> Self {
        self.continue_to_next = flag;
        self
    }

    /// Add a precondition, ANDed before the predicate in order of addition.
    pub fn precondition(mut self, predicate: impl Into<String>) -> Self {
        self.preconditions.push(predicate.into());
        self
    }

    /// Insert before an inherited rule (class registration only).
    pub fn before(mut self, qualified_name: impl Into<String>) -> Self {
        self.anchors.push(Anchor::Before(qualified_name.into()));
        self
    }

    /// Insert after an inherited rule (class registration only).
    pub fn after(mut self, qualified_name: impl Into<String>) -> Self {
        self.anchors.push(Anchor::After(qualified_name.into()));
        self
    }

    pub(crate) fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub(crate) fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    pub(crate) fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub(crate) fn take_parts(
        self,
    ) -> (
        Option<String>,
        Option<String>,
        Option<String>,
        bool,
        bool,
        Vec<String>,
    ) {
        (
            self.name,
            self.predicate,
            self.action,
            self.dont_record,
            self.continue_to_next,
            self.preconditions,
        )
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: Option<String>,
    predicate_src: Option<String>,
    action_src: Option<String>,
    /// `None` means always-true (missing or blank predicate).
    predicate: Option<Program>,
    /// `None` means a blank action source: run is a no-op. A missing
    /// action compiles to the default "return the whole line".
    action: Option<Program>,
    preconditions: Vec<(String, Program)>,
    min_nf: usize,
    dont_record: bool,
    continue_to_next: bool,
}

impl Rule {
    /// Compile a rule from options.
    pub fn compile(opts: RuleOpts, limits: &Limits) -> SiftResult<Self> {
        if !opts.has_predicate() && !opts.has_action() {
            return Err(SiftError::rule_shape(
                "rule must have at least one of a predicate and an action",
            ));
        }

        let (name, predicate_src, action_src, dont_record, continue_to_next, precondition_srcs) =
            opts.take_parts();

        if continue_to_next && !dont_record {
            return Err(SiftError::rule_shape(
                "illegal rule cont: continue_to_next requires dont_record",
            ));
        }

        let predicate = match &predicate_src {
            Some(src) if !src.trim().is_empty() => {
                Some(compile_predicate_src(src, limits)?)
            }
            _ => None,
        };

        let action = match &action_src {
            None => Some(compile_action_src("return $0", limits)?),
            Some(src) if src.trim().is_empty() => None,
            Some(src) => Some(compile_action_src(src, limits)?),
        };

        let mut preconditions = Vec::with_capacity(precondition_srcs.len());
        for src in precondition_srcs {
            let program = compile_predicate_src(&src, limits)?;
            preconditions.push((src, program));
        }

        let mut rule = Self {
            name,
            predicate_src,
            action_src,
            predicate,
            action,
            preconditions,
            min_nf: 0,
            dont_record,
            continue_to_next,
        };
        rule.recompute_min_nf();
        Ok(rule)
    }

    /// The rule's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// The original predicate source.
    pub fn predicate_src(&self) -> Option<&str> {
        self.predicate_src.as_deref()
    }

    /// The original action source.
    pub fn action_src(&self) -> Option<&str> {
        self.action_src.as_deref()
    }

    /// The smallest field count a line needs for this rule to be tested.
    pub fn min_nf(&self) -> usize {
        self.min_nf
    }

    /// Whether the action's value is kept off the record list.
    pub fn dont_record(&self) -> bool {
        self.dont_record
    }

    /// Whether dispatch continues past this rule after a match.
    pub fn continue_to_next(&self) -> bool {
        self.continue_to_next
    }

    /// Replace the predicate. Used by clone-with-overrides.
    pub(crate) fn set_predicate(&mut self, src: &str, limits: &Limits) -> SiftResult<()> {
        self.predicate = if src.trim().is_empty() {
            None
        } else {
            Some(compile_predicate_src(src, limits)?)
        };
        self.predicate_src = Some(src.to_string());
        self.recompute_min_nf();
        Ok(())
    }

    /// Replace the action. Used by clone-with-overrides.
    pub(crate) fn set_action(&mut self, src: &str, limits: &Limits) -> SiftResult<()> {
        self.action = if src.trim().is_empty() {
            None
        } else {
            Some(compile_action_src(src, limits)?)
        };
        self.action_src = Some(src.to_string());
        self.recompute_min_nf();
        Ok(())
    }

    /// Append statements to the action source and recompile.
    pub(crate) fn append_action(&mut self, src: &str, limits: &Limits) -> SiftResult<()> {
        let combined = match self.action_src.as_deref() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}; {}", existing.trim_end_matches(';'), src)
            }
            _ => src.to_string(),
        };
        self.set_action(&combined, limits)
    }

    /// Prepend statements to the action source and recompile.
    pub(crate) fn prepend_action(&mut self, src: &str, limits: &Limits) -> SiftResult<()> {
        let combined = match self.action_src.as_deref() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}; {}", src.trim_end_matches(';'), existing)
            }
            _ => src.to_string(),
        };
        self.set_action(&combined, limits)
    }

    pub(crate) fn set_dont_record(&mut self, flag: bool) -> SiftResult<()> {
        if !flag && self.continue_to_next {
            return Err(SiftError::rule_shape(
                "illegal rule cont: continue_to_next requires dont_record",
            ));
        }
        self.dont_record = flag;
        Ok(())
    }

    pub(crate) fn set_continue_to_next(&mut self, flag: bool) -> SiftResult<()> {
        if flag && !self.dont_record {
            return Err(SiftError::rule_shape(
                "illegal rule cont: continue_to_next requires dont_record",
            ));
        }
        self.continue_to_next = flag;
        Ok(())
    }

    /// Add a precondition; its compiled form is ANDed before the predicate.
    pub fn add_precondition(&mut self, src: &str, limits: &Limits) -> SiftResult<()> {
        let program = compile_predicate_src(src, limits)?;
        self.preconditions.push((src.to_string(), program));
        self.recompute_min_nf();
        Ok(())
    }

    fn recompute_min_nf(&mut self) {
        let mut min_nf = 0;
        if let Some(p) = &self.predicate {
            min_nf = min_nf.max(p.min_nf());
        }
        if let Some(a) = &self.action {
            min_nf = min_nf.max(a.min_nf());
        }
        for (_, p) in &self.preconditions {
            min_nf = min_nf.max(p.min_nf());
        }
        self.min_nf = min_nf;
    }

    /// Test this rule against a line context.
    ///
    /// Returns `false` without evaluating anything when auto-split is off
    /// or the line has fewer fields than `min_nf`. Preconditions run in
    /// order with short-circuit AND before the predicate.
    pub fn test(&self, ctx: &mut LineContext<'_>) -> SiftResult<bool> {
        if !ctx.auto_split() || ctx.nf() < self.min_nf {
            return Ok(false);
        }
        for (_, pre) in &self.preconditions {
            if !expr::eval_predicate(pre, ctx).map_err(|e| eval_error(e, ctx.nr()))? {
                return Ok(false);
            }
        }
        match &self.predicate {
            None => Ok(true),
            Some(p) => expr::eval_predicate(p, ctx).map_err(|e| eval_error(e, ctx.nr())),
        }
    }

    /// Run this rule's action against a line context.
    ///
    /// Returns the record to accumulate, or `None` when the action source
    /// is blank or `dont_record` is set. An explicit undef return value is
    /// a real record ([`Record::Null`]).
    pub fn run(&self, ctx: &mut LineContext<'_>) -> SiftResult<Option<Record>> {
        let Some(action) = &self.action else {
            return Ok(None);
        };
        let value = expr::eval_program(action, ctx).map_err(|e| eval_error(e, ctx.nr()))?;
        if self.dont_record {
            return Ok(None);
        }
        Ok(Some(Record::from(value)))
    }
}

fn compile_predicate_src(src: &str, limits: &Limits) -> SiftResult<Program> {
    expr::compile_predicate(src, limits.max_expr_depth).map_err(|e| compile_error(src, e))
}

fn compile_action_src(src: &str, limits: &Limits) -> SiftResult<Program> {
    expr::compile_action(src, limits.max_expr_depth).map_err(|e| compile_error(src, e))
}

fn compile_error(src: &str, err: ExprError) -> SiftError {
    let mut sift = SiftError::rule_compile(err.to_string()).with_source_text(src);
    if let Some(offset) = err.offset() {
        sift = sift.with_column(offset + 1);
    }
    sift
}

/// Map an evaluation failure onto the engine error taxonomy. Accessing
/// line data from a context-less (BEGIN/END) run is the "rule run
/// improperly" case; stash overflow is a security limit; everything else
/// is a runtime rule failure.
fn eval_error(err: ExprError, line: usize) -> SiftError {
    match &err {
        ExprError::NoContext => SiftError::rule_run(err.to_string(), line),
        ExprError::StashOverflow { .. } => SiftError::security(err.to_string(), line),
        _ => SiftError::runtime(err.to_string(), line),
    }
}
