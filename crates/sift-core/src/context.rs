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

//! The per-line context rules evaluate against.
//!
//! A `LineContext` is built for each logical line and torn down after rule
//! dispatch for that line completes. It borrows the engine's mutable state
//! (fields, stash, abort flag) for that window, so mutations made by one
//! rule (a `splice_fields`, a stash write) are visible to the rules that
//! run after it on the same line.
//!
//! Field indexing at this level is 0-based with negative-from-end, matching
//! the positional builtins; the `$N` surface is 1-based and lowers onto it.

use crate::expr::{ExprError, ExprResult, Value};
use crate::stash::Stash;

/// Context for one logical line (or an empty context for BEGIN/END rules).
#[derive(Debug)]
pub struct LineContext<'a> {
    /// The logical line; `None` for BEGIN/END dispatch.
    line: Option<&'a str>,
    /// Physical line number at the end of this logical line (1-based).
    nr: usize,
    /// Leading indentation count; 0 unless indent tracking is on.
    indent: usize,
    /// Physical lines consumed so far in this read.
    lines_parsed: usize,
    fields: &'a mut Vec<String>,
    stash: &'a mut Stash,
    aborted: &'a mut bool,
    ofs: &'a str,
    auto_split: bool,
    max_stash_entries: usize,
}

impl<'a> LineContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        line: Option<&'a str>,
        nr: usize,
        indent: usize,
        lines_parsed: usize,
        fields: &'a mut Vec<String>,
        stash: &'a mut Stash,
        aborted: &'a mut bool,
        ofs: &'a str,
        auto_split: bool,
        max_stash_entries: usize,
    ) -> Self {
        Self {
            line,
            nr,
            indent,
            lines_parsed,
            fields,
            stash,
            aborted,
            ofs,
            auto_split,
            max_stash_entries,
        }
    }

    /// Number of fields on this line; 0 when auto-split is off.
    pub fn nf(&self) -> usize {
        self.fields.len()
    }

    /// Whether the engine splits lines into fields.
    pub fn auto_split(&self) -> bool {
        self.auto_split
    }

    /// The full logical line. Fails with `NoContext` in BEGIN/END dispatch.
    pub fn this_line(&self) -> ExprResult<&str> {
        self.line.ok_or(ExprError::NoContext)
    }

    /// Physical line number at the end of this logical line.
    pub fn nr(&self) -> usize {
        self.nr
    }

    /// Leading indentation count.
    pub fn this_indent(&self) -> usize {
        self.indent
    }

    /// Physical lines consumed so far in this read.
    pub fn lines_parsed(&self) -> usize {
        self.lines_parsed
    }

    /// The configured output field separator.
    pub fn ofs(&self) -> &str {
        self.ofs
    }

    /// Resolve a 0-based index (negative counts from the end).
    fn resolve(&self, i: i64) -> ExprResult<usize> {
        let nf = self.nf() as i64;
        let resolved = if i < 0 { nf + i } else { i };
        if resolved < 0 || resolved >= nf {
            return Err(ExprError::FieldOutOfRange {
                index: i,
                nf: self.nf(),
            });
        }
        Ok(resolved as usize)
    }

    /// The field at `i` (0-based; negative from end). Out of range fails.
    pub fn field(&self, i: i64) -> ExprResult<&str> {
        let idx = self.resolve(i)?;
        Ok(&self.fields[idx])
    }

    /// Fields from `i` to `j` inclusive. Negative indices resolve from the
    /// end; if `i` resolves past `j` the range is returned reversed.
    pub fn field_range(&self, i: i64, j: i64) -> ExprResult<Vec<String>> {
        let a = self.resolve(i)?;
        let b = self.resolve(j)?;
        if a <= b {
            Ok(self.fields[a..=b].to_vec())
        } else {
            Ok(self.fields[b..=a].iter().rev().cloned().collect())
        }
    }

    /// `field_range(i, j)` joined with `sep`, defaulting to the output
    /// field separator.
    pub fn join_range(&self, i: i64, j: i64, sep: Option<&str>) -> ExprResult<String> {
        let parts = self.field_range(i, j)?;
        Ok(parts.join(sep.unwrap_or(self.ofs)))
    }

    /// First field satisfying `pred`.
    pub fn find_field<F: Fn(&str) -> bool>(&self, pred: F) -> Option<&str> {
        self.fields.iter().map(String::as_str).find(|f| pred(f))
    }

    /// Index of the first field satisfying `pred`.
    pub fn find_field_index<F: Fn(&str) -> bool>(&self, pred: F) -> Option<usize> {
        self.fields.iter().position(|f| pred(f))
    }

    /// Splice the field list: remove `len` fields at `offset` (negative
    /// offset counts from the end, a missing `len` means "to the end", a
    /// negative `len` leaves that many fields at the end), then insert
    /// `replacement` in their place. Returns the removed fields.
    ///
    /// The mutation is visible to rules that run later on the same line.
    pub fn splice_fields(
        &mut self,
        offset: i64,
        len: Option<i64>,
        replacement: Vec<String>,
    ) -> Vec<String> {
        let nf = self.fields.len() as i64;
        let start = if offset < 0 {
            (nf + offset).max(0)
        } else {
            offset.min(nf)
        } as usize;

        let end = match len {
            None => nf,
            Some(l) if l < 0 => (nf + l).max(start as i64),
            Some(l) => (start as i64 + l).min(nf),
        } as usize;

        self.fields.splice(start..end, replacement).collect()
    }

    /// Read a stash variable through the unified view.
    pub fn stashed(&self, name: &str) -> Value {
        self.stash.get(name).cloned().unwrap_or(Value::Undef)
    }

    /// Write a stash variable (transient tier).
    pub fn stash_set(&mut self, name: &str, value: Value) -> ExprResult<()> {
        if !self.stash.contains(name) && self.stash.raw_len() >= self.max_stash_entries {
            return Err(ExprError::StashOverflow {
                max: self.max_stash_entries,
            });
        }
        self.stash.set(name, value);
        Ok(())
    }

    /// Erase a transient stash entry, returning the removed value.
    pub fn stash_delete(&mut self, name: &str) -> Value {
        self.stash.delete_transient(name).unwrap_or(Value::Undef)
    }

    /// Request a cooperative stop after this line's rule dispatch.
    pub fn abort_reading(&mut self) {
        *self.aborted = true;
    }

    /// Whether an abort has been requested.
    pub fn has_aborted(&self) -> bool {
        *self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        fields: Vec<String>,
        stash: Stash,
        aborted: bool,
    }

    impl Fixture {
        fn new(fields: &[&str]) -> Self {
            Self {
                fields: fields.iter().map(|s| s.to_string()).collect(),
                stash: Stash::new(),
                aborted: false,
            }
        }

        fn ctx<'a>(&'a mut self, line: &'a str) -> LineContext<'a> {
            LineContext::new(
                Some(line),
                1,
                0,
                1,
                &mut self.fields,
                &mut self.stash,
                &mut self.aborted,
                " ",
                true,
                usize::MAX,
            )
        }
    }

    // ==================== Field access tests ====================

    #[test]
    fn test_nf() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        assert_eq!(fx.ctx("a b c").nf(), 3);
    }

    #[test]
    fn test_field_positive() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        let ctx = fx.ctx("a b c");
        assert_eq!(ctx.field(0).unwrap(), "a");
        assert_eq!(ctx.field(2).unwrap(), "c");
    }

    #[test]
    fn test_field_negative() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        let ctx = fx.ctx("a b c");
        assert_eq!(ctx.field(-1).unwrap(), "c");
        assert_eq!(ctx.field(-3).unwrap(), "a");
    }

    #[test]
    fn test_field_out_of_range() {
        let mut fx = Fixture::new(&["a", "b"]);
        let ctx = fx.ctx("a b");
        assert!(matches!(
            ctx.field(2),
            Err(ExprError::FieldOutOfRange { index: 2, nf: 2 })
        ));
        assert!(matches!(
            ctx.field(-3),
            Err(ExprError::FieldOutOfRange { index: -3, nf: 2 })
        ));
    }

    #[test]
    fn test_field_range_forward() {
        let mut fx = Fixture::new(&["a", "b", "c", "d"]);
        let ctx = fx.ctx("a b c d");
        assert_eq!(ctx.field_range(1, 2).unwrap(), vec!["b", "c"]);
        assert_eq!(ctx.field_range(0, -1).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_field_range_reversed() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        let ctx = fx.ctx("a b c");
        assert_eq!(ctx.field_range(2, 0).unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_join_range_default_sep() {
        let mut fx = Fixture::new(&["x", "y", "z"]);
        let ctx = fx.ctx("x y z");
        assert_eq!(ctx.join_range(1, -1, None).unwrap(), "y z");
    }

    #[test]
    fn test_join_range_custom_sep() {
        let mut fx = Fixture::new(&["x", "y", "z"]);
        let ctx = fx.ctx("x y z");
        assert_eq!(ctx.join_range(0, -1, Some(",")).unwrap(), "x,y,z");
    }

    // ==================== find_field tests ====================

    #[test]
    fn test_find_field() {
        let mut fx = Fixture::new(&["aa", "bb", "cc"]);
        let ctx = fx.ctx("aa bb cc");
        assert_eq!(ctx.find_field(|f| f.starts_with('b')), Some("bb"));
        assert_eq!(ctx.find_field(|f| f.len() > 5), None);
    }

    #[test]
    fn test_find_field_index() {
        let mut fx = Fixture::new(&["aa", "bb", "cc"]);
        let ctx = fx.ctx("aa bb cc");
        assert_eq!(ctx.find_field_index(|f| f == "cc"), Some(2));
        assert_eq!(ctx.find_field_index(|f| f == "zz"), None);
    }

    // ==================== splice_fields tests ====================

    #[test]
    fn test_splice_remove_middle() {
        let mut fx = Fixture::new(&["a", "b", "c", "d"]);
        let mut ctx = fx.ctx("a b c d");
        let removed = ctx.splice_fields(1, Some(2), vec![]);
        assert_eq!(removed, vec!["b", "c"]);
        assert_eq!(ctx.nf(), 2);
        assert_eq!(ctx.field(1).unwrap(), "d");
    }

    #[test]
    fn test_splice_replace() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        let mut ctx = fx.ctx("a b c");
        let removed = ctx.splice_fields(1, Some(1), vec!["X".into(), "Y".into()]);
        assert_eq!(removed, vec!["b"]);
        assert_eq!(ctx.field_range(0, -1).unwrap(), vec!["a", "X", "Y", "c"]);
    }

    #[test]
    fn test_splice_negative_offset() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        let mut ctx = fx.ctx("a b c");
        let removed = ctx.splice_fields(-2, None, vec![]);
        assert_eq!(removed, vec!["b", "c"]);
        assert_eq!(ctx.nf(), 1);
    }

    #[test]
    fn test_splice_negative_len_leaves_tail() {
        let mut fx = Fixture::new(&["a", "b", "c", "d"]);
        let mut ctx = fx.ctx("a b c d");
        let removed = ctx.splice_fields(1, Some(-1), vec![]);
        assert_eq!(removed, vec!["b", "c"]);
        assert_eq!(ctx.field_range(0, -1).unwrap(), vec!["a", "d"]);
    }

    #[test]
    fn test_splice_insert_only() {
        let mut fx = Fixture::new(&["a", "c"]);
        let mut ctx = fx.ctx("a c");
        let removed = ctx.splice_fields(1, Some(0), vec!["b".into()]);
        assert!(removed.is_empty());
        assert_eq!(ctx.field_range(0, -1).unwrap(), vec!["a", "b", "c"]);
    }

    // ==================== Stash access tests ====================

    #[test]
    fn test_stash_roundtrip() {
        let mut fx = Fixture::new(&[]);
        let mut ctx = fx.ctx("");
        assert_eq!(ctx.stashed("x"), Value::Undef);
        ctx.stash_set("x", Value::Int(5)).unwrap();
        assert_eq!(ctx.stashed("x"), Value::Int(5));
        assert_eq!(ctx.stash_delete("x"), Value::Int(5));
        assert_eq!(ctx.stashed("x"), Value::Undef);
    }

    #[test]
    fn test_stash_limit_enforced() {
        let mut fields = Vec::new();
        let mut stash = Stash::new();
        let mut aborted = false;
        let mut ctx = LineContext::new(
            Some(""),
            1,
            0,
            1,
            &mut fields,
            &mut stash,
            &mut aborted,
            " ",
            false,
            1,
        );
        ctx.stash_set("a", Value::Int(1)).unwrap();
        // Overwriting an existing name is fine at the limit
        ctx.stash_set("a", Value::Int(2)).unwrap();
        assert!(matches!(
            ctx.stash_set("b", Value::Int(3)),
            Err(ExprError::StashOverflow { max: 1 })
        ));
    }

    // ==================== Line / abort tests ====================

    #[test]
    fn test_this_line() {
        let mut fx = Fixture::new(&[]);
        let ctx = fx.ctx("hello world");
        assert_eq!(ctx.this_line().unwrap(), "hello world");
    }

    #[test]
    fn test_no_context_line_access() {
        let mut fields = Vec::new();
        let mut stash = Stash::new();
        let mut aborted = false;
        let ctx = LineContext::new(
            None,
            0,
            0,
            0,
            &mut fields,
            &mut stash,
            &mut aborted,
            " ",
            false,
            usize::MAX,
        );
        assert!(matches!(ctx.this_line(), Err(ExprError::NoContext)));
    }

    #[test]
    fn test_abort_reading() {
        let mut fx = Fixture::new(&[]);
        let mut ctx = fx.ctx("x");
        assert!(!ctx.has_aborted());
        ctx.abort_reading();
        assert!(ctx.has_aborted());
        drop(ctx);
        assert!(fx.aborted);
    }
}
