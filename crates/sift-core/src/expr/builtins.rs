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

//! Builtin functions of the rule expression mini-language.
//!
//! Two families exist: pure string/number helpers implemented here, and
//! context builtins (`NF`, `field`, `splice_fields`, `abort_reading`, ...)
//! that need the line context and are dispatched by the evaluator. Both
//! families are declared in the signature table so unknown names and bad
//! arities are rejected at rule compile time.

use super::error::{ExprError, ExprResult};
use super::value::Value;
use regex::Regex;

/// Arity bounds for a builtin: (minimum, maximum) argument count.
pub type Arity = (usize, usize);

/// Look up a builtin's arity bounds. Returns `None` for unknown names.
pub fn signature(name: &str) -> Option<Arity> {
    let arity = match name {
        // Pure helpers
        "substr" => (2, 3),
        "uc" | "upper" | "lc" | "lower" | "ucfirst" | "lcfirst" => (1, 1),
        "length" | "trim" | "chomp" | "abs" | "int" | "num" => (1, 1),
        "index" => (2, 2),
        "join" => (2, 2),
        "split" => (2, 2),
        // Context builtins (evaluated against the line context)
        "NF" | "NR" | "this_line" | "this_indent" | "lines_parsed" | "abort_reading" => (0, 0),
        "field" | "find_field" | "find_field_index" | "stashed" => (1, 1),
        "field_range" => (2, 2),
        "join_range" => (2, 3),
        "splice_fields" => (1, usize::MAX),
        _ => return None,
    };
    Some(arity)
}

/// Returns `true` if `name` is a context builtin handled by the evaluator.
pub fn is_context_builtin(name: &str) -> bool {
    matches!(
        name,
        "NF" | "NR"
            | "this_line"
            | "this_indent"
            | "lines_parsed"
            | "abort_reading"
            | "field"
            | "field_range"
            | "join_range"
            | "find_field"
            | "find_field_index"
            | "splice_fields"
            | "stashed"
    )
}

/// Evaluate a pure builtin. The caller has already validated the arity.
pub fn call_pure(name: &str, args: &[Value]) -> ExprResult<Value> {
    match name {
        "substr" => {
            let s = args[0].to_text();
            let off = args[1].to_int();
            let len = args.get(2).map(Value::to_int);
            Ok(Value::Str(substr(&s, off, len)))
        }
        "uc" | "upper" => Ok(Value::Str(args[0].to_text().to_uppercase())),
        "lc" | "lower" => Ok(Value::Str(args[0].to_text().to_lowercase())),
        "ucfirst" => Ok(Value::Str(map_first(&args[0].to_text(), true))),
        "lcfirst" => Ok(Value::Str(map_first(&args[0].to_text(), false))),
        "length" => Ok(Value::Int(args[0].to_text().chars().count() as i64)),
        "index" => {
            let s = args[0].to_text();
            let needle = args[1].to_text();
            Ok(Value::Int(char_index(&s, &needle)))
        }
        "trim" => Ok(Value::Str(args[0].to_text().trim().to_string())),
        "chomp" => {
            let mut s = args[0].to_text();
            if s.ends_with('\n') {
                s.pop();
                if s.ends_with('\r') {
                    s.pop();
                }
            }
            Ok(Value::Str(s))
        }
        "abs" => Ok(Value::Float(args[0].to_num().abs())),
        "int" => Ok(Value::Int(args[0].to_int())),
        "num" => Ok(Value::Float(args[0].to_num())),
        "join" => {
            let sep = args[0].to_text();
            match &args[1] {
                Value::List(items) => Ok(Value::Str(
                    items
                        .iter()
                        .map(Value::to_text)
                        .collect::<Vec<_>>()
                        .join(&sep),
                )),
                other => Ok(Value::Str(other.to_text())),
            }
        }
        "split" => {
            let pattern = args[0].to_text();
            let re = Regex::new(&pattern).map_err(|e| ExprError::InvalidRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            let s = args[1].to_text();
            if s.is_empty() {
                return Ok(Value::List(vec![]));
            }
            Ok(Value::List(
                re.split(&s).map(|p| Value::Str(p.to_string())).collect(),
            ))
        }
        other => Err(ExprError::UnknownFunction {
            name: other.to_string(),
            pos: 0,
        }),
    }
}

/// `substr` with scripting semantics: character-based, negative offset
/// counts from the end, negative length leaves that many characters off the
/// end, everything clamps instead of failing.
fn substr(s: &str, off: i64, len: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len() as i64;

    let start = if off < 0 { (n + off).max(0) } else { off.min(n) };
    let end = match len {
        None => n,
        Some(l) if l < 0 => (n + l).max(start),
        Some(l) => (start + l).min(n),
    };
    if start >= end {
        return String::new();
    }
    chars[start as usize..end as usize].iter().collect()
}

fn map_first(s: &str, upper: bool) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mapped: String = if upper {
                first.to_uppercase().collect()
            } else {
                first.to_lowercase().collect()
            };
            mapped + chars.as_str()
        }
    }
}

/// Character index of `needle` in `s`, or -1.
fn char_index(s: &str, needle: &str) -> i64 {
    match s.find(needle) {
        None => -1,
        Some(byte_pos) => s[..byte_pos].chars().count() as i64,
    }
}
