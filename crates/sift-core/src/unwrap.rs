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

//! Line unwrapping: joining physical lines into logical lines.
//!
//! Five built-in styles plus a custom hook. A style selects a multiline
//! direction and a pair of routines:
//!
//! - `join_next` (e.g. trailing backslash): the wrap marker on a line says
//!   "the *next* line continues me". The FSM accumulates until the marker
//!   disappears; a pending buffer at EOF is an error.
//! - `join_last` (e.g. SPICE `+` continuations): the marker on a line says
//!   "I continue the *previous* line". A marker on the very first line has
//!   nothing to continue and is an error; a pending buffer at EOF flushes
//!   normally.
//!
//! Routines see physical lines with their terminators still attached, so
//! joins can decide what to keep; chomp/trim happen later, on the logical
//! line.

use crate::error::{SiftError, SiftResult};
use std::fmt;
use std::sync::Arc;

/// How physical lines wrap into logical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapStyle {
    /// No unwrapping: every physical line is a logical line.
    #[default]
    None,
    /// A trailing `\` joins the next line (with a single space).
    TrailingBackslash,
    /// SPICE decks: a leading `+` continues the previous line.
    Spice,
    /// Every non-blank line after the first continues the previous line.
    JustNextLine,
    /// The whole input becomes one logical line.
    Slurp,
    /// User-installed routines.
    Custom,
}

/// Whether a wrap marker binds the current line to the next or to the
/// previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultilineType {
    #[default]
    None,
    JoinNext,
    JoinLast,
}

impl WrapStyle {
    /// The multiline direction this style implies. `Custom` has no implied
    /// direction: the installed routines carry it.
    pub fn multiline_type(&self) -> Option<MultilineType> {
        match self {
            WrapStyle::None => Some(MultilineType::None),
            WrapStyle::TrailingBackslash => Some(MultilineType::JoinNext),
            WrapStyle::Spice | WrapStyle::JustNextLine | WrapStyle::Slurp => {
                Some(MultilineType::JoinLast)
            }
            WrapStyle::Custom => None,
        }
    }
}

/// `is_wrapped(line, is_first)`: does this line carry the wrap marker?
pub type IsWrappedFn = Arc<dyn Fn(&str, bool) -> bool + Send + Sync>;

/// `join(accumulated, current)`: merge a continuation into the buffer.
pub type JoinFn = Arc<dyn Fn(String, &str) -> String + Send + Sync>;

/// A pair of unwrap routines plus their multiline direction.
#[derive(Clone)]
pub struct UnwrapRoutines {
    pub multiline_type: MultilineType,
    is_wrapped: IsWrappedFn,
    join: JoinFn,
}

impl UnwrapRoutines {
    /// Bundle custom routines. `multiline_type` must not be `None`.
    pub fn new(
        multiline_type: MultilineType,
        is_wrapped: IsWrappedFn,
        join: JoinFn,
    ) -> SiftResult<Self> {
        if multiline_type == MultilineType::None {
            return Err(SiftError::unwrap(
                "custom unwrap routines need a join_next or join_last multiline type",
                0,
            ));
        }
        Ok(Self {
            multiline_type,
            is_wrapped,
            join,
        })
    }

    fn for_style(style: WrapStyle) -> Option<Self> {
        match style {
            WrapStyle::None | WrapStyle::Custom => None,
            WrapStyle::TrailingBackslash => Some(Self {
                multiline_type: MultilineType::JoinNext,
                is_wrapped: Arc::new(|line, _| line.trim_end().ends_with('\\')),
                join: Arc::new(|last, cur| {
                    let kept = last.trim_end();
                    let kept = &kept[..kept.len() - 1];
                    format!("{} {}", kept, cur)
                }),
            }),
            WrapStyle::Spice => Some(Self {
                multiline_type: MultilineType::JoinLast,
                is_wrapped: Arc::new(|line, _| line.starts_with('+')),
                join: Arc::new(|last, cur| {
                    let rest = cur.strip_prefix('+').unwrap_or(cur);
                    format!("{}{}", chomp(&last), rest)
                }),
            }),
            WrapStyle::JustNextLine => Some(Self {
                multiline_type: MultilineType::JoinLast,
                is_wrapped: Arc::new(|line, is_first| !is_first && !line.trim().is_empty()),
                join: Arc::new(|last, cur| format!("{}{}", chomp(&last), cur)),
            }),
            WrapStyle::Slurp => Some(Self {
                multiline_type: MultilineType::JoinLast,
                is_wrapped: Arc::new(|_, is_first| !is_first),
                join: Arc::new(|last, cur| format!("{}{}", last, cur)),
            }),
        }
    }
}

impl fmt::Debug for UnwrapRoutines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwrapRoutines")
            .field("multiline_type", &self.multiline_type)
            .finish_non_exhaustive()
    }
}

/// Strip one trailing LF or CRLF.
fn chomp(s: &str) -> &str {
    let s = s.strip_suffix('\n').unwrap_or(s);
    s.strip_suffix('\r').unwrap_or(s)
}

/// The unwrap state machine. States: idle (no buffer) and buffering.
#[derive(Debug)]
pub(crate) struct Unwrapper {
    routines: Option<UnwrapRoutines>,
    buffer: Option<String>,
    seen_any: bool,
    max_logical_len: usize,
}

impl Unwrapper {
    /// Build the FSM for the engine's configuration. Selecting `Custom`
    /// with no routines installed is an error.
    pub fn new(
        style: WrapStyle,
        custom: Option<&UnwrapRoutines>,
        max_logical_len: usize,
    ) -> SiftResult<Self> {
        let routines = match style {
            WrapStyle::Custom => match custom {
                Some(r) => Some(r.clone()),
                None => {
                    return Err(SiftError::unwrap(
                        "line_wrap_style is custom but no unwrap routines are installed",
                        0,
                    ));
                }
            },
            other => UnwrapRoutines::for_style(other),
        };
        Ok(Self {
            routines,
            buffer: None,
            seen_any: false,
            max_logical_len,
        })
    }

    /// Feed one physical line; returns the logical line it completes, if
    /// any. `line_num` is the physical line number, for error reports.
    pub fn push(&mut self, raw: String, line_num: usize) -> SiftResult<Option<String>> {
        let Some(routines) = &self.routines else {
            return Ok(Some(raw));
        };
        let is_first = !self.seen_any;
        self.seen_any = true;

        let out = match routines.multiline_type {
            MultilineType::None => Some(raw),
            MultilineType::JoinNext => {
                let merged = match self.buffer.take() {
                    None => raw,
                    Some(last) => (routines.join)(last, &raw),
                };
                if (routines.is_wrapped)(&merged, is_first) {
                    self.buffer = Some(merged);
                    None
                } else {
                    Some(merged)
                }
            }
            MultilineType::JoinLast => {
                if (routines.is_wrapped)(&raw, is_first) {
                    match self.buffer.take() {
                        None => {
                            return Err(SiftError::unwrap(
                                "unexpected continuation: first line cannot be wrapped",
                                line_num,
                            ));
                        }
                        Some(last) => {
                            self.buffer = Some((routines.join)(last, &raw));
                            None
                        }
                    }
                } else {
                    let flushed = self.buffer.take();
                    self.buffer = Some(raw);
                    flushed
                }
            }
        };

        if let Some(buf) = &self.buffer {
            if buf.len() > self.max_logical_len {
                return Err(SiftError::security(
                    format!(
                        "logical line length {} exceeds limit {}",
                        buf.len(),
                        self.max_logical_len
                    ),
                    line_num,
                ));
            }
        }
        Ok(out)
    }

    /// End of input. For `join_next` a pending buffer means the last line
    /// still promised a continuation; for `join_last` it flushes normally.
    pub fn finish(&mut self, line_num: usize) -> SiftResult<Option<String>> {
        let Some(routines) = &self.routines else {
            return Ok(None);
        };
        match (routines.multiline_type, self.buffer.take()) {
            (_, None) => Ok(None),
            (MultilineType::JoinNext, Some(pending)) => Err(SiftError::unwrap(
                "unexpected EOF while a wrapped line is still pending",
                line_num,
            )
            .with_context(pending)),
            (_, Some(pending)) => Ok(Some(pending)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(style: WrapStyle, lines: &[&str]) -> SiftResult<Vec<String>> {
        let mut fsm = Unwrapper::new(style, None, usize::MAX)?;
        let mut out = Vec::new();
        let mut n = 0;
        for line in lines {
            n += 1;
            if let Some(logical) = fsm.push(line.to_string(), n)? {
                out.push(logical);
            }
        }
        if let Some(logical) = fsm.finish(n)? {
            out.push(logical);
        }
        Ok(out)
    }

    // ==================== Style plumbing ====================

    #[test]
    fn test_multiline_type_derivation() {
        assert_eq!(WrapStyle::None.multiline_type(), Some(MultilineType::None));
        assert_eq!(
            WrapStyle::TrailingBackslash.multiline_type(),
            Some(MultilineType::JoinNext)
        );
        assert_eq!(
            WrapStyle::Spice.multiline_type(),
            Some(MultilineType::JoinLast)
        );
        assert_eq!(
            WrapStyle::Slurp.multiline_type(),
            Some(MultilineType::JoinLast)
        );
        assert_eq!(WrapStyle::Custom.multiline_type(), None);
    }

    #[test]
    fn test_custom_without_routines_fails() {
        let err = Unwrapper::new(WrapStyle::Custom, None, usize::MAX).unwrap_err();
        assert!(err.message.contains("no unwrap routines"));
    }

    #[test]
    fn test_custom_routines_need_direction() {
        let result = UnwrapRoutines::new(
            MultilineType::None,
            Arc::new(|_, _| false),
            Arc::new(|l, _| l),
        );
        assert!(result.is_err());
    }

    // ==================== none ====================

    #[test]
    fn test_none_passthrough() {
        let out = drive(WrapStyle::None, &["a\n", "b\n"]).unwrap();
        assert_eq!(out, vec!["a\n", "b\n"]);
    }

    // ==================== trailing_backslash ====================

    #[test]
    fn test_trailing_backslash_joins() {
        let out =
            drive(WrapStyle::TrailingBackslash, &["Garbage In.\\\n", "Garbage Out!\n"]).unwrap();
        assert_eq!(out, vec!["Garbage In. Garbage Out!\n"]);
    }

    #[test]
    fn test_trailing_backslash_multi_hop() {
        let out = drive(WrapStyle::TrailingBackslash, &["a\\\n", "b\\\n", "c\n"]).unwrap();
        assert_eq!(out, vec!["a b c\n"]);
    }

    #[test]
    fn test_trailing_backslash_plain_lines_untouched() {
        let out = drive(WrapStyle::TrailingBackslash, &["x\n", "y\n"]).unwrap();
        assert_eq!(out, vec!["x\n", "y\n"]);
    }

    #[test]
    fn test_trailing_backslash_eof_with_pending() {
        let err = drive(WrapStyle::TrailingBackslash, &["dangling\\\n"]).unwrap_err();
        assert!(err.message.contains("unexpected EOF"));
        assert!(err.context.as_deref().unwrap().contains("dangling"));
    }

    #[test]
    fn test_trailing_backslash_group_count() {
        // Three groups: (a\ b), (c), (d\ e\ f)
        let out = drive(
            WrapStyle::TrailingBackslash,
            &["a\\\n", "b\n", "c\n", "d\\\n", "e\\\n", "f\n"],
        )
        .unwrap();
        assert_eq!(out.len(), 3);
    }

    // ==================== spice ====================

    #[test]
    fn test_spice_continuations() {
        let out = drive(
            WrapStyle::Spice,
            &["Minst net1\n", "+ net2 net3\n", "+ net4\n", "Rload out\n"],
        )
        .unwrap();
        assert_eq!(out, vec!["Minst net1 net2 net3 net4\n", "Rload out\n"]);
    }

    #[test]
    fn test_spice_first_line_continuation_fails() {
        let err = drive(WrapStyle::Spice, &["+ no previous\n"]).unwrap_err();
        assert!(err.message.contains("unexpected continuation"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_spice_flushes_last_buffer_at_eof() {
        let out = drive(WrapStyle::Spice, &["A 1\n", "+ 2\n"]).unwrap();
        assert_eq!(out, vec!["A 1 2\n"]);
    }

    // ==================== just_next_line ====================

    #[test]
    fn test_just_next_line_joins_consecutive_lines() {
        let out = drive(WrapStyle::JustNextLine, &["a\n", "b\n", "c\n"]).unwrap();
        assert_eq!(out, vec!["abc\n"]);
    }

    #[test]
    fn test_just_next_line_blank_line_breaks_group() {
        // A blank line is not wrapped: it flushes the group and then gets
        // chomped into the start of the next one.
        let out = drive(WrapStyle::JustNextLine, &["a\n", "b\n", "\n", "c\n"]).unwrap();
        assert_eq!(out, vec!["ab\n", "c\n"]);
    }

    // ==================== slurp ====================

    #[test]
    fn test_slurp_round_trip() {
        let lines = ["one\n", "two\n", "three\n"];
        let out = drive(WrapStyle::Slurp, &lines).unwrap();
        assert_eq!(out, vec!["one\ntwo\nthree\n"]);
        assert_eq!(out[0], lines.concat());
    }

    #[test]
    fn test_slurp_single_line() {
        let out = drive(WrapStyle::Slurp, &["only\n"]).unwrap();
        assert_eq!(out, vec!["only\n"]);
    }

    #[test]
    fn test_slurp_empty_input() {
        let out = drive(WrapStyle::Slurp, &[]).unwrap();
        assert!(out.is_empty());
    }

    // ==================== custom ====================

    #[test]
    fn test_custom_routines() {
        // Lines ending in "..." continue onto the next line
        let routines = UnwrapRoutines::new(
            MultilineType::JoinNext,
            Arc::new(|line: &str, _| line.trim_end().ends_with("...")),
            Arc::new(|last: String, cur: &str| {
                let kept = last.trim_end().trim_end_matches("...").to_string();
                format!("{}{}", kept, cur)
            }),
        )
        .unwrap();

        let mut fsm = Unwrapper::new(WrapStyle::Custom, Some(&routines), usize::MAX).unwrap();
        let mut out = Vec::new();
        for (i, line) in ["to be...\n", "continued\n", "done\n"].iter().enumerate() {
            if let Some(l) = fsm.push(line.to_string(), i + 1).unwrap() {
                out.push(l);
            }
        }
        assert!(fsm.finish(3).unwrap().is_none());
        assert_eq!(out, vec!["to be continued\n", "done\n"]);
    }

    // ==================== limits ====================

    #[test]
    fn test_logical_line_length_limit() {
        let mut fsm = Unwrapper::new(WrapStyle::Slurp, None, 8).unwrap();
        fsm.push("aaaa\n".to_string(), 1).unwrap();
        let err = fsm.push("bbbb\n".to_string(), 2).unwrap_err();
        assert!(err.message.contains("exceeds limit"));
    }
}
