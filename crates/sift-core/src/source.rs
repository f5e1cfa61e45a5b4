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

//! Input sources: physical-line iteration for the read loop.
//!
//! Lines are yielded *with* their terminators attached so that `auto_chomp`
//! and the unwrap routines can decide what to keep. Path-opened files are
//! verified to be plain text (a NUL byte in the first chunk rejects the
//! file) and are owned by the engine; user-supplied readers are borrowed
//! and never closed here.

use crate::error::{SiftError, SiftResult};
use crate::limits::Limits;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// The engine's persistent input selector.
pub(crate) enum Source {
    /// No source configured; `read` is a no-op.
    None,
    /// A path the engine opens, reads and closes per read.
    Path(PathBuf),
    /// A caller-owned reader. The engine borrows it for each read and
    /// never closes it.
    Handle(Box<dyn BufRead + Send>),
    /// In-memory text.
    Text(String),
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::None => write!(f, "Source::None"),
            Source::Path(p) => write!(f, "Source::Path({:?})", p),
            Source::Handle(_) => write!(f, "Source::Handle(..)"),
            Source::Text(t) => write!(f, "Source::Text({} bytes)", t.len()),
        }
    }
}

/// How many leading bytes are scanned for the plain-text check.
const PLAIN_TEXT_PROBE: usize = 4096;

/// Open a path for reading, verifying it exists, is readable and looks
/// like plain text.
pub(crate) fn open_path(path: &Path) -> SiftResult<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::NotFound => "file not found",
            ErrorKind::PermissionDenied => "file not readable",
            _ => "cannot open file",
        };
        SiftError::input(format!("{}: {}", reason, path.display()))
    })?;

    let mut reader = BufReader::new(file);
    let probe = reader
        .fill_buf()
        .map_err(|e| SiftError::input(format!("cannot read {}: {}", path.display(), e)))?;
    let scan = &probe[..probe.len().min(PLAIN_TEXT_PROBE)];
    if scan.contains(&0) {
        return Err(SiftError::input(format!(
            "not a plain text file: {}",
            path.display()
        )));
    }
    Ok(reader)
}

/// A feed of physical lines, terminators included.
pub(crate) enum LineFeed<'a> {
    Reader {
        reader: Box<dyn BufRead + 'a>,
        line_num: usize,
        max_line_length: usize,
    },
    Text {
        remaining: &'a str,
        line_num: usize,
        max_line_length: usize,
    },
}

impl<'a> LineFeed<'a> {
    pub fn from_reader(reader: impl BufRead + 'a, limits: &Limits) -> Self {
        LineFeed::Reader {
            reader: Box::new(reader),
            line_num: 0,
            max_line_length: limits.max_line_length,
        }
    }

    pub fn from_text(text: &'a str, limits: &Limits) -> Self {
        LineFeed::Text {
            remaining: text,
            line_num: 0,
            max_line_length: limits.max_line_length,
        }
    }

    /// The next physical line, or `None` at end of input.
    pub fn next_line(&mut self) -> SiftResult<Option<String>> {
        match self {
            LineFeed::Reader {
                reader,
                line_num,
                max_line_length,
            } => {
                *line_num += 1;
                let mut buf: Vec<u8> = Vec::new();
                // An unterminated line must not outgrow the limit before
                // the length check runs.
                let cap = max_line_length.saturating_add(2) as u64;
                let n = reader
                    .by_ref()
                    .take(cap)
                    .read_until(b'\n', &mut buf)
                    .map_err(|e| SiftError::input(format!("read error: {}", e)))?;
                if n == 0 {
                    return Ok(None);
                }
                let content = buf.strip_suffix(b"\n").unwrap_or(&buf);
                let content = content.strip_suffix(b"\r").unwrap_or(content);
                if content.len() > *max_line_length {
                    return Err(SiftError::security(
                        format!("line too long: exceeds limit of {} bytes", max_line_length),
                        *line_num,
                    ));
                }
                let line = String::from_utf8(buf).map_err(|e| {
                    SiftError::input(format!("invalid UTF-8 encoding: {}", e))
                })?;
                Ok(Some(strip_bom(line, *line_num)))
            }
            LineFeed::Text {
                remaining,
                line_num,
                max_line_length,
            } => {
                if remaining.is_empty() {
                    return Ok(None);
                }
                *line_num += 1;
                let (line, rest) = match remaining.find('\n') {
                    Some(pos) => remaining.split_at(pos + 1),
                    None => (*remaining, ""),
                };
                *remaining = rest;
                let content = line.strip_suffix('\n').unwrap_or(line);
                let content = content.strip_suffix('\r').unwrap_or(content);
                if content.len() > *max_line_length {
                    return Err(SiftError::security(
                        format!("line too long: exceeds limit of {} bytes", max_line_length),
                        *line_num,
                    ));
                }
                Ok(Some(strip_bom(line.to_string(), *line_num)))
            }
        }
    }
}

/// Drop a UTF-8 BOM from the first line.
fn strip_bom(line: String, line_num: usize) -> String {
    if line_num == 1 && line.starts_with('\u{FEFF}') {
        line.trim_start_matches('\u{FEFF}').to_string()
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(mut feed: LineFeed<'_>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = feed.next_line().unwrap() {
            out.push(line);
        }
        out
    }

    // ==================== Text feed tests ====================

    #[test]
    fn test_text_feed_keeps_terminators() {
        let limits = Limits::default();
        let lines = collect(LineFeed::from_text("a\nb\nc", &limits));
        assert_eq!(lines, vec!["a\n", "b\n", "c"]);
    }

    #[test]
    fn test_text_feed_empty() {
        let limits = Limits::default();
        assert!(collect(LineFeed::from_text("", &limits)).is_empty());
    }

    #[test]
    fn test_text_feed_trailing_newline() {
        let limits = Limits::default();
        let lines = collect(LineFeed::from_text("a\n", &limits));
        assert_eq!(lines, vec!["a\n"]);
    }

    #[test]
    fn test_text_feed_blank_lines() {
        let limits = Limits::default();
        let lines = collect(LineFeed::from_text("\n\nx\n", &limits));
        assert_eq!(lines, vec!["\n", "\n", "x\n"]);
    }

    #[test]
    fn test_text_feed_line_length_limit() {
        let limits = Limits {
            max_line_length: 3,
            ..Limits::default()
        };
        let mut feed = LineFeed::from_text("abcd\n", &limits);
        let err = feed.next_line().unwrap_err();
        assert!(err.message.contains("line too long"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_text_feed_line_at_limit() {
        let limits = Limits {
            max_line_length: 3,
            ..Limits::default()
        };
        let lines = collect(LineFeed::from_text("abc\n", &limits));
        assert_eq!(lines, vec!["abc\n"]);
    }

    // ==================== Reader feed tests ====================

    #[test]
    fn test_reader_feed() {
        let limits = Limits::default();
        let cursor = Cursor::new("one\ntwo\r\nthree");
        let lines = collect(LineFeed::from_reader(cursor, &limits));
        assert_eq!(lines, vec!["one\n", "two\r\n", "three"]);
    }

    #[test]
    fn test_reader_feed_invalid_utf8() {
        let limits = Limits::default();
        let cursor = Cursor::new(vec![0xFF, 0xFE, b'\n']);
        let mut feed = LineFeed::from_reader(cursor, &limits);
        let err = feed.next_line().unwrap_err();
        assert!(err.message.contains("UTF-8"));
    }

    #[test]
    fn test_reader_feed_line_length_limit() {
        let limits = Limits {
            max_line_length: 4,
            ..Limits::default()
        };
        let cursor = Cursor::new("abcdefgh\n");
        let mut feed = LineFeed::from_reader(cursor, &limits);
        assert!(feed.next_line().is_err());
    }

    #[test]
    fn test_reader_feed_line_at_limit_with_newline() {
        let limits = Limits {
            max_line_length: 4,
            ..Limits::default()
        };
        let cursor = Cursor::new("abcd\nef\n");
        let mut feed = LineFeed::from_reader(cursor, &limits);
        assert_eq!(feed.next_line().unwrap(), Some("abcd\n".to_string()));
        assert_eq!(feed.next_line().unwrap(), Some("ef\n".to_string()));
    }

    // ==================== BOM tests ====================

    #[test]
    fn test_bom_stripped_from_first_line() {
        let limits = Limits::default();
        let text = "\u{FEFF}first\nsecond\n";
        let lines = collect(LineFeed::from_text(text, &limits));
        assert_eq!(lines, vec!["first\n", "second\n"]);
    }

    // ==================== Path tests ====================

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sift-core-test-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_open_path_missing_file() {
        let err = open_path(Path::new("/no/such/sift/file.txt")).unwrap_err();
        assert!(err.message.contains("file not found"));
    }

    #[test]
    fn test_open_path_rejects_binary() {
        let path = temp_file("binary", b"abc\x00def");
        let err = open_path(&path).unwrap_err();
        assert!(err.message.contains("not a plain text file"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_path_reads_lines() {
        let path = temp_file("plain", b"x\ny\n");
        let reader = open_path(&path).unwrap();
        let limits = Limits::default();
        let lines = collect(LineFeed::from_reader(reader, &limits));
        assert_eq!(lines, vec!["x\n", "y\n"]);
        std::fs::remove_file(&path).ok();
    }
}
