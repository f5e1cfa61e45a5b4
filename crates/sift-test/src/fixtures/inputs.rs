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

//! Canonical input texts.

/// Application log with three ERROR lines among other levels.
pub const APP_LOG: &str = "\
INFO: service started
ERROR: disk full
WARN: latency rising
ERROR: quota exceeded
INFO: retry scheduled
ERROR: net unreachable
INFO: shutting down
";

/// A small SPICE deck with `+` continuation lines and a comment.
pub const SPICE_DECK: &str = "\
* comment
Minst net1
+ net2 net3
+ net4 nmos l=0.09u w=0.13u
";

/// Comma-separated table, two rows.
pub const CSV_TABLE: &str = "a,b,c\n1,2,3\n";

/// Contact card lines used by field-shortcut tests.
pub const CONTACT_CARD: &str = "\
NAME: Audrey C Miller
EMAIL: aud@a.io
";

/// Text with backslash-wrapped physical lines.
pub const WRAPPED_TEXT: &str = "Garbage In.\\\nGarbage Out!\n";

/// An indented tree-ish listing for indent-tracking tests.
pub const INDENTED_TREE: &str = "\
root
  child-a
    leaf-1
  child-b
";

/// Generate a log with `n` ERROR lines interleaved with INFO lines.
pub fn log_with_errors(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        out.push_str(&format!("INFO: heartbeat {}\n", i));
        out.push_str(&format!("ERROR: failure {}\n", i));
    }
    out
}
