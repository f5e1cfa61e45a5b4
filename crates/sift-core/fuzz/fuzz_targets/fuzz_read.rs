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

//! Fuzz the full read loop across every built-in wrap style. Reads must
//! never panic; they either complete or return a structured error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sift_core::{Options, Parser, RuleOpts, WrapStyle};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for style in [
        WrapStyle::None,
        WrapStyle::TrailingBackslash,
        WrapStyle::Spice,
        WrapStyle::JustNextLine,
        WrapStyle::Slurp,
    ] {
        let mut parser = Parser::with_options(
            Options::builder()
                .auto_split(true)
                .auto_chomp(true)
                .line_wrap_style(style)
                .build(),
        );
        let _ = parser.add_rule(
            RuleOpts::new()
                .when("NF > 0")
                .action("~n++; return ${1+}")
                .dont_record(false),
        );
        let _ = parser.read_text(text);
    }
});
