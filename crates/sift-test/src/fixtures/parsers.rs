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

//! Pre-configured parsers for common test shapes.

use regex::Regex;
use sift_core::{Options, Parser, RuleOpts, WrapStyle};

/// Splitting, chomping parser with no rules.
pub fn base() -> Parser {
    Parser::with_options(Options::builder().auto_split(true).auto_chomp(true).build())
}

/// Records the message part (`${2+}`) of every `ERROR:` line.
pub fn error_scanner() -> Parser {
    let mut parser = base();
    parser
        .add_rule(
            RuleOpts::new()
                .when("$1 eq 'ERROR:'")
                .action("return ${2+}"),
        )
        .expect("fixture rule compiles");
    parser
}

/// Splits on commas and records every row as a field list.
pub fn csv_collector() -> Parser {
    let mut parser = Parser::with_options(
        Options::builder()
            .auto_split(true)
            .auto_chomp(true)
            .field_separator(Regex::new(",").expect("fixture regex"))
            .build(),
    );
    parser
        .add_rule(RuleOpts::new().when("NF > 0").action("return @{1+}"))
        .expect("fixture rule compiles");
    parser
}

/// Unwraps SPICE `+` continuations, skips `*` comments, records
/// instance lines (starting with `M`).
pub fn spice_reader() -> Parser {
    let mut parser = Parser::with_options(
        Options::builder()
            .auto_split(true)
            .auto_chomp(true)
            .line_wrap_style(WrapStyle::Spice)
            .build(),
    );
    parser
        .add_rule(
            RuleOpts::new()
                .when("substr($1, 0, 1) eq '*'")
                .dont_record(true),
        )
        .expect("fixture rule compiles");
    parser
        .add_rule(
            RuleOpts::new()
                .when("upper(substr($1, 0, 1)) eq 'M'")
                .action("return $0"),
        )
        .expect("fixture rule compiles");
    parser
}
