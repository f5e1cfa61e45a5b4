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

//! Basic usage: extract structured data from a log with three rules.
//!
//! Run with: `cargo run --example basic_usage`

use sift::{Options, Parser, RuleOpts, SiftError};

fn main() -> Result<(), SiftError> {
    let log = "\
2026-03-01 09:14:02 INFO  service started
2026-03-01 09:14:07 ERROR disk /dev/sda1 is 98% full
2026-03-01 09:15:11 WARN  latency above threshold
2026-03-01 09:16:42 ERROR quota exceeded for tenant blue
2026-03-01 09:17:00 INFO  shutting down
";

    let mut parser = Parser::with_options(
        Options::builder().auto_split(true).auto_chomp(true).build(),
    );

    parser.begin_rule(RuleOpts::new().action("~errors = 0"))?;

    // Keep the timestamp and message of every ERROR line
    parser.add_rule(
        RuleOpts::new()
            .when("$3 eq 'ERROR'")
            .action("~errors++; return $2 . ' ' . ${4+}"),
    )?;

    // Everything else just counts
    parser.end_rule(RuleOpts::new().action("return ~errors"))?;

    parser.read_text(log)?;

    for record in parser.get_records() {
        println!("{}", record);
    }
    Ok(())
}
