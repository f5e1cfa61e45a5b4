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

//! Line unwrapping: read a SPICE netlist whose `+` continuation lines
//! fold into the statements they continue.
//!
//! Run with: `cargo run --example spice_netlist`

use sift::{Options, Parser, RuleOpts, SiftError, WrapStyle};

fn main() -> Result<(), SiftError> {
    let deck = "\
* output driver
Mdrv out in
+ vdd vdd pmos
+ l=0.18u w=2u
Rpull out gnd 10k
";

    let mut parser = Parser::with_options(
        Options::builder()
            .auto_split(true)
            .auto_chomp(true)
            .line_wrap_style(WrapStyle::Spice)
            .build(),
    );

    // Skip comments, keep everything else as one logical statement per line
    parser.add_rule(
        RuleOpts::new()
            .when("substr($1, 0, 1) eq '*'")
            .dont_record(true),
    )?;
    parser.add_rule(RuleOpts::new().when("NF > 0").action("return $0"))?;

    parser.read_text(deck)?;

    for statement in parser.get_records() {
        println!("{}", statement);
    }
    Ok(())
}
