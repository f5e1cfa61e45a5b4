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

//! AST for the rule expression mini-language.
//!
//! A compiled rule body is a [`Program`]: a sequence of statements. A
//! predicate is a program holding a single expression statement. The
//! `Display` implementations render the normalized form of a program, which
//! error reports attach alongside the original source.

use regex::Regex;
use std::fmt;

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    /// Positional reference: 0 is the whole line, N>0 is the Nth field
    /// (1-based), N<0 counts from the last field.
    FieldRef(i64),
    /// `${N+}`: fields from N to the last, joined with the output separator.
    FieldJoin(i64),
    /// `@{N+}`: fields from N to the last, as a list.
    FieldSlice(i64),
    /// `~name`: stash variable read.
    StashRef(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `expr =~ /re/` or `expr !~ /re/`; the pattern is compiled once.
    Match {
        operand: Box<Expr>,
        pattern: Regex,
        negated: bool,
    },
    /// Builtin call. `$this.name(...)` sugar parses to the same node.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `~name++` / `~name--`; evaluates to the value before the update.
    PostIncr {
        name: String,
        delta: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    // Numeric comparisons
    NumEq,
    NumNe,
    NumLt,
    NumLe,
    NumGt,
    NumGe,
    // String comparisons (eq, ne, lt, le, gt, ge)
    StrEq,
    StrNe,
    StrLt,
    StrLe,
    StrGt,
    StrGe,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// String concatenation (`.`).
    Concat,
}

/// A statement in a rule body.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    /// `return` / `return expr`.
    Return(Option<Expr>),
    /// `delete ~name`: erase the transient stash entry.
    Delete(String),
    /// `~name = expr`, `+=`, `-=`, `.=`.
    Assign {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Concat,
}

/// A compiled rule body: an ordered list of statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    /// The highest absolute field index this program references.
    ///
    /// `$0` contributes nothing; `$N`/`${-N}`/`${N+}`/`@{N+}` contribute
    /// `|N|`, as do literal integer arguments of the positional builtins
    /// `field`, `field_range` and `join_range`.
    pub fn min_nf(&self) -> usize {
        let mut max = 0usize;
        for stmt in &self.stmts {
            stmt_min_nf(stmt, &mut max);
        }
        max
    }
}

fn stmt_min_nf(stmt: &Stmt, max: &mut usize) {
    match stmt {
        Stmt::Expr(e) => expr_min_nf(e, max),
        Stmt::Return(Some(e)) => expr_min_nf(e, max),
        Stmt::Return(None) | Stmt::Delete(_) => {}
        Stmt::Assign { value, .. } => expr_min_nf(value, max),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            expr_min_nf(cond, max);
            for s in then_branch {
                stmt_min_nf(s, max);
            }
            for s in else_branch {
                stmt_min_nf(s, max);
            }
        }
    }
}

fn expr_min_nf(expr: &Expr, max: &mut usize) {
    let mut bump = |n: i64| {
        let abs = n.unsigned_abs() as usize;
        if abs > *max {
            *max = abs;
        }
    };
    match expr {
        Expr::FieldRef(n) | Expr::FieldJoin(n) | Expr::FieldSlice(n) => bump(*n),
        Expr::Unary { operand, .. } => expr_min_nf(operand, max),
        Expr::Binary { lhs, rhs, .. } => {
            expr_min_nf(lhs, max);
            expr_min_nf(rhs, max);
        }
        Expr::Match { operand, .. } => expr_min_nf(operand, max),
        Expr::Call { name, args } => {
            // Positional builtins are 0-based at the context level; a
            // literal index i needs i+1 fields (or |i| when negative).
            if matches!(name.as_str(), "field" | "field_range" | "join_range") {
                for arg in args.iter().take(2) {
                    if let Expr::Int(i) = arg {
                        if *i >= 0 {
                            bump(i + 1);
                        } else {
                            bump(*i);
                        }
                    }
                }
            }
            for arg in args {
                expr_min_nf(arg, max);
            }
        }
        _ => {}
    }
}

// ==================== Normalized-form rendering ====================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Float(x) => write!(f, "{}", x),
            Expr::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Expr::FieldRef(0) => write!(f, "$0"),
            Expr::FieldRef(n) if *n > 0 => write!(f, "${}", n),
            Expr::FieldRef(n) => write!(f, "${{{}}}", n),
            Expr::FieldJoin(n) => write!(f, "${{{}+}}", n),
            Expr::FieldSlice(n) => write!(f, "@{{{}+}}", n),
            Expr::StashRef(name) => write!(f, "~{}", name),
            Expr::Unary { op, operand } => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                };
                write!(f, "{}{}", sym, operand)
            }
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "({} {} {})", lhs, op_symbol(*op), rhs)
            }
            Expr::Match {
                operand,
                pattern,
                negated,
            } => {
                let sym = if *negated { "!~" } else { "=~" };
                write!(f, "({} {} /{}/)", operand, sym, pattern.as_str())
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::PostIncr { name, delta } => {
                write!(f, "~{}{}", name, if *delta > 0 { "++" } else { "--" })
            }
        }
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::NumEq => "==",
        BinaryOp::NumNe => "!=",
        BinaryOp::NumLt => "<",
        BinaryOp::NumLe => "<=",
        BinaryOp::NumGt => ">",
        BinaryOp::NumGe => ">=",
        BinaryOp::StrEq => "eq",
        BinaryOp::StrNe => "ne",
        BinaryOp::StrLt => "lt",
        BinaryOp::StrLe => "le",
        BinaryOp::StrGt => "gt",
        BinaryOp::StrGe => "ge",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Concat => ".",
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expr(e) => write!(f, "{}", e),
            Stmt::Return(None) => write!(f, "return"),
            Stmt::Return(Some(e)) => write!(f, "return {}", e),
            Stmt::Delete(name) => write!(f, "delete ~{}", name),
            Stmt::Assign { name, op, value } => {
                let sym = match op {
                    AssignOp::Set => "=",
                    AssignOp::Add => "+=",
                    AssignOp::Sub => "-=",
                    AssignOp::Concat => ".=",
                };
                write!(f, "~{} {} {}", name, sym, value)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                write!(f, "if ({}) {{ ", cond)?;
                for (i, s) in then_branch.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, " }}")?;
                if !else_branch.is_empty() {
                    write!(f, " else {{ ")?;
                    for (i, s) in else_branch.iter().enumerate() {
                        if i > 0 {
                            write!(f, "; ")?;
                        }
                        write!(f, "{}", s)?;
                    }
                    write!(f, " }}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.stmts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}
