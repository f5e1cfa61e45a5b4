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

//! Tree-walking evaluator for compiled rule programs.
//!
//! Evaluation runs against a [`LineContext`]; the positional and stash
//! surfaces resolve through it, so a rule's mutations (stash writes,
//! `splice_fields`) are visible to later rules on the same line. `&&`, `||`
//! and the word forms return their deciding operand rather than a plain
//! boolean, matching the scripting surface this language emulates.

use super::ast::{AssignOp, BinaryOp, Expr, Program, Stmt, UnaryOp};
use super::builtins;
use super::error::{ExprError, ExprResult};
use super::value::Value;
use crate::context::LineContext;

/// Evaluate a rule body. `return` short-circuits; a bare `return` yields
/// `Undef`. Without a `return`, the value of the last statement is the
/// program's value (Undef for an empty program).
pub fn eval_program(program: &Program, ctx: &mut LineContext<'_>) -> ExprResult<Value> {
    match eval_stmts(&program.stmts, ctx)? {
        Flow::Return(v) => Ok(v),
        Flow::Normal(v) => Ok(v),
    }
}

/// Evaluate a predicate program to a boolean. Undefined and false values
/// yield `false`.
pub fn eval_predicate(program: &Program, ctx: &mut LineContext<'_>) -> ExprResult<bool> {
    Ok(eval_program(program, ctx)?.truthy())
}

enum Flow {
    Normal(Value),
    Return(Value),
}

fn eval_stmts(stmts: &[Stmt], ctx: &mut LineContext<'_>) -> ExprResult<Flow> {
    let mut last = Value::Undef;
    for stmt in stmts {
        match eval_stmt(stmt, ctx)? {
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Normal(v) => last = v,
        }
    }
    Ok(Flow::Normal(last))
}

fn eval_stmt(stmt: &Stmt, ctx: &mut LineContext<'_>) -> ExprResult<Flow> {
    match stmt {
        Stmt::Expr(e) => Ok(Flow::Normal(eval_expr(e, ctx)?)),
        Stmt::Return(None) => Ok(Flow::Return(Value::Undef)),
        Stmt::Return(Some(e)) => Ok(Flow::Return(eval_expr(e, ctx)?)),
        Stmt::Delete(name) => Ok(Flow::Normal(ctx.stash_delete(name))),
        Stmt::Assign { name, op, value } => {
            let rhs = eval_expr(value, ctx)?;
            let new = match op {
                AssignOp::Set => rhs,
                AssignOp::Add => numeric_add(&ctx.stashed(name), &rhs),
                AssignOp::Sub => numeric_add(&ctx.stashed(name), &negate(&rhs)),
                AssignOp::Concat => {
                    Value::Str(ctx.stashed(name).to_text() + &rhs.to_text())
                }
            };
            ctx.stash_set(name, new.clone())?;
            Ok(Flow::Normal(new))
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_expr(cond, ctx)?.truthy() {
                eval_stmts(then_branch, ctx)
            } else {
                eval_stmts(else_branch, ctx)
            }
        }
    }
}

fn eval_expr(expr: &Expr, ctx: &mut LineContext<'_>) -> ExprResult<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),

        // $0 is the whole line; $N is 1-based and lowers onto the 0-based
        // context accessor; negative indices pass through unchanged.
        Expr::FieldRef(0) => Ok(Value::Str(ctx.this_line()?.to_string())),
        Expr::FieldRef(n) if *n > 0 => Ok(Value::Str(ctx.field(n - 1)?.to_string())),
        Expr::FieldRef(n) => Ok(Value::Str(ctx.field(*n)?.to_string())),

        Expr::FieldJoin(n) => {
            let start = join_start(*n);
            Ok(Value::Str(ctx.join_range(start, -1, None)?))
        }
        Expr::FieldSlice(n) => {
            let start = join_start(*n);
            let fields = ctx.field_range(start, -1)?;
            Ok(Value::List(fields.into_iter().map(Value::Str).collect()))
        }

        Expr::StashRef(name) => Ok(ctx.stashed(name)),

        Expr::Unary { op, operand } => {
            let v = eval_expr(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                UnaryOp::Neg => Ok(negate(&v)),
            }
        }

        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, ctx),

        Expr::Match {
            operand,
            pattern,
            negated,
        } => {
            let text = eval_expr(operand, ctx)?.to_text();
            let matched = pattern.is_match(&text);
            Ok(Value::Bool(matched != *negated))
        }

        Expr::Call { name, args } => eval_call(name, args, ctx),

        Expr::PostIncr { name, delta } => {
            let old = ctx.stashed(name);
            let old_num = if old.is_undef() {
                Value::Int(0)
            } else {
                old.clone()
            };
            let new = numeric_add(&old_num, &Value::Int(*delta));
            ctx.stash_set(name, new)?;
            Ok(old_num)
        }
    }
}

/// `${N+}` / `@{N+}`: positive N is 1-based (start at field N), negative N
/// counts from the end and passes through.
fn join_start(n: i64) -> i64 {
    if n > 0 {
        n - 1
    } else {
        n
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut LineContext<'_>,
) -> ExprResult<Value> {
    // Short-circuit forms return their deciding operand
    match op {
        BinaryOp::Or => {
            let l = eval_expr(lhs, ctx)?;
            if l.truthy() {
                return Ok(l);
            }
            return eval_expr(rhs, ctx);
        }
        BinaryOp::And => {
            let l = eval_expr(lhs, ctx)?;
            if !l.truthy() {
                return Ok(l);
            }
            return eval_expr(rhs, ctx);
        }
        _ => {}
    }

    let l = eval_expr(lhs, ctx)?;
    let r = eval_expr(rhs, ctx)?;

    let bool_of = |b: bool| Ok(Value::Bool(b));
    match op {
        BinaryOp::NumEq => bool_of(l.to_num() == r.to_num()),
        BinaryOp::NumNe => bool_of(l.to_num() != r.to_num()),
        BinaryOp::NumLt => bool_of(l.to_num() < r.to_num()),
        BinaryOp::NumLe => bool_of(l.to_num() <= r.to_num()),
        BinaryOp::NumGt => bool_of(l.to_num() > r.to_num()),
        BinaryOp::NumGe => bool_of(l.to_num() >= r.to_num()),
        BinaryOp::StrEq => bool_of(l.to_text() == r.to_text()),
        BinaryOp::StrNe => bool_of(l.to_text() != r.to_text()),
        BinaryOp::StrLt => bool_of(l.to_text() < r.to_text()),
        BinaryOp::StrLe => bool_of(l.to_text() <= r.to_text()),
        BinaryOp::StrGt => bool_of(l.to_text() > r.to_text()),
        BinaryOp::StrGe => bool_of(l.to_text() >= r.to_text()),
        BinaryOp::Add => Ok(numeric_add(&l, &r)),
        BinaryOp::Sub => Ok(numeric_add(&l, &negate(&r))),
        BinaryOp::Mul => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Ok(a
                .checked_mul(*b)
                .map(Value::Int)
                .unwrap_or_else(|| Value::Float(l.to_num() * r.to_num()))),
            _ => Ok(Value::Float(l.to_num() * r.to_num())),
        },
        BinaryOp::Div => {
            let divisor = r.to_num();
            if divisor == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Float(l.to_num() / divisor))
        }
        BinaryOp::Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.rem_euclid(*b)))
                }
            }
            _ => {
                let divisor = r.to_num();
                if divisor == 0.0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(Value::Float(l.to_num() % divisor))
                }
            }
        },
        BinaryOp::Concat => Ok(Value::Str(l.to_text() + &r.to_text())),
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    }
}

/// Addition preserving integer-ness when both operands are integers.
fn numeric_add(l: &Value, r: &Value) -> Value {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(*a as f64 + *b as f64)),
        (Value::Undef, Value::Int(b)) => Value::Int(*b),
        (Value::Int(a), Value::Undef) => Value::Int(*a),
        _ => Value::Float(l.to_num() + r.to_num()),
    }
}

fn negate(v: &Value) -> Value {
    match v {
        Value::Int(n) => n
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(-(*n as f64))),
        other => Value::Float(-other.to_num()),
    }
}

fn eval_call(name: &str, args: &[Expr], ctx: &mut LineContext<'_>) -> ExprResult<Value> {
    if !builtins::is_context_builtin(name) {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(eval_expr(arg, ctx)?);
        }
        return builtins::call_pure(name, &values);
    }

    match name {
        "NF" => Ok(Value::Int(ctx.nf() as i64)),
        "NR" => Ok(Value::Int(ctx.nr() as i64)),
        "this_line" => Ok(Value::Str(ctx.this_line()?.to_string())),
        "this_indent" => Ok(Value::Int(ctx.this_indent() as i64)),
        "lines_parsed" => Ok(Value::Int(ctx.lines_parsed() as i64)),
        "abort_reading" => {
            ctx.abort_reading();
            Ok(Value::Undef)
        }
        "stashed" => {
            let name = eval_expr(&args[0], ctx)?.to_text();
            Ok(ctx.stashed(&name))
        }
        "field" => {
            let i = eval_expr(&args[0], ctx)?.to_int();
            Ok(Value::Str(ctx.field(i)?.to_string()))
        }
        "field_range" => {
            let i = eval_expr(&args[0], ctx)?.to_int();
            let j = eval_expr(&args[1], ctx)?.to_int();
            Ok(Value::List(
                ctx.field_range(i, j)?.into_iter().map(Value::Str).collect(),
            ))
        }
        "join_range" => {
            let i = eval_expr(&args[0], ctx)?.to_int();
            let j = eval_expr(&args[1], ctx)?.to_int();
            let sep = match args.get(2) {
                Some(e) => Some(eval_expr(e, ctx)?.to_text()),
                None => None,
            };
            Ok(Value::Str(ctx.join_range(i, j, sep.as_deref())?))
        }
        "find_field" => {
            let pattern = eval_expr(&args[0], ctx)?.to_text();
            let re = compile_runtime_regex(&pattern)?;
            Ok(ctx
                .find_field(|f| re.is_match(f))
                .map(|f| Value::Str(f.to_string()))
                .unwrap_or(Value::Undef))
        }
        "find_field_index" => {
            let pattern = eval_expr(&args[0], ctx)?.to_text();
            let re = compile_runtime_regex(&pattern)?;
            Ok(Value::Int(
                ctx.find_field_index(|f| re.is_match(f))
                    .map(|i| i as i64)
                    .unwrap_or(-1),
            ))
        }
        "splice_fields" => {
            let offset = eval_expr(&args[0], ctx)?.to_int();
            let len = match args.get(1) {
                Some(e) => Some(eval_expr(e, ctx)?.to_int()),
                None => None,
            };
            let mut replacement = Vec::new();
            for arg in args.iter().skip(2) {
                match eval_expr(arg, ctx)? {
                    Value::List(items) => {
                        replacement.extend(items.into_iter().map(|v| v.to_text()));
                    }
                    other => replacement.push(other.to_text()),
                }
            }
            let removed = ctx.splice_fields(offset, len, replacement);
            Ok(Value::List(removed.into_iter().map(Value::Str).collect()))
        }
        other => Err(ExprError::UnknownFunction {
            name: other.to_string(),
            pos: 0,
        }),
    }
}

fn compile_runtime_regex(pattern: &str) -> ExprResult<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| ExprError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
