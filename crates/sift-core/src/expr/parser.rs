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

//! Parser for the rule expression mini-language.
//!
//! # Grammar (informal)
//!
//! ```text
//! program  = stmt (";" stmt)* ";"?
//! stmt     = "return" expr?
//!          | "delete" stashref
//!          | "if" "(" expr ")" block ("else" block)?
//!          | stashref assign-op expr
//!          | expr
//! block    = "{" program "}"
//! expr     = or
//! or       = and (("||" | "or") and)*
//! and      = eqy (("&&" | "and") eqy)*
//! eqy      = rel (("==" | "!=" | "eq" | "ne") rel)*
//! rel      = mat (("<" | "<=" | ">" | ">=" | "lt" | "le" | "gt" | "ge") mat)*
//! mat      = add (("=~" | "!~") (regex | string))*
//! add      = mul (("+" | "-" | ".") mul)*
//! mul      = unary (("*" | "/" | "%") unary)*
//! unary    = ("!" | "not" | "-") unary | postfix
//! postfix  = primary ("++" | "--")?          (stash refs only)
//! primary  = literal | fieldref | stashref | call | "(" expr ")"
//! call     = ident "(" args ")" | zero-arg-builtin | "$this" "." call
//! ```
//!
//! Builtin names and arities are validated here, so a rule referencing an
//! unknown function or calling with the wrong argument count fails at
//! definition time rather than mid-read.

use super::ast::{AssignOp, BinaryOp, Expr, Program, Stmt, UnaryOp};
use super::builtins;
use super::error::{ExprError, ExprResult};
use super::token::{SpannedToken, Token};
use regex::Regex;

/// Parse a full rule body (statement list).
pub fn parse_program(tokens: Vec<SpannedToken>, max_depth: usize) -> ExprResult<Program> {
    let mut parser = Parser::new(tokens, max_depth);
    let stmts = parser.parse_stmts(false)?;
    parser.expect_end()?;
    Ok(Program { stmts })
}

/// Parse a predicate: one expression, fully consumed.
pub fn parse_predicate(tokens: Vec<SpannedToken>, max_depth: usize) -> ExprResult<Program> {
    let mut parser = Parser::new(tokens, max_depth);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(Program {
        stmts: vec![Stmt::Expr(expr)],
    })
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.pos + 1).unwrap_or(0))
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|t| t.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ExprResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_end(&mut self) -> ExprResult<()> {
        if self.pos < self.tokens.len() {
            Err(self.unexpected())
        } else {
            Ok(())
        }
    }

    fn unexpected(&self) -> ExprError {
        match self.peek() {
            Some(tok) => ExprError::UnexpectedToken {
                found: tok.describe(),
                pos: self.peek_pos(),
            },
            None => ExprError::UnexpectedEnd,
        }
    }

    // ==================== Statements ====================

    /// Parse statements until end of input (or a closing brace when
    /// `in_block` is set; the brace is left for the caller).
    fn parse_stmts(&mut self, in_block: bool) -> ExprResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            if self.pos >= self.tokens.len() {
                break;
            }
            if in_block && self.peek() == Some(&Token::RBrace) {
                break;
            }
            stmts.push(self.parse_stmt()?);
            // Statements are separated by `;`; a closing brace or the end
            // of input also terminates the last one.
            if !self.eat(&Token::Semi) {
                if self.pos >= self.tokens.len() {
                    break;
                }
                if in_block && self.peek() == Some(&Token::RBrace) {
                    break;
                }
                return Err(self.unexpected());
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ExprResult<Stmt> {
        if self.eat_ident("return") {
            let at_end = self.pos >= self.tokens.len()
                || matches!(self.peek(), Some(Token::Semi) | Some(Token::RBrace));
            if at_end {
                return Ok(Stmt::Return(None));
            }
            return Ok(Stmt::Return(Some(self.parse_expr()?)));
        }

        if self.eat_ident("delete") {
            return match self.advance() {
                Some(Token::StashRef(name)) => Ok(Stmt::Delete(name)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    Err(self.unexpected())
                }
            };
        }

        if self.eat_ident("if") {
            return self.parse_if();
        }

        // Assignment: a stash ref followed by an assignment operator
        if let Some(Token::StashRef(name)) = self.peek().cloned() {
            let op = match self.tokens.get(self.pos + 1).map(|t| &t.token) {
                Some(Token::Assign) => Some(AssignOp::Set),
                Some(Token::PlusAssign) => Some(AssignOp::Add),
                Some(Token::MinusAssign) => Some(AssignOp::Sub),
                Some(Token::DotAssign) => Some(AssignOp::Concat),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 2;
                let value = self.parse_expr()?;
                return Ok(Stmt::Assign { name, op, value });
            }
        }

        // An assignment operator anywhere else is a parse error on the
        // target, reported explicitly.
        let expr = self.parse_expr()?;
        if matches!(
            self.peek(),
            Some(Token::Assign)
                | Some(Token::PlusAssign)
                | Some(Token::MinusAssign)
                | Some(Token::DotAssign)
        ) {
            return Err(ExprError::NotAssignable {
                pos: self.peek_pos(),
            });
        }
        Ok(Stmt::Expr(expr))
    }

    fn parse_if(&mut self) -> ExprResult<Stmt> {
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat_ident("else") {
            if matches!(self.peek(), Some(Token::Ident(w)) if w == "if") {
                self.pos += 1;
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_block(&mut self) -> ExprResult<Vec<Stmt>> {
        self.expect(&Token::LBrace)?;
        let stmts = self.parse_stmts(true)?;
        self.expect(&Token::RBrace)?;
        Ok(stmts)
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> ExprResult<Expr> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::TooDeep {
                depth: self.depth,
                max: self.max_depth,
            });
        }
        let result = self.parse_or();
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_and()?;
        loop {
            if self.eat(&Token::OrOr) || self.eat_ident("or") {
                let rhs = self.parse_and()?;
                lhs = binary(BinaryOp::Or, lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_equality()?;
        loop {
            if self.eat(&Token::AndAnd) || self.eat_ident("and") {
                let rhs = self.parse_equality()?;
                lhs = binary(BinaryOp::And, lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_equality(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.eat(&Token::EqEq) {
                BinaryOp::NumEq
            } else if self.eat(&Token::NotEq) {
                BinaryOp::NumNe
            } else if self.eat_ident("eq") {
                BinaryOp::StrEq
            } else if self.eat_ident("ne") {
                BinaryOp::StrNe
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_relational(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_match()?;
        loop {
            let op = if self.eat(&Token::Le) {
                BinaryOp::NumLe
            } else if self.eat(&Token::Ge) {
                BinaryOp::NumGe
            } else if self.eat(&Token::Lt) {
                BinaryOp::NumLt
            } else if self.eat(&Token::Gt) {
                BinaryOp::NumGt
            } else if self.eat_ident("lt") {
                BinaryOp::StrLt
            } else if self.eat_ident("le") {
                BinaryOp::StrLe
            } else if self.eat_ident("gt") {
                BinaryOp::StrGt
            } else if self.eat_ident("ge") {
                BinaryOp::StrGe
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_match()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_match(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let negated = if self.eat(&Token::Match) {
                false
            } else if self.eat(&Token::NotMatch) {
                true
            } else {
                return Ok(lhs);
            };
            let pattern_src = match self.advance() {
                Some(Token::Regex(p)) => p,
                Some(Token::Str(p)) => p,
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.unexpected());
                }
            };
            let pattern = Regex::new(&pattern_src).map_err(|e| ExprError::InvalidRegex {
                pattern: pattern_src.clone(),
                message: e.to_string(),
            })?;
            lhs = Expr::Match {
                operand: Box::new(lhs),
                pattern,
                negated,
            };
        }
    }

    fn parse_additive(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinaryOp::Add
            } else if self.eat(&Token::Minus) {
                BinaryOp::Sub
            } else if self.eat(&Token::Dot) {
                BinaryOp::Concat
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinaryOp::Mul
            } else if self.eat(&Token::Slash) {
                BinaryOp::Div
            } else if self.eat(&Token::Percent) {
                BinaryOp::Mod
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.eat(&Token::Not) || self.eat_ident("not") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ExprResult<Expr> {
        let primary = self.parse_primary()?;
        let delta = if self.eat(&Token::PlusPlus) {
            1
        } else if self.eat(&Token::MinusMinus) {
            -1
        } else {
            return Ok(primary);
        };
        match primary {
            Expr::StashRef(name) => Ok(Expr::PostIncr { name, delta }),
            _ => Err(ExprError::NotAssignable {
                pos: self.peek_pos(),
            }),
        }
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        let pos = self.peek_pos();
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::FieldRef(n)) => Ok(Expr::FieldRef(n)),
            Some(Token::FieldJoin(n)) => Ok(Expr::FieldJoin(n)),
            Some(Token::FieldSlice(n)) => Ok(Expr::FieldSlice(n)),
            Some(Token::StashRef(name)) => Ok(Expr::StashRef(name)),
            Some(Token::This) => {
                // $this.method(...) is sugar for the bare builtin call
                self.expect(&Token::Dot)?;
                match self.advance() {
                    Some(Token::Ident(name)) => self.parse_call(name, pos),
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        Err(self.unexpected())
                    }
                }
            }
            Some(Token::Ident(name)) => {
                if is_reserved_word(&name) {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
                self.parse_call(name, pos)
            }
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected())
            }
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_call(&mut self, name: String, pos: usize) -> ExprResult<Expr> {
        let (min, max) = builtins::signature(&name)
            .ok_or_else(|| ExprError::UnknownFunction {
                name: name.clone(),
                pos,
            })?;

        let args = if self.eat(&Token::LParen) {
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(&Token::Comma)?;
                }
            }
            args
        } else {
            // Bare form is only valid for zero-argument builtins (NF, NR, ...)
            Vec::new()
        };

        if args.len() < min || args.len() > max {
            let expected = if max == usize::MAX {
                format!("at least {}", min)
            } else if min == max {
                format!("{}", min)
            } else {
                format!("{}..{}", min, max)
            };
            return Err(ExprError::WrongArity {
                name,
                expected,
                got: args.len(),
                pos,
            });
        }

        Ok(Expr::Call { name, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn is_reserved_word(word: &str) -> bool {
    matches!(
        word,
        "return" | "if" | "else" | "delete" | "eq" | "ne" | "lt" | "le" | "gt" | "ge" | "and"
            | "or" | "not"
    )
}
