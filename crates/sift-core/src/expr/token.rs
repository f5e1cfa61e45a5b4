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

//! Lexer for the rule expression mini-language.
//!
//! The positional surface (`$0`, `$3`, `${-1}`, `${2+}`, `@{1+}`, `~name`)
//! is lexed directly into dedicated tokens rather than rewritten textually;
//! the parser builds field-reference AST nodes from them. Regex literals
//! (`/.../`) are only recognized immediately after `=~` or `!~`, which is
//! the one position they can legally appear in.

use super::error::{ExprError, ExprResult};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$0`, `$_` (0), `$N`, `${N}`, `${-N}`.
    FieldRef(i64),
    /// `${N+}` / `${-N+}`: fields N..last joined with the output separator.
    FieldJoin(i64),
    /// `@{N+}` / `@{-N+}` / `\@{N+}`: fields N..last as a list.
    FieldSlice(i64),
    /// `~name`: stash variable.
    StashRef(String),
    /// `$this`: engine back-reference for method-call sugar.
    This,

    Int(i64),
    Float(f64),
    Str(String),
    /// Regex literal, recognized only after `=~` / `!~`.
    Regex(String),
    /// Identifier: builtin names, keywords, word operators.
    Ident(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    DotAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
    AndAnd,
    OrOr,
    Not,
}

impl Token {
    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::FieldRef(n) => format!("field reference ${}", n),
            Token::FieldJoin(n) => format!("field join ${{{}+}}", n),
            Token::FieldSlice(n) => format!("field slice @{{{}+}}", n),
            Token::StashRef(name) => format!("stash variable ~{}", name),
            Token::This => "$this".to_string(),
            Token::Int(n) => format!("integer {}", n),
            Token::Float(f) => format!("number {}", f),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Regex(r) => format!("regex /{}/", r),
            Token::Ident(name) => format!("identifier '{}'", name),
            other => format!("token {:?}", other),
        }
    }
}

/// A token with its source offset (in characters).
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub pos: usize,
}

/// Tokenize a rule source string.
pub fn tokenize(source: &str) -> ExprResult<Vec<SpannedToken>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    out: Vec<SpannedToken>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> ExprResult<Vec<SpannedToken>> {
        while self.pos < self.chars.len() {
            self.skip_whitespace();
            if self.pos >= self.chars.len() {
                break;
            }
            let start = self.pos;
            let token = self.next_token()?;
            self.out.push(SpannedToken { token, pos: start });
        }
        Ok(self.out)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn last_token(&self) -> Option<&Token> {
        self.out.last().map(|t| &t.token)
    }

    fn next_token(&mut self) -> ExprResult<Token> {
        let start = self.pos;
        let ch = self.advance().ok_or(ExprError::UnexpectedEnd)?;

        match ch {
            '$' => self.lex_dollar(start),
            '@' => self.lex_field_slice(start),
            '\\' if self.peek() == Some('@') => {
                // \@{N+} is the reference form; lists are first-class values here
                self.advance();
                self.lex_field_slice(start)
            }
            '~' => self.lex_stash_ref(start),
            '\'' | '"' => self.lex_string(ch, start),
            '0'..='9' => {
                self.pos = start;
                self.lex_number(start)
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                self.pos = start;
                Ok(Token::Ident(self.lex_ident()))
            }
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '{' => Ok(Token::LBrace),
            '}' => Ok(Token::RBrace),
            ',' => Ok(Token::Comma),
            ';' => Ok(Token::Semi),
            '%' => Ok(Token::Percent),
            '*' => Ok(Token::Star),
            '/' => {
                // Regex literal position: only directly after a match operator
                if matches!(self.last_token(), Some(Token::Match) | Some(Token::NotMatch)) {
                    self.lex_regex(start)
                } else {
                    Ok(Token::Slash)
                }
            }
            '+' => match self.peek() {
                Some('+') => {
                    self.advance();
                    Ok(Token::PlusPlus)
                }
                Some('=') => {
                    self.advance();
                    Ok(Token::PlusAssign)
                }
                _ => Ok(Token::Plus),
            },
            '-' => match self.peek() {
                Some('-') => {
                    self.advance();
                    Ok(Token::MinusMinus)
                }
                Some('=') => {
                    self.advance();
                    Ok(Token::MinusAssign)
                }
                _ => Ok(Token::Minus),
            },
            '.' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::DotAssign)
                } else {
                    Ok(Token::Dot)
                }
            }
            '=' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Ok(Token::EqEq)
                }
                Some('~') => {
                    self.advance();
                    Ok(Token::Match)
                }
                _ => Ok(Token::Assign),
            },
            '!' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Ok(Token::NotEq)
                }
                Some('~') => {
                    self.advance();
                    Ok(Token::NotMatch)
                }
                _ => Ok(Token::Not),
            },
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Le)
                } else {
                    Ok(Token::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    Ok(Token::AndAnd)
                } else {
                    Err(ExprError::UnexpectedChar { ch: '&', pos: start })
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    Ok(Token::OrOr)
                } else {
                    Err(ExprError::UnexpectedChar { ch: '|', pos: start })
                }
            }
            other => Err(ExprError::UnexpectedChar {
                ch: other,
                pos: start,
            }),
        }
    }

    /// Lex after a `$`: `$0`, `$_`, `$N`, `$this`, `${...}`.
    fn lex_dollar(&mut self, start: usize) -> ExprResult<Token> {
        match self.peek() {
            Some('_') => {
                self.advance();
                Ok(Token::FieldRef(0))
            }
            Some('{') => {
                self.advance();
                let (index, plus) = self.lex_braced_index(start)?;
                if plus {
                    if index == 0 {
                        return Err(self.invalid_field_ref(start));
                    }
                    Ok(Token::FieldJoin(index))
                } else {
                    Ok(Token::FieldRef(index))
                }
            }
            Some(c) if c.is_ascii_digit() => {
                let n = self.lex_raw_integer();
                Ok(Token::FieldRef(n))
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let ident = self.lex_ident();
                if ident == "this" {
                    Ok(Token::This)
                } else {
                    Err(self.invalid_field_ref(start))
                }
            }
            _ => Err(self.invalid_field_ref(start)),
        }
    }

    /// Lex `@{N+}` / `@{-N+}`.
    fn lex_field_slice(&mut self, start: usize) -> ExprResult<Token> {
        if self.peek() != Some('{') {
            return Err(self.invalid_field_ref(start));
        }
        self.advance();
        let (index, plus) = self.lex_braced_index(start)?;
        if !plus || index == 0 {
            return Err(self.invalid_field_ref(start));
        }
        Ok(Token::FieldSlice(index))
    }

    /// Lex the inside of `${...}` / `@{...}`: `[-]N[+]` followed by `}`.
    fn lex_braced_index(&mut self, start: usize) -> ExprResult<(i64, bool)> {
        let negative = if self.peek() == Some('-') {
            self.advance();
            true
        } else {
            false
        };
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(self.invalid_field_ref(start));
        }
        let mut n = self.lex_raw_integer();
        if negative {
            if n == 0 {
                return Err(self.invalid_field_ref(start));
            }
            n = -n;
        }
        let plus = if self.peek() == Some('+') {
            self.advance();
            true
        } else {
            false
        };
        if self.peek() != Some('}') {
            return Err(self.invalid_field_ref(start));
        }
        self.advance();
        Ok((n, plus))
    }

    fn invalid_field_ref(&mut self, start: usize) -> ExprError {
        // Consume up to the closing brace or next whitespace for the message
        let mut end = self.pos;
        while end < self.chars.len() && !self.chars[end].is_whitespace() {
            let ch = self.chars[end];
            end += 1;
            if ch == '}' {
                break;
            }
        }
        let text: String = self.chars[start..end].iter().collect();
        self.pos = end;
        ExprError::InvalidFieldRef { text, pos: start }
    }

    /// Lex `~name`.
    fn lex_stash_ref(&mut self, start: usize) -> ExprResult<Token> {
        if !matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == '_') {
            return Err(ExprError::UnexpectedChar {
                ch: '~',
                pos: start,
            });
        }
        Ok(Token::StashRef(self.lex_ident()))
    }

    fn lex_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn lex_raw_integer(&mut self) -> i64 {
        let mut n: i64 = 0;
        while let Some(ch) = self.peek() {
            if let Some(d) = ch.to_digit(10) {
                n = n.saturating_mul(10).saturating_add(d as i64);
                self.advance();
            } else {
                break;
            }
        }
        n
    }

    fn lex_number(&mut self, start: usize) -> ExprResult<Token> {
        let mut text = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                // A dot is part of the number only when digits follow;
                // otherwise it is the concatenation operator.
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
                    has_dot = true;
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        if has_dot {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExprError::InvalidNumber { text, pos: start })
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| ExprError::InvalidNumber { text, pos: start })
        }
    }

    fn lex_string(&mut self, quote: char, start: usize) -> ExprResult<Token> {
        let mut result = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(Token::Str(result)),
                Some('\\') => match self.advance() {
                    Some('n') if quote == '"' => result.push('\n'),
                    Some('t') if quote == '"' => result.push('\t'),
                    Some('r') if quote == '"' => result.push('\r'),
                    Some('0') if quote == '"' => result.push('\0'),
                    Some('\\') => result.push('\\'),
                    Some(c) if c == quote => result.push(c),
                    Some(c) => {
                        // Unknown escapes keep the backslash, single-quote style
                        result.push('\\');
                        result.push(c);
                    }
                    None => return Err(ExprError::UnterminatedString { pos: start }),
                },
                Some(ch) => result.push(ch),
                None => return Err(ExprError::UnterminatedString { pos: start }),
            }
        }
    }

    fn lex_regex(&mut self, start: usize) -> ExprResult<Token> {
        let mut pattern = String::new();
        loop {
            match self.advance() {
                Some('/') => return Ok(Token::Regex(pattern)),
                Some('\\') => match self.advance() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(ExprError::UnterminatedRegex { pos: start }),
                },
                Some(ch) => pattern.push(ch),
                None => return Err(ExprError::UnterminatedRegex { pos: start }),
            }
        }
    }
}
