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

//! Record values accumulated by rule actions.

use crate::expr::Value;

/// A value pushed onto the engine's record list.
///
/// The engine imposes no shape on records beyond this enum; actions decide
/// what to return. `Null` is a real record: an action that explicitly
/// returned "no data" still occupies a slot in the list, which keeps record
/// indices aligned with the lines that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// An action returned undef ("no data").
    Null,
    /// Boolean record.
    Bool(bool),
    /// Integer record.
    Int(i64),
    /// Floating-point record.
    Float(f64),
    /// String record (the common case: a line or a joined field range).
    Str(String),
    /// List record, typically a captured field list.
    List(Vec<String>),
}

impl Record {
    /// Returns true if this record is the explicit "no data" marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get the record as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the record as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get the record as a float (integers widen).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Try to get the record as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the record as a list of strings.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Undef => Record::Null,
            Value::Bool(b) => Record::Bool(b),
            Value::Int(n) => Record::Int(n),
            Value::Float(f) => Record::Float(f),
            Value::Str(s) => Record::Str(s),
            Value::List(items) => {
                Record::List(items.iter().map(Value::to_text).collect())
            }
        }
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Record::Str(s.to_string())
    }
}

impl From<String> for Record {
    fn from(s: String) -> Self {
        Record::Str(s)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}
