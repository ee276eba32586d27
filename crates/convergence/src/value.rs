//! Dynamically typed property values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value stored on a resource property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Integer(i64),
    String(String),
    /// Interned name such as `:uuid`. Only produced by coercion.
    #[serde(skip_deserializing)]
    Symbol(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Class of a [`Value`], used for `kind_of` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Integer,
    String,
    Symbol,
    List,
    Map,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::Bool => "Bool",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Symbol => "Symbol",
            Self::List => "List",
            Self::Map => "Map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Nil => ValueKind::Nil,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::String(_) => ValueKind::String,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Build a list of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness: only `Nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Plain string form, as used when comparing values "as strings".
    ///
    /// `Nil` renders as the empty string and lists join their elements
    /// with commas.
    pub fn to_s(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::String(s) | Self::Symbol(s) => s.clone(),
            Self::List(items) => items.iter().map(Value::to_s).collect::<Vec<_>>().join(","),
            Self::Map(_) => self.to_string(),
        }
    }

    /// Whether the value supports the named operation.
    pub fn responds_to(&self, operation: &str) -> bool {
        let common = ["to_s", "inspect", "nil?", "==", "kind_of?"];
        if common.contains(&operation) {
            return true;
        }
        let ops: &[&str] = match self {
            Self::Nil => &["to_a", "to_i"],
            Self::Bool(_) => &["&", "|", "!"],
            Self::Integer(_) => &["to_i", "abs", "zero?", "+", "-", "<", ">", "succ"],
            Self::String(_) => &[
                "to_str", "to_sym", "split", "length", "size", "empty?", "upcase", "downcase",
                "strip", "chars", "start_with?", "end_with?", "=~", "+",
            ],
            Self::Symbol(_) => &["to_sym", "length", "size", "empty?", "upcase", "downcase"],
            Self::List(_) => &[
                "to_a", "to_ary", "each", "map", "join", "length", "size", "empty?", "include?",
                "first", "last", "+", "-",
            ],
            Self::Map(_) => &[
                "to_h", "to_hash", "each", "keys", "values", "key?", "fetch", "length", "size",
                "empty?", "[]",
            ],
        };
        ops.contains(&operation)
    }

    /// Evaluate a negative predicate such as `empty` or `nil`.
    ///
    /// Returns `None` when the predicate does not apply to this value.
    pub fn predicate(&self, name: &str) -> Option<bool> {
        let name = name.trim_end_matches('?');
        match name {
            "nil" => Some(self.is_nil()),
            "empty" => match self {
                Self::String(s) | Self::Symbol(s) => Some(s.is_empty()),
                Self::List(items) => Some(items.is_empty()),
                Self::Map(map) => Some(map.is_empty()),
                _ => None,
            },
            "blank" => match self {
                Self::Nil => Some(true),
                Self::Bool(b) => Some(!b),
                Self::String(s) => Some(s.trim().is_empty()),
                Self::List(items) => Some(items.is_empty()),
                Self::Map(map) => Some(map.is_empty()),
                _ => None,
            },
            "zero" => self.as_integer().map(|i| i == 0),
            "negative" => self.as_integer().map(|i| i < 0),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, ":{s}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Nil, Into::into)
    }
}
