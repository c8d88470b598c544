//! Minimal structural validator for JSON values.
//!
//! A `Schema` is a closed description of an acceptable shape: scalar kinds,
//! exact literals, pattern-constrained strings, homogeneous lists, fixed-arity
//! tuples, and objects with declared keys. Validation either rejects with a
//! path-aware [`Invalid`] report or succeeds with the *narrowed* value:
//! objects keep only their declared keys, arrays and tuples are rebuilt from
//! their elements' narrowed values.
//!
//! Design notes:
//! - Rejection is normal control flow for callers that try several schemas in
//!   order, so `validate` never panics on bad input.
//! - `refine` layers a predicate on top of any schema without changing how
//!   the base schema fails.
//! - `Undefined` matches no present value; an absent object key satisfies it
//!   (and `Any`), which is what makes declared-but-optional fields possible.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Value;

pub mod emit;

// ------------------------------- Literals --------------------------------- //

/// An exact scalar value. Numbers compare by numeric value, so literal `7`
/// accepts both `7` and `7.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Num(OrderedFloat<f64>),
    Bool(bool),
}

impl Literal {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::Str(want), Value::String(got)) => want == got,
            (Literal::Num(want), Value::Number(got)) => {
                got.as_f64().map(OrderedFloat) == Some(*want)
            }
            (Literal::Bool(want), Value::Bool(got)) => want == got,
            _ => false,
        }
    }

    /// The literal as a plain JSON value; whole numbers render as integers.
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str(s) => Value::from(s.clone()),
            Literal::Num(n) => json_num_pref_i64(n.0),
            Literal::Bool(b) => Value::from(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Str(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Num(OrderedFloat(v))
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Num(OrderedFloat(v as f64))
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Num(OrderedFloat(f64::from(v)))
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

// Helper: prefer emitting integers when exact
fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ------------------------------ Predicates -------------------------------- //

/// Boolean refinement over an already-validated value. Panics inside the
/// closure propagate to the caller.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

// -------------------------------- Schema ---------------------------------- //

#[derive(Debug, Clone)]
pub enum Schema {
    /// Accepts anything, including an absent object key.
    Any,
    /// Accepts no present value; only an absent object key satisfies it.
    Undefined,
    Null,
    Bool,
    Number,
    String,
    Literal(Literal),
    /// String constrained to match the pattern.
    Pattern(Regex),
    /// Any array, elements unconstrained.
    AnyArray,
    /// Any object, keys unconstrained and passed through untouched.
    AnyObject,
    /// Array whose every element satisfies the item schema.
    Array(Box<Schema>),
    /// Array of exactly this arity, validated per position.
    Tuple(Vec<Schema>),
    /// Object with (at least) the declared keys; undeclared keys are ignored
    /// and stripped from the narrowed value.
    Object(IndexMap<String, Schema>),
    /// Base schema further constrained by a predicate. Fails exactly like the
    /// base for values the base rejects.
    Refined(Box<Schema>, Predicate),
}

impl Schema {
    /// Validate `value`, returning the narrowed value or a rejection report.
    pub fn validate(&self, value: &Value) -> Result<Value, Invalid> {
        self.validate_at("$", value)
    }

    /// Compose with an extra predicate, producing a narrower schema.
    pub fn refine(self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Schema {
        Schema::Refined(Box::new(self), Predicate::new(predicate))
    }

    /// String schema constrained by a regex source.
    pub fn pattern(re: &str) -> Result<Schema, regex::Error> {
        Ok(Schema::Pattern(Regex::new(re)?))
    }

    /// Object schema from (key, schema) pairs, keeping declaration order.
    pub fn object<K, I>(fields: I) -> Schema
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// Whether an absent object key satisfies this schema.
    pub(crate) fn accepts_missing(&self) -> bool {
        matches!(self, Schema::Any | Schema::Undefined)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<Value, Invalid> {
        match self {
            Schema::Any => Ok(value.clone()),
            Schema::Undefined => Err(self.reject(path, value)),
            Schema::Null => match value {
                Value::Null => Ok(Value::Null),
                _ => Err(self.reject(path, value)),
            },
            Schema::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::Literal(lit) => {
                if lit.matches(value) {
                    Ok(value.clone())
                } else {
                    Err(self.reject(path, value))
                }
            }
            Schema::Pattern(rx) => match value {
                Value::String(s) if rx.is_match(s) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::AnyArray => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::AnyObject => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(self.reject(path, value)),
            },
            Schema::Array(item) => {
                let Value::Array(elements) = value else {
                    return Err(self.reject(path, value));
                };
                let mut out = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    out.push(item.validate_at(&format!("{path}[{i}]"), element)?);
                }
                Ok(Value::Array(out))
            }
            Schema::Tuple(slots) => {
                let Value::Array(elements) = value else {
                    return Err(self.reject(path, value));
                };
                if elements.len() != slots.len() {
                    return Err(self.reject(path, value));
                }
                let mut out = Vec::with_capacity(slots.len());
                for (i, (slot, element)) in slots.iter().zip(elements).enumerate() {
                    out.push(slot.validate_at(&format!("{path}[{i}]"), element)?);
                }
                Ok(Value::Array(out))
            }
            Schema::Object(fields) => {
                let Value::Object(source) = value else {
                    return Err(self.reject(path, value));
                };
                let mut out = serde_json::Map::new();
                for (key, field) in fields {
                    match source.get(key) {
                        Some(v) => {
                            out.insert(key.clone(), field.validate_at(&format!("{path}.{key}"), v)?);
                        }
                        None if field.accepts_missing() => {}
                        None => {
                            return Err(Invalid {
                                path: format!("{path}.{key}"),
                                expected: field.expected(),
                                found: "missing".to_string(),
                            });
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            Schema::Refined(base, predicate) => {
                let narrowed = base.validate_at(path, value)?;
                if predicate.test(&narrowed) {
                    Ok(narrowed)
                } else {
                    Err(self.reject(path, value))
                }
            }
        }
    }

    fn reject(&self, path: &str, value: &Value) -> Invalid {
        Invalid {
            path: path.to_string(),
            expected: self.expected(),
            found: describe(value),
        }
    }

    fn expected(&self) -> String {
        match self {
            Schema::Any => "anything".to_string(),
            Schema::Undefined => "undefined".to_string(),
            Schema::Null => "null".to_string(),
            Schema::Bool => "boolean".to_string(),
            Schema::Number => "number".to_string(),
            Schema::String => "string".to_string(),
            Schema::Literal(lit) => format!("literal {lit}"),
            Schema::Pattern(rx) => format!("string matching /{}/", rx.as_str()),
            Schema::AnyArray | Schema::Array(_) => "array".to_string(),
            Schema::Tuple(slots) => format!("array of length {}", slots.len()),
            Schema::AnyObject | Schema::Object(_) => "object".to_string(),
            Schema::Refined(base, _) => format!("{} passing predicate", base.expected()),
        }
    }
}

// ------------------------------- Rejection -------------------------------- //

/// Why a value failed validation. Rejection is expected control flow for
/// first-match-wins dispatch, not a caller error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: expected {expected}, found {found}")]
pub struct Invalid {
    /// Path to the rejected node, e.g. `$.message` or `$[2]`.
    pub path: String,
    pub expected: String,
    pub found: String,
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Array(elements) => format!("array of length {}", elements.len()),
        Value::Object(_) => "object".to_string(),
    }
}

// -------------------------------- Tests ----------------------------------- //
