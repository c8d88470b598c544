//! Compact shorthand notation for schemas, and its compiler.
//!
//! A shorthand is a loose structural description of a matching rule:
//! class markers for the scalar kinds, bare literals, regexes, one-element
//! sequences for homogeneous arrays, `[n, [..]]` tagged tuples, field maps
//! for objects, or an already-built schema passed through unchanged. The
//! compiler normalizes all of that into a [`Schema`].
//!
//! Compilation is pure and total apart from one documented format error:
//! array shapes that are neither `[element]` nor a `[n, [..]]` tuple tag.
//! Cyclic shorthands cannot be constructed (the tree is owned), so
//! termination is structural.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;

use crate::schema::{Literal, Schema};

// ------------------------------- Shorthand -------------------------------- //

/// The closed shorthand tree. Ergonomic entry points go through the `From`
/// impls; `compile` accepts anything `Into<Shorthand>`.
#[derive(Debug, Clone)]
pub enum Shorthand {
    /// No constraint at all. Compiles to the accept-anything schema.
    Any,
    /// Exactly the absent value; distinct from [`Shorthand::Any`].
    Undefined,
    Null,
    /// Any string / number / boolean, as class markers.
    AnyString,
    AnyNumber,
    AnyBool,
    /// Any array / any object, elements and keys unconstrained.
    AnyArray,
    AnyObject,
    /// A specific scalar value.
    Lit(Literal),
    /// Strings matching the pattern.
    Pattern(Regex),
    /// Array-shaped shorthand: `[]`, `[element]`, or `[n, [e1, .., en]]`.
    Items(Vec<Shorthand>),
    /// Object with the given keys, each compiled recursively; unlisted keys
    /// are left unconstrained.
    Fields(IndexMap<String, Shorthand>),
    /// A pre-built schema, passed through unchanged.
    Schema(Schema),
}

impl From<&str> for Shorthand {
    fn from(v: &str) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<String> for Shorthand {
    fn from(v: String) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<f64> for Shorthand {
    fn from(v: f64) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<i64> for Shorthand {
    fn from(v: i64) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<i32> for Shorthand {
    fn from(v: i32) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<bool> for Shorthand {
    fn from(v: bool) -> Self {
        Shorthand::Lit(Literal::from(v))
    }
}

impl From<Literal> for Shorthand {
    fn from(v: Literal) -> Self {
        Shorthand::Lit(v)
    }
}

impl From<Regex> for Shorthand {
    fn from(v: Regex) -> Self {
        Shorthand::Pattern(v)
    }
}

impl From<Schema> for Shorthand {
    fn from(v: Schema) -> Self {
        Shorthand::Schema(v)
    }
}

impl From<Vec<Shorthand>> for Shorthand {
    fn from(v: Vec<Shorthand>) -> Self {
        Shorthand::Items(v)
    }
}

impl From<IndexMap<String, Shorthand>> for Shorthand {
    fn from(v: IndexMap<String, Shorthand>) -> Self {
        Shorthand::Fields(v)
    }
}

// -------------------------------- Errors ---------------------------------- //

/// The one shorthand format error: an array shape that is neither a
/// one-element sequence nor a tagged tuple. Always a bug in the case
/// declaration, never a data error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid shorthand: arrays should be in the form `[shorthand]`, and tuples \
     should be in the form `[3, [shorthand1, shorthand2, shorthand3]]`"
)]
pub struct ShorthandError;

// ------------------------------- Compiler --------------------------------- //

/// Compile a shorthand into the schema it describes.
///
/// | shorthand | schema |
/// |-|-|
/// | `Any` | accept anything |
/// | `Undefined`, `Null` | exactly that nullish value |
/// | `AnyString`, `AnyNumber`, `AnyBool` | scalar of that kind |
/// | `AnyArray`, `AnyObject` | any array / any plain object |
/// | literal scalars, e.g. `7` or `"foo"` | exactly that value |
/// | regexes | strings matching the pattern |
/// | `[]` or `[X]` | array of `compile(X)` (empty form leaves elements free) |
/// | `[n, [X1, .., Xn]]` | fixed-length tuple, per-position compiled |
/// | field maps | object with those keys; unlisted keys unconstrained |
/// | schemas | unchanged |
///
/// Any other array shape is the error; there is no other failure mode.
pub fn compile(input: impl Into<Shorthand>) -> Result<Schema, ShorthandError> {
    compile_shorthand(input.into())
}

fn compile_shorthand(shorthand: Shorthand) -> Result<Schema, ShorthandError> {
    match shorthand {
        Shorthand::Any => Ok(Schema::Any),
        Shorthand::Undefined => Ok(Schema::Undefined),
        Shorthand::Null => Ok(Schema::Null),
        Shorthand::AnyString => Ok(Schema::String),
        Shorthand::AnyNumber => Ok(Schema::Number),
        Shorthand::AnyBool => Ok(Schema::Bool),
        Shorthand::AnyArray => Ok(Schema::AnyArray),
        Shorthand::AnyObject => Ok(Schema::AnyObject),
        Shorthand::Lit(lit) => Ok(Schema::Literal(lit)),
        Shorthand::Pattern(rx) => Ok(Schema::Pattern(rx)),
        Shorthand::Items(items) => compile_items(items),
        Shorthand::Fields(fields) => {
            let mut out = IndexMap::with_capacity(fields.len());
            for (key, field) in fields {
                out.insert(key, compile_shorthand(field)?);
            }
            Ok(Schema::Object(out))
        }
        Shorthand::Schema(schema) => Ok(schema),
    }
}

fn compile_items(items: Vec<Shorthand>) -> Result<Schema, ShorthandError> {
    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        // `[]` leaves elements unconstrained, same as the array class marker
        (None, _, _) => Ok(Schema::AnyArray),
        (Some(element), None, _) => Ok(Schema::Array(Box::new(compile_shorthand(element)?))),
        // `[n, [..]]`: the tag must be a positive integer; arity follows the
        // element list, the tag value itself is not cross-checked
        (Some(Shorthand::Lit(Literal::Num(tag))), Some(Shorthand::Items(slots)), None)
            if is_arity_tag(tag) =>
        {
            let compiled = slots
                .into_iter()
                .map(compile_shorthand)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Schema::Tuple(compiled))
        }
        _ => Err(ShorthandError),
    }
}

fn is_arity_tag(tag: OrderedFloat<f64>) -> bool {
    tag.0.fract() == 0.0 && tag.0 >= 1.0
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nullish_shorthands() {
        assert!(matches!(compile(Shorthand::Any).unwrap(), Schema::Any));
        assert!(matches!(
            compile(Shorthand::Undefined).unwrap(),
            Schema::Undefined
        ));
        let null = compile(Shorthand::Null).unwrap();
        assert!(null.validate(&json!(null)).is_ok());
        assert!(null.validate(&json!(false)).is_err());
    }

    #[test]
    fn class_markers_accept_their_kind_only() {
        let string = compile(Shorthand::AnyString).unwrap();
        assert!(string.validate(&json!("x")).is_ok());
        assert!(string.validate(&json!(42)).is_err());

        let array = compile(Shorthand::AnyArray).unwrap();
        assert!(array.validate(&json!([1, "mixed", null])).is_ok());
        assert!(array.validate(&json!({})).is_err());

        let object = compile(Shorthand::AnyObject).unwrap();
        assert!(object.validate(&json!({"anything": 1})).is_ok());
        assert!(object.validate(&json!([])).is_err());
    }

    #[test]
    fn literal_shorthands() {
        let hi = compile("hi").unwrap();
        assert!(hi.validate(&json!("hi")).is_ok());
        assert!(hi.validate(&json!("ho")).is_err());

        let one = compile(1).unwrap();
        assert!(one.validate(&json!(1)).is_ok());
        assert!(one.validate(&json!(1.0)).is_ok());
        assert!(one.validate(&json!(2)).is_err());
    }

    #[test]
    fn regex_shorthand_constrains_strings() {
        let schema = compile(Regex::new("^h").unwrap()).unwrap();
        assert!(schema.validate(&json!("hello")).is_ok());
        assert!(schema.validate(&json!("bye")).is_err());
        assert!(schema.validate(&json!(42)).is_err());
    }

    #[test]
    fn empty_sequence_behaves_like_the_array_marker() {
        let schema = compile(Shorthand::Items(vec![])).unwrap();
        assert!(matches!(schema, Schema::AnyArray));
    }

    #[test]
    fn one_element_sequences_compile_to_element_arrays() {
        let schema = compile(vec![Shorthand::AnyString]).unwrap();
        assert!(schema.validate(&json!(["a", "b"])).is_ok());
        assert!(schema.validate(&json!(["a", 1])).is_err());

        let nested = compile(vec![Shorthand::Items(vec![Shorthand::AnyString])]).unwrap();
        assert!(nested.validate(&json!([["a"], []])).is_ok());
        assert!(nested.validate(&json!([["a"], [1]])).is_err());
    }

    #[test]
    fn tagged_tuples_compile_per_position() {
        let schema = compile(Shorthand::Items(vec![
            Shorthand::from(2),
            Shorthand::Items(vec![Shorthand::AnyString, Shorthand::AnyNumber]),
        ]))
        .unwrap();
        assert!(schema.validate(&json!(["a", 1])).is_ok());
        assert!(schema.validate(&json!(["a", 1, 2])).is_err());
        assert!(schema.validate(&json!([1, "a"])).is_err());
    }

    #[test]
    fn other_array_shapes_are_the_format_error() {
        let err = compile(vec![Shorthand::from(1), Shorthand::from(2)]).unwrap_err();
        assert!(err.to_string().contains("[shorthand]"));
        assert!(err.to_string().contains("tuples"));

        assert!(compile(vec![
            Shorthand::AnyString,
            Shorthand::AnyString,
            Shorthand::AnyString
        ])
        .is_err());
        // tag must be a positive integer
        assert!(compile(Shorthand::Items(vec![
            Shorthand::from(0),
            Shorthand::Items(vec![])
        ]))
        .is_err());
        // nested malformed shapes surface too
        assert!(compile(Shorthand::Fields(
            [("k".to_string(), Shorthand::Items(vec![
                Shorthand::from(1),
                Shorthand::from(2)
            ]))]
            .into_iter()
            .collect()
        ))
        .is_err());
    }

    #[test]
    fn field_maps_compile_recursively() {
        let schema = compile(Shorthand::Fields(
            [
                ("foo".to_string(), Shorthand::AnyString),
                (
                    "bar".to_string(),
                    Shorthand::Fields(
                        [("baz".to_string(), Shorthand::AnyNumber)]
                            .into_iter()
                            .collect(),
                    ),
                ),
            ]
            .into_iter()
            .collect(),
        ))
        .unwrap();
        assert!(schema
            .validate(&json!({"foo": "x", "bar": {"baz": 1}, "extra": true}))
            .is_ok());
        assert!(schema.validate(&json!({"foo": "x", "bar": {"baz": "1"}})).is_err());
    }

    #[test]
    fn message_object_accepts_extras_and_rejects_bad_types() {
        let schema = compile(Shorthand::Fields(
            [("message".to_string(), Shorthand::AnyString)]
                .into_iter()
                .collect(),
        ))
        .unwrap();
        assert!(schema.validate(&json!({"message": "hi", "extra": 1})).is_ok());
        assert!(schema.validate(&json!({"message": 5})).is_err());
    }

    #[test]
    fn prebuilt_schemas_pass_through_unchanged() {
        let refined = Schema::Number.refine(|v| v.as_f64().is_some_and(|n| n > 2.0));
        let schema = compile(refined).unwrap();
        assert!(schema.validate(&json!(3)).is_ok());
        assert!(schema.validate(&json!(1)).is_err());
    }
}
