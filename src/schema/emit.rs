//! JSON-Schema-ish rendering of schemas.
//!
//! Human-readable diagnostic view only: no-match reports and the CLI `schema`
//! subcommand print it. Tuples use `prefixItems` with exact `minItems`/
//! `maxItems`; refinements keep the base rendering with an `x-refined` marker
//! since predicates are opaque functions.

use serde_json::{json, Value};

use super::Schema;

pub fn to_json_schema(schema: &Schema) -> Value {
    match schema {
        Schema::Any => json!({ "type": "any" }),
        Schema::Undefined => json!({ "type": "undefined" }),
        Schema::Null => json!({ "type": "null" }),
        Schema::Bool => json!({ "type": "boolean" }),
        Schema::Number => json!({ "type": "number" }),
        Schema::String => json!({ "type": "string" }),
        Schema::Literal(lit) => json!({ "const": lit.to_value() }),
        Schema::Pattern(rx) => json!({ "type": "string", "pattern": rx.as_str() }),
        Schema::AnyArray => json!({ "type": "array" }),
        Schema::AnyObject => json!({ "type": "object" }),
        Schema::Array(item) => json!({ "type": "array", "items": to_json_schema(item) }),
        Schema::Tuple(slots) => json!({
            "type": "array",
            "prefixItems": slots.iter().map(to_json_schema).collect::<Vec<_>>(),
            "minItems": slots.len(),
            "maxItems": slots.len(),
        }),
        Schema::Object(fields) => {
            let mut props = serde_json::Map::new();
            let mut required: Vec<String> = Vec::new();
            for (key, field) in fields {
                props.insert(key.clone(), to_json_schema(field));
                if !field.accepts_missing() {
                    required.push(key.clone());
                }
            }
            let mut out = json!({ "type": "object", "properties": props });
            if !required.is_empty() {
                out["required"] = Value::Array(required.into_iter().map(Value::from).collect());
            }
            out
        }
        Schema::Refined(base, _) => {
            let mut out = to_json_schema(base);
            if let Value::Object(map) = &mut out {
                map.insert("x-refined".to_string(), Value::Bool(true));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Literal;

    #[test]
    fn object_view_lists_properties_and_required() {
        let schema = Schema::object([
            ("message", Schema::String),
            ("note", Schema::Undefined),
        ]);
        assert_eq!(
            to_json_schema(&schema),
            json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "note": { "type": "undefined" },
                },
                "required": ["message"],
            })
        );
    }

    #[test]
    fn tuple_view_pins_both_bounds() {
        let schema = Schema::Tuple(vec![Schema::String, Schema::Number]);
        assert_eq!(
            to_json_schema(&schema),
            json!({
                "type": "array",
                "prefixItems": [{ "type": "string" }, { "type": "number" }],
                "minItems": 2,
                "maxItems": 2,
            })
        );
    }

    #[test]
    fn literals_render_as_const() {
        assert_eq!(
            to_json_schema(&Schema::Literal(Literal::from(7.0))),
            json!({ "const": 7 })
        );
        assert_eq!(
            to_json_schema(&Schema::Literal(Literal::from("hi"))),
            json!({ "const": "hi" })
        );
    }

    #[test]
    fn refinement_marks_the_base_view() {
        let schema = Schema::Number.refine(|v| v.as_f64().is_some_and(|n| n > 2.0));
        assert_eq!(
            to_json_schema(&schema),
            json!({ "type": "number", "x-refined": true })
        );
    }
}
