//! Declarative case lists loaded from JSON rule files.
//!
//! A rule file is an ordered JSON array; each rule tags a shorthand case,
//! optionally refined by a jq predicate, and rules are tried first-match-wins:
//!
//! ```json
//! [
//!   {"tag": "greeting", "case": "$string", "where": "startswith(\"h\")"},
//!   {"tag": "pair",     "case": [2, ["$string", "$number"]]},
//!   {"tag": "rest",     "default": true}
//! ]
//! ```
//!
//! Shorthands stay loose in the data (scalars are literals, `$`-markers are
//! class markers, arrays and objects recurse) and are normalized into
//! [`Shorthand`] immediately on load; everything downstream works on the
//! closed type.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::jq_exec;
use crate::matcher::{matcher, Matcher};
use crate::schema::Literal;
use crate::shorthand::{compile, Shorthand, ShorthandError};

// ------------------------------- Rule model ------------------------------- //

/// One rule: a tag plus either a shorthand `case` (optionally refined by a
/// jq `where` filter) or `"default": true` for a catch-all.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub tag: String,
    #[serde(default)]
    pub case: Option<Value>,
    /// jq filter evaluated against the candidate value: a truthy first
    /// output accepts, runtime filter errors reject.
    #[serde(default, rename = "where")]
    pub refine: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to parse rule file: {0}")]
    Parse(String),
    #[error("unknown shorthand marker `{0}`")]
    UnknownMarker(String),
    #[error("invalid `$regex` shorthand: {0}")]
    Regex(#[from] regex::Error),
    #[error("`$regex` expects a string pattern")]
    RegexKind,
    #[error("`$literal` expects a string, number or boolean")]
    LiteralKind,
    #[error(transparent)]
    Shorthand(#[from] ShorthandError),
    #[error("rule `{tag}`: invalid jq predicate: {message}")]
    Predicate { tag: String, message: String },
    #[error("rule `{0}` needs either a `case` or `\"default\": true`")]
    MissingCase(String),
    #[error("rule `{0}` cannot be both a `case` and a `default`")]
    CaseAndDefault(String),
}

/// Parse a rule file (a JSON array of rules).
pub fn load_rules(source: &str) -> Result<Vec<Rule>, RuleError> {
    crate::path_de::from_str_with_path(source).map_err(RuleError::Parse)
}

// --------------------------- JSON → Shorthand ----------------------------- //

/// Read a shorthand from its loose JSON form.
///
/// Scalars are literals; strings beginning with `$` are class markers
/// (`$any`, `$undefined`, `$null`, `$string`, `$number`, `$boolean`,
/// `$array`, `$object`); `{"$regex": "..."}` is a pattern and
/// `{"$literal": v}` escapes scalars that begin with `$`; arrays and other
/// objects recurse.
pub fn shorthand_from_json(value: &Value) -> Result<Shorthand, RuleError> {
    match value {
        Value::Null => Ok(Shorthand::Null),
        Value::Bool(b) => Ok(Shorthand::Lit(Literal::Bool(*b))),
        Value::Number(n) => Ok(Shorthand::Lit(Literal::Num(OrderedFloat(
            n.as_f64().unwrap_or(f64::NAN),
        )))),
        Value::String(s) => marker_or_literal(s),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(shorthand_from_json)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Shorthand::Items(items))
        }
        Value::Object(map) => {
            if let Some((key, inner)) = single_entry(map) {
                match key {
                    "$regex" => {
                        let Value::String(pattern) = inner else {
                            return Err(RuleError::RegexKind);
                        };
                        return Ok(Shorthand::Pattern(Regex::new(pattern)?));
                    }
                    "$literal" => {
                        return match inner {
                            Value::String(s) => Ok(Shorthand::Lit(Literal::Str(s.clone()))),
                            Value::Number(n) => Ok(Shorthand::Lit(Literal::Num(OrderedFloat(
                                n.as_f64().unwrap_or(f64::NAN),
                            )))),
                            Value::Bool(b) => Ok(Shorthand::Lit(Literal::Bool(*b))),
                            _ => Err(RuleError::LiteralKind),
                        };
                    }
                    _ => {}
                }
            }
            let mut fields = IndexMap::with_capacity(map.len());
            for (key, field) in map {
                fields.insert(key.clone(), shorthand_from_json(field)?);
            }
            Ok(Shorthand::Fields(fields))
        }
    }
}

fn single_entry(map: &serde_json::Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 1 {
        return None;
    }
    map.iter().next().map(|(k, v)| (k.as_str(), v))
}

fn marker_or_literal(s: &str) -> Result<Shorthand, RuleError> {
    match s {
        "$any" => Ok(Shorthand::Any),
        "$undefined" => Ok(Shorthand::Undefined),
        "$null" => Ok(Shorthand::Null),
        "$string" => Ok(Shorthand::AnyString),
        "$number" => Ok(Shorthand::AnyNumber),
        "$boolean" => Ok(Shorthand::AnyBool),
        "$array" => Ok(Shorthand::AnyArray),
        "$object" => Ok(Shorthand::AnyObject),
        other if other.starts_with('$') => Err(RuleError::UnknownMarker(other.to_string())),
        other => Ok(Shorthand::Lit(Literal::Str(other.to_string()))),
    }
}

// ------------------------------- Building --------------------------------- //

/// Compile rules, in order, into a matcher that answers with the winning
/// rule's tag. Shorthands are pre-compiled here so malformed rule data
/// surfaces as an error, never as a panic. jq predicates are compile-checked
/// eagerly; at dispatch time a filter's runtime error rejects the case.
pub fn build_matcher(rules: &[Rule]) -> Result<Matcher<String>, RuleError> {
    let mut built = matcher::<String>();
    for rule in rules {
        if rule.default {
            if rule.case.is_some() {
                return Err(RuleError::CaseAndDefault(rule.tag.clone()));
            }
            let tag = rule.tag.clone();
            built = built.default(move |_| tag.clone());
            continue;
        }

        let Some(case) = &rule.case else {
            return Err(RuleError::MissingCase(rule.tag.clone()));
        };
        let mut schema = compile(shorthand_from_json(case)?)?;

        if let Some(filter) = &rule.refine {
            jq_exec::check_filter(filter).map_err(|err| RuleError::Predicate {
                tag: rule.tag.clone(),
                message: err.to_string(),
            })?;
            let filter = filter.clone();
            schema = schema.refine(move |v| jq_exec::eval_predicate(&filter, v).unwrap_or(false));
        }

        let tag = rule.tag.clone();
        built = built.case(schema, move |_| tag.clone());
    }
    Ok(built)
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn markers_scalars_and_structures_normalize() {
        assert!(matches!(
            shorthand_from_json(&json!("$string")).unwrap(),
            Shorthand::AnyString
        ));
        assert!(matches!(
            shorthand_from_json(&json!(null)).unwrap(),
            Shorthand::Null
        ));
        assert!(matches!(
            shorthand_from_json(&json!("plain text")).unwrap(),
            Shorthand::Lit(Literal::Str(_))
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"$literal": "$string"})).unwrap(),
            Shorthand::Lit(Literal::Str(_))
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"$regex": "^h"})).unwrap(),
            Shorthand::Pattern(_)
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"message": "$string"})).unwrap(),
            Shorthand::Fields(_)
        ));
        assert!(matches!(
            shorthand_from_json(&json!(["$string"])).unwrap(),
            Shorthand::Items(_)
        ));
    }

    #[test]
    fn unknown_markers_and_bad_escapes_error() {
        assert!(matches!(
            shorthand_from_json(&json!("$strnig")),
            Err(RuleError::UnknownMarker(_))
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"$regex": 5})),
            Err(RuleError::RegexKind)
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"$literal": []})),
            Err(RuleError::LiteralKind)
        ));
        assert!(matches!(
            shorthand_from_json(&json!({"$regex": "("})),
            Err(RuleError::Regex(_))
        ));
    }

    #[test]
    fn rule_files_build_working_matchers() {
        let rules = load_rules(
            r#"[
                {"tag": "greeting", "case": "$string", "where": "startswith(\"h\")"},
                {"tag": "pair", "case": [2, ["$string", "$number"]]},
                {"tag": "message", "case": {"message": "$string"}},
                {"tag": "rest", "default": true}
            ]"#,
        )
        .unwrap();
        let tags = build_matcher(&rules).unwrap();

        assert_eq!(tags.get(&json!("hello")).unwrap(), "greeting");
        assert_eq!(tags.get(&json!("bonjour")).unwrap(), "rest");
        assert_eq!(tags.get(&json!(["a", 1])).unwrap(), "pair");
        assert_eq!(tags.get(&json!(["a", 1, 2])).unwrap(), "rest");
        assert_eq!(tags.get(&json!({"message": "hi"})).unwrap(), "message");
        assert_eq!(tags.get(&json!(37)).unwrap(), "rest");
    }

    #[test]
    fn rules_without_a_default_surface_no_match() {
        let rules = load_rules(r#"[{"tag": "n", "case": "$number"}]"#).unwrap();
        let tags = build_matcher(&rules).unwrap();
        assert_eq!(tags.get(&json!(1)).unwrap(), "n");
        let err = tags.get(&json!("one")).unwrap_err();
        assert_eq!(err.attempted.len(), 1);
    }

    #[test]
    fn malformed_rules_fail_the_build_not_the_dispatch() {
        // arrays of length two are neither sequences nor tuple tags
        let rules = load_rules(r#"[{"tag": "bad", "case": [1, 2]}]"#).unwrap();
        assert!(matches!(
            build_matcher(&rules),
            Err(RuleError::Shorthand(_))
        ));

        let rules = load_rules(r#"[{"tag": "bad", "case": "$number", "where": "no_such_fn"}]"#)
            .unwrap();
        assert!(matches!(
            build_matcher(&rules),
            Err(RuleError::Predicate { .. })
        ));

        let rules = load_rules(r#"[{"tag": "bad"}]"#).unwrap();
        assert!(matches!(build_matcher(&rules), Err(RuleError::MissingCase(_))));

        let rules =
            load_rules(r#"[{"tag": "bad", "case": "$number", "default": true}]"#).unwrap();
        assert!(matches!(
            build_matcher(&rules),
            Err(RuleError::CaseAndDefault(_))
        ));
    }

    #[test]
    fn rule_parse_errors_carry_a_path() {
        let err = load_rules(r#"[{"tag": 7, "case": "$string"}]"#).unwrap_err();
        assert!(matches!(&err, RuleError::Parse(msg) if msg.contains("[0]")));
    }

    #[test]
    fn predicate_runtime_errors_reject_instead_of_matching() {
        // startswith errors on non-strings at runtime; with `$any` letting
        // everything through to the predicate, the error must reject, not match
        let rules = load_rules(
            r#"[
                {"tag": "h", "case": "$any", "where": "startswith(\"h\")"},
                {"tag": "rest", "default": true}
            ]"#,
        )
        .unwrap();
        let tags = build_matcher(&rules).unwrap();
        assert_eq!(tags.get(&json!("hello")).unwrap(), "h");
        assert_eq!(tags.get(&json!(42)).unwrap(), "rest");
    }
}
