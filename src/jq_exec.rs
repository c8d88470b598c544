use anyhow::{anyhow, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run a jq filter over one document. Outputs come back as JSON text
/// (`Val` renders as JSON).
pub fn run_filter(filter_src: &str, input: &Value) -> Result<Vec<String>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(describe_load_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(describe_compile_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let mut outputs = Vec::new();
    for item in filter.run((Ctx::new([], &inputs), Val::from(input.clone()))) {
        let val = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        outputs.push(format!("{val}"));
    }
    Ok(outputs)
}

/// Parse and compile a filter without running it. Lets callers surface bad
/// programs eagerly, before any document is dispatched.
pub fn check_filter(filter_src: &str) -> Result<()> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(describe_load_errors)?;

    Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(describe_compile_errors)?;
    Ok(())
}

/// jq truthiness of the filter's first output: `false`, `null`, or no output
/// at all reject; anything else accepts.
pub fn eval_predicate(filter_src: &str, input: &Value) -> Result<bool> {
    let outputs = run_filter(filter_src, input)?;
    Ok(outputs
        .first()
        .is_some_and(|out| out != "false" && out != "null"))
}

fn describe_load_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut out = String::new();
    for (file, err) in errs {
        out.push_str(&format!("jq parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(out)
}

fn describe_compile_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> anyhow::Error {
    let mut out = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            out.push_str(&format!("jq undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_produce_json_text_outputs() {
        let out = run_filter(".foo", &json!({"foo": 1})).unwrap();
        assert_eq!(out, vec!["1"]);
        let out = run_filter(".[]", &json!([1, 2])).unwrap();
        assert_eq!(out, vec!["1", "2"]);
    }

    #[test]
    fn predicate_truthiness_follows_jq_rules() {
        assert!(eval_predicate("startswith(\"h\")", &json!("hello")).unwrap());
        assert!(!eval_predicate("startswith(\"h\")", &json!("bye")).unwrap());
        assert!(eval_predicate(". > 2", &json!(5)).unwrap());
        assert!(!eval_predicate(". > 2", &json!(1)).unwrap());
        // empty output rejects
        assert!(!eval_predicate("empty", &json!(1)).unwrap());
        // runtime errors surface as errors, not as acceptance
        assert!(eval_predicate("startswith(\"h\")", &json!(42)).is_err());
    }

    #[test]
    fn bad_programs_fail_the_check() {
        assert!(check_filter(".foo | select(. > 2)").is_ok());
        assert!(check_filter("definitely_not_a_builtin").is_err());
    }
}
