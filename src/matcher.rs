//! First-match-wins dispatch over ordered (schema, handler) case lists.
//!
//! Two fluent builders share one evaluation kernel:
//! - [`match_value`] pre-loads the value being matched; terminal [`Match::get`]
//!   evaluates immediately.
//! - [`matcher`] holds no value; [`Matcher::get`] takes one, and
//!   [`Matcher::get_fn`] detaches a reusable dispatch function closing over a
//!   snapshot of the case list.
//!
//! Builder steps never mutate an earlier builder: each `case`/`default` call
//! returns a new handle over an extended copy of the case list, so builders
//! can be forked and a detached `get_fn` is unaffected by later growth.
//! Evaluation tries cases strictly in declaration order and stops at the
//! first schema that accepts the value; a rejected case is normal control
//! flow, not an error. Only a full miss is an error ([`NoMatch`]).

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::{emit, Schema};
use crate::shorthand::{compile, Shorthand};

type Handler<Out> = Arc<dyn Fn(Value) -> Out + Send + Sync>;

// -------------------------------- Cases ----------------------------------- //

/// One (schema, handler) pair, tried in declaration order.
pub struct Case<Out> {
    schema: Schema,
    handler: Handler<Out>,
}

impl<Out> Clone for Case<Out> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Every case rejected the value. Carries the value and the schemas tried,
/// in declaration order; an empty case list yields an empty `attempted`.
#[derive(Debug, Clone)]
pub struct NoMatch {
    pub value: Value,
    pub attempted: Vec<Schema>,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = serde_json::json!({
            "no_match_for": self.value,
            "tried": self.attempted.iter().map(emit::to_json_schema).collect::<Vec<_>>(),
        });
        write!(f, "no case matched: {report}")
    }
}

impl std::error::Error for NoMatch {}

fn dispatch<Out>(value: &Value, cases: &[Case<Out>]) -> Result<Out, NoMatch> {
    for case in cases {
        if let Ok(narrowed) = case.schema.validate(value) {
            return Ok((case.handler)(narrowed));
        }
    }
    Err(NoMatch {
        value: value.clone(),
        attempted: cases.iter().map(|c| c.schema.clone()).collect(),
    })
}

fn appended<Out>(cases: &[Case<Out>], schema: Schema, handler: Handler<Out>) -> Vec<Case<Out>> {
    let mut out = cases.to_vec();
    out.push(Case { schema, handler });
    out
}

fn compile_case(shorthand: impl Into<Shorthand>) -> Schema {
    match compile(shorthand) {
        Ok(schema) => schema,
        // malformed case declarations are caller bugs, surfaced at build time
        Err(err) => panic!("{err}"),
    }
}

// ----------------------------- Bound matcher ------------------------------ //

/// Case-list builder pre-loaded with the value being matched.
pub struct Match<Out> {
    value: Value,
    cases: Vec<Case<Out>>,
}

impl<Out> Clone for Match<Out> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            cases: self.cases.clone(),
        }
    }
}

/// Start matching a concrete value against cases declared afterwards.
pub fn match_value<Out: 'static>(value: Value) -> Match<Out> {
    Match {
        value,
        cases: Vec::new(),
    }
}

impl<Out: 'static> Match<Out> {
    /// Append a case. The handler receives the schema-narrowed value.
    ///
    /// # Panics
    /// On a malformed array shorthand (see [`crate::shorthand::ShorthandError`]).
    pub fn case(
        &self,
        shorthand: impl Into<Shorthand>,
        handler: impl Fn(Value) -> Out + Send + Sync + 'static,
    ) -> Self {
        Self {
            value: self.value.clone(),
            cases: appended(&self.cases, compile_case(shorthand), Arc::new(handler)),
        }
    }

    /// Append a case whose schema is further refined by `predicate`.
    ///
    /// # Panics
    /// On a malformed array shorthand (see [`crate::shorthand::ShorthandError`]).
    pub fn case_when(
        &self,
        shorthand: impl Into<Shorthand>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        handler: impl Fn(Value) -> Out + Send + Sync + 'static,
    ) -> Self {
        Self {
            value: self.value.clone(),
            cases: appended(
                &self.cases,
                compile_case(shorthand).refine(predicate),
                Arc::new(handler),
            ),
        }
    }

    /// Append a catch-all case. Cases declared after it stay legal but can
    /// never win.
    pub fn default(&self, handler: impl Fn(Value) -> Out + Send + Sync + 'static) -> Self {
        Self {
            value: self.value.clone(),
            cases: appended(&self.cases, Schema::Any, Arc::new(handler)),
        }
    }

    /// Evaluate now against the stored value.
    pub fn get(&self) -> Result<Out, NoMatch> {
        dispatch(&self.value, &self.cases)
    }
}

// ---------------------------- Deferred matcher ---------------------------- //

/// Case-list builder with no value yet; values are supplied at dispatch time.
pub struct Matcher<Out> {
    cases: Vec<Case<Out>>,
}

impl<Out> Clone for Matcher<Out> {
    fn clone(&self) -> Self {
        Self {
            cases: self.cases.clone(),
        }
    }
}

/// Start a reusable matcher; declare cases, then dispatch with [`Matcher::get`]
/// or a detached [`Matcher::get_fn`].
pub fn matcher<Out: 'static>() -> Matcher<Out> {
    Matcher { cases: Vec::new() }
}

impl<Out: 'static> Matcher<Out> {
    /// Append a case. The handler receives the schema-narrowed value.
    ///
    /// # Panics
    /// On a malformed array shorthand (see [`crate::shorthand::ShorthandError`]).
    pub fn case(
        &self,
        shorthand: impl Into<Shorthand>,
        handler: impl Fn(Value) -> Out + Send + Sync + 'static,
    ) -> Self {
        Self {
            cases: appended(&self.cases, compile_case(shorthand), Arc::new(handler)),
        }
    }

    /// Append a case whose schema is further refined by `predicate`.
    ///
    /// # Panics
    /// On a malformed array shorthand (see [`crate::shorthand::ShorthandError`]).
    pub fn case_when(
        &self,
        shorthand: impl Into<Shorthand>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        handler: impl Fn(Value) -> Out + Send + Sync + 'static,
    ) -> Self {
        Self {
            cases: appended(
                &self.cases,
                compile_case(shorthand).refine(predicate),
                Arc::new(handler),
            ),
        }
    }

    /// Append a catch-all case. Cases declared after it stay legal but can
    /// never win.
    pub fn default(&self, handler: impl Fn(Value) -> Out + Send + Sync + 'static) -> Self {
        Self {
            cases: appended(&self.cases, Schema::Any, Arc::new(handler)),
        }
    }

    /// Dispatch one value through the cases declared so far.
    pub fn get(&self, value: &Value) -> Result<Out, NoMatch> {
        dispatch(value, &self.cases)
    }

    /// Detach a stateless dispatch function over a snapshot of the case
    /// list. The function is freely shareable and unaffected by further
    /// builder calls.
    pub fn get_fn(&self) -> impl Fn(&Value) -> Result<Out, NoMatch> + Send + Sync + Clone + use<Out> {
        let cases: Arc<[Case<Out>]> = Arc::from(self.cases.clone());
        move |value: &Value| dispatch(value, &cases)
    }
}

// -------------------------------- Tests ----------------------------------- //
