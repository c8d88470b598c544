//! Runtime pattern matching for JSON values.
//!
//! A value of unknown shape is tested, in declaration order, against a list
//! of cases; the first case whose schema accepts the value has its handler
//! invoked with the validated (narrowed) value, and remaining cases are never
//! tried. Cases are declared either as full [`Schema`]s or as compact
//! [`Shorthand`]s compiled by [`compile`]; a case can carry an extra
//! refinement predicate. If nothing matches, dispatch fails with a [`NoMatch`]
//! carrying the value and every schema it was tried against.
//!
//! ```
//! use json_match::{matcher, Shorthand};
//! use serde_json::json;
//!
//! let classify = matcher()
//!     .case("hi", |_| "exact greeting".to_string())
//!     .case(Shorthand::AnyString, |v| format!("some string: {v}"))
//!     .case(Shorthand::AnyNumber, |v| format!("number: {v}"))
//!     .get_fn();
//!
//! assert_eq!(classify(&json!(37)).unwrap(), "number: 37");
//! assert_eq!(classify(&json!("hi")).unwrap(), "exact greeting");
//! assert!(classify(&json!([])).is_err());
//! ```

pub mod cli;
pub mod jq_exec;
pub mod matcher;
pub mod path_de;
pub mod rules;
pub mod schema;
pub mod shorthand;

pub use matcher::{match_value, matcher, Case, Match, Matcher, NoMatch};
pub use schema::{Invalid, Literal, Predicate, Schema};
pub use shorthand::{compile, Shorthand, ShorthandError};
