//! Minimal CLI: compile shorthands → schema views, classify documents → tags
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use crate::matcher::NoMatch;
use crate::schema::emit;
use crate::{rules, shorthand};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// match JSON documents against declared cases, or compile case shorthands to schemas
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile one shorthand (JSON form) and print the schema view
    Schema(SchemaOut),
    /// dispatch input documents through a rule file, first match wins
    Classify(ClassifyOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq pre-process filter for each document
    #[arg(long)]
    jq_expr: Option<String>,

    /// one or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    /// shorthand source file (JSON form)
    #[arg(long, conflicts_with = "expr")]
    shorthand: Option<PathBuf>,

    /// inline shorthand JSON, e.g. '[2, ["$string", "$number"]]'
    #[arg(long)]
    expr: Option<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ClassifyOut {
    /// rule file: a JSON array of {tag, case, where?, default?}
    #[arg(short, long)]
    rules: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output file, one tag per line (colored stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(Value)) -> Result<()> {
        for raw in &self.input {
            if raw == "-" {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read stdin")?;
                self.process_source("<stdin>", &text, &mut apply)?;
                continue;
            }
            for source_path in resolve_file_path_patterns(std::slice::from_ref(raw))? {
                let text = std::fs::read_to_string(&source_path).with_context(|| {
                    format!("failed to read input file {}", source_path.display())
                })?;
                self.process_source(&source_path.to_string_lossy(), &text, &mut apply)?;
            }
        }
        Ok(())
    }

    fn process_source(
        &self,
        origin: &str,
        text: &str,
        apply: &mut impl FnMut(Value),
    ) -> Result<()> {
        if self.ndjson {
            for (lineno, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let doc = serde_json::from_str::<Value>(line)
                    .with_context(|| format!("invalid JSON at {origin}:{}", lineno + 1))?;
                self.process_doc(origin, doc, apply)?;
            }
        } else {
            let doc = serde_json::from_str::<Value>(text)
                .with_context(|| format!("invalid JSON in {origin}"))?;
            self.process_doc(origin, doc, apply)?;
        }
        Ok(())
    }

    fn process_doc(&self, origin: &str, doc: Value, apply: &mut impl FnMut(Value)) -> Result<()> {
        let doc = match self.json_pointer.as_deref() {
            None => doc,
            Some(pointer) => doc
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer `{pointer}` selects nothing in {origin}"))?,
        };
        match self.jq_expr.as_deref() {
            None => apply(doc),
            Some(expr) => {
                for output in crate::jq_exec::run_filter(expr, &doc)
                    .with_context(|| format!("failed to apply jq expression to {origin}"))?
                {
                    let value = serde_json::from_str::<Value>(&output)
                        .with_context(|| format!("jq output from {origin} is not JSON"))?;
                    apply(value);
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let source = match (&target.shorthand, &target.expr) {
                    (Some(path), None) => std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                    (None, Some(expr)) => expr.clone(),
                    _ => return Err(anyhow!("pass exactly one of --shorthand or --expr")),
                };
                let parsed = serde_json::from_str::<Value>(&source)
                    .context("shorthand is not valid JSON")?;
                let schema = shorthand::compile(rules::shorthand_from_json(&parsed)?)?;
                let rendered = serde_json::to_string_pretty(&emit::to_json_schema(&schema))?;
                write_output(target.out.as_deref(), &rendered)
            }
            Command::Classify(target) => {
                let rules_src = std::fs::read_to_string(&target.rules)
                    .with_context(|| format!("failed to read {}", target.rules.display()))?;
                let rule_matcher = rules::build_matcher(&rules::load_rules(&rules_src)?)?;

                let mut docs = Vec::new();
                target.input_settings.load_process(|doc| docs.push(doc))?;

                // case lists are immutable once captured, so dispatch is
                // safe to fan out; results keep input order
                let dispatch = rule_matcher.get_fn();
                let results: Vec<Result<String, NoMatch>> =
                    docs.par_iter().map(|doc| dispatch(doc)).collect();

                let mut unmatched = 0usize;
                let mut lines = Vec::with_capacity(results.len());
                for result in &results {
                    match result {
                        Ok(tag) => lines.push(tag.clone()),
                        Err(no_match) => {
                            unmatched += 1;
                            eprintln!("{no_match}");
                            lines.push("<no-match>".to_string());
                        }
                    }
                }

                match target.out.as_deref() {
                    Some(out) => write_output(Some(out), &lines.join("\n"))?,
                    None => {
                        for line in &lines {
                            if line == "<no-match>" {
                                println!("{}", line.red());
                            } else {
                                println!("{}", line.green());
                            }
                        }
                    }
                }

                if unmatched > 0 {
                    return Err(anyhow!(
                        "{unmatched} of {} documents matched no rule",
                        results.len()
                    ));
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            // Treat as a literal path
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
