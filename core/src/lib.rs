//! Core of the Carlae language
//!
//! This crate contains the tokenizer, parser, environment model, builtin
//! table and tree-walking evaluator. Reading files and running a prompt
//! loop are left to callers, which only need [`new_global_environment`]
//! and [`evaluate_source`].

pub mod builtins;
pub mod environment;
pub mod error;
pub mod interner;
pub mod interpreter;
pub mod language;
pub mod lexer;
pub mod numeric;
pub mod parser;

use tracing::debug;

// Re-export commonly used items for convenience
pub use environment::{Environment, EvalLimits};
pub use error::{CarlaeError, ErrorKind, Result};
pub use interner::Name;
pub use interpreter::{apply, evaluate};
pub use language::{Function, Pair, Value, pair};
pub use lexer::{Token, tokenize};
pub use numeric::Number;
pub use parser::{Expression, parse, parse_all, parse_source};

/// Create a fresh session environment: an empty frame whose parent is a new
/// root holding the builtin table.
pub fn new_global_environment() -> Environment {
    new_global_environment_with(EvalLimits::default())
}

pub fn new_global_environment_with(limits: EvalLimits) -> Environment {
    let root = Environment::root(limits);
    builtins::register_builtins(&root);
    root.extend()
}

/// Tokenize, parse and evaluate one complete expression.
pub fn evaluate_source(text: &str, env: &Environment) -> Result<Value> {
    let tokens = tokenize(text);
    debug!(tokens = tokens.len(), "evaluating source");
    let result = parse(&tokens).and_then(|expr| evaluate(&expr, env));
    if let Err(err) = &result {
        debug!(kind = %err.kind, message = %err.message, "evaluation failed");
    }
    result
}

/// Evaluate every top-level expression of `text` in order, returning the
/// last value (`nil` when there is none).
pub fn evaluate_program(text: &str, env: &Environment) -> Result<Value> {
    let tokens = tokenize(text);
    let exprs = parse_all(&tokens)?;
    debug!(expressions = exprs.len(), "evaluating program");
    let mut last = Value::Nil;
    for expr in &exprs {
        last = evaluate(expr, env)?;
    }
    Ok(last)
}
