//! Recursive-descent parser from tokens to expression trees.

use std::fmt;
use std::rc::Rc;

use crate::error::{CarlaeError, Result};
use crate::interner::Name;
use crate::lexer::{Token, tokenize};
use crate::numeric::Number;

// ============================================================================
// Expression
// ============================================================================

/// A parsed Carlae expression. Trees are immutable once built; compound
/// nodes share their children so closures can hold bodies cheaply.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(Number),
    Symbol(Name),
    Compound(Rc<[Expression]>),
}

impl Expression {
    pub fn symbol(text: &str) -> Self {
        Expression::Symbol(Name::new(text))
    }

    pub fn compound(items: Vec<Expression>) -> Self {
        Expression::Compound(items.into())
    }

    pub fn as_symbol(&self) -> Option<Name> {
        match self {
            Expression::Symbol(name) => Some(*name),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&[Expression]> {
        match self {
            Expression::Compound(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{n}"),
            Expression::Symbol(name) => write!(f, "{name}"),
            Expression::Compound(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Where and why parsing stopped. Collapsed into a `SyntaxError` at the
/// public boundary.
#[derive(Debug)]
struct ParseFailure {
    index: usize,
    reason: &'static str,
}

impl From<ParseFailure> for CarlaeError {
    fn from(failure: ParseFailure) -> Self {
        CarlaeError::syntax(format!("{} at token {}", failure.reason, failure.index))
    }
}

/// Deepest parenthesis nesting accepted. Building, printing and dropping a
/// tree all recurse once per level.
pub const MAX_NESTING: usize = 1_000;

fn atom(text: &str) -> Expression {
    match Number::from_literal(text) {
        Some(n) => Expression::Number(n),
        None => Expression::Symbol(Name::new(text)),
    }
}

fn check_balance(tokens: &[Token]) -> Result<()> {
    let open = tokens.iter().filter(|t| **t == Token::LParen).count();
    let close = tokens.iter().filter(|t| **t == Token::RParen).count();
    if open != close {
        return Err(CarlaeError::syntax(format!(
            "mismatched parentheses: {open} '(' and {close} ')'"
        )));
    }
    Ok(())
}

/// Parse one expression starting at `index`, returning it with the index
/// just past it. `depth` counts the open parentheses around `index`.
fn parse_expression(
    tokens: &[Token],
    index: usize,
    depth: usize,
) -> std::result::Result<(Expression, usize), ParseFailure> {
    match tokens.get(index) {
        None => Err(ParseFailure {
            index,
            reason: "unexpected end of input",
        }),
        Some(Token::Atom(text)) => Ok((atom(text), index + 1)),
        Some(Token::RParen) => Err(ParseFailure {
            index,
            reason: "unexpected ')'",
        }),
        Some(Token::LParen) if depth >= MAX_NESTING => Err(ParseFailure {
            index,
            reason: "nesting too deep",
        }),
        Some(Token::LParen) => {
            let mut items = Vec::new();
            let mut next = index + 1;
            loop {
                match tokens.get(next) {
                    Some(Token::RParen) => {
                        return Ok((Expression::compound(items), next + 1));
                    }
                    Some(_) => {
                        let (item, after) = parse_expression(tokens, next, depth + 1)?;
                        items.push(item);
                        next = after;
                    }
                    None => {
                        return Err(ParseFailure {
                            index: next,
                            reason: "missing ')'",
                        });
                    }
                }
            }
        }
    }
}

/// Parse a token sequence into exactly one expression.
///
/// A sequence with no parentheses and more than one token becomes a flat
/// compound, so `:= x 3` parses the same as `(:= x 3)`.
pub fn parse(tokens: &[Token]) -> Result<Expression> {
    check_balance(tokens)?;

    let has_parens = tokens.iter().any(|t| *t == Token::LParen);
    if !has_parens && tokens.len() > 1 {
        let items = tokens.iter().map(|t| atom(t.as_str())).collect();
        return Ok(Expression::compound(items));
    }

    let (expr, next) = parse_expression(tokens, 0, 0)?;
    if next != tokens.len() {
        return Err(ParseFailure {
            index: next,
            reason: "unexpected tokens after expression",
        }
        .into());
    }
    Ok(expr)
}

/// Parse every top-level expression in a token sequence, in order.
pub fn parse_all(tokens: &[Token]) -> Result<Vec<Expression>> {
    check_balance(tokens)?;

    let mut exprs = Vec::new();
    let mut next = 0;
    while next < tokens.len() {
        let (expr, after) = parse_expression(tokens, next, 0)?;
        exprs.push(expr);
        next = after;
    }
    Ok(exprs)
}

/// Tokenize and parse one expression.
pub fn parse_source(source: &str) -> Result<Expression> {
    parse(&tokenize(source))
}
