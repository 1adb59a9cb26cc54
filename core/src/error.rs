//! Error types raised while tokenizing, parsing, or evaluating Carlae code.

use std::fmt;

/// The three categories of Carlae errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token or parenthesis structure
    Syntax,
    /// Reference to (or mutation of) a name that is not bound
    Name,
    /// Any other failure raised while evaluating
    Evaluation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "SyntaxError"),
            ErrorKind::Name => write!(f, "NameError"),
            ErrorKind::Evaluation => write!(f, "EvaluationError"),
        }
    }
}

/// A Carlae error with its category and a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct CarlaeError {
    /// The category of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl CarlaeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    /// Create a name error for an unbound symbol.
    pub fn unbound(name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Name, format!("name '{name}' is not defined"))
    }

    /// Create an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Evaluation, message)
    }

    /// Create an arity error for a callable named `what`.
    pub fn arity(what: impl fmt::Display, expected: impl fmt::Display, got: usize) -> Self {
        Self::evaluation(format!("{what}: expected {expected} arguments, got {got}"))
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    pub fn is_name(&self) -> bool {
        self.kind == ErrorKind::Name
    }

    pub fn is_evaluation(&self) -> bool {
        self.kind == ErrorKind::Evaluation
    }
}

impl fmt::Display for CarlaeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CarlaeError {}

pub type Result<T> = std::result::Result<T, CarlaeError>;
