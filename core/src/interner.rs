//! Interned identifier names.
//!
//! Every symbol read by the parser and every key stored in an environment
//! frame is a `Name`: a `Copy` handle into a process-wide string interner.
//! Comparing and hashing names is therefore an integer operation.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::RwLock;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static NAMES: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(DefaultSymbol);

impl Name {
    /// Intern `s`, returning the same handle for equal strings.
    pub fn new(s: &str) -> Self {
        if let Some(sym) = NAMES.read().expect("name table poisoned").get(s) {
            return Name(sym);
        }
        let mut names = NAMES.write().expect("name table poisoned");
        Name(names.get_or_intern(s))
    }

    /// Run `f` with the name's text without allocating.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let names = NAMES.read().expect("name table poisoned");
        let s = names.resolve(self.0).expect("interned name always resolves");
        f(s)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}
