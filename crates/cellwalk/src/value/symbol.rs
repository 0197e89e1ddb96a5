//! Symbols: the spellings behind every word-like cell

use std::fmt;
use std::rc::Rc;

/// An immutable, cheaply clonable spelling.
///
/// Word, set-word, get-word, sym-word and refinement cells all carry a
/// `Symbol`. Equality is by spelling.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Create a symbol from its spelling.
    pub fn new(spelling: &str) -> Self {
        Symbol(Rc::from(spelling))
    }

    /// The symbol's spelling.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(Rc::from(s))
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_equality_is_by_spelling() {
        assert_eq!(Symbol::new("foo"), Symbol::from("foo"));
        assert_ne!(Symbol::new("foo"), Symbol::new("bar"));
        assert!(Symbol::new("then") == "then");
    }
}
