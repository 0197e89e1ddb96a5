//! Source loader: text to cells
//!
//! Source is tokenized with `proc-macro2`, whose token trees already give
//! balanced `[...]` and `(...)` groups, string literals and numbers. What
//! Rust would lex as several tokens (`not-equal?`, `a/b:`, `<opt>`) is put
//! back together by span: tokens that touch on the same line form one
//! lexeme, which is then classified.
//!
//! ```text
//! 1 -2 3.5 "text" <tag> _          ; literals
//! word set: :get @sym /refine 'quoted
//! obj/field blk/2 :obj/field obj/field:
//! [block] (group) [a b]: @(sym group)
//! ```
//!
//! A `;` comments out the rest of its line. The input must still lex as
//! Rust tokens, so a comment cannot hold an unbalanced `"` or bracket, and
//! only words can be quoted with `'`.

use std::str::FromStr;

use proc_macro2::{Delimiter, Group, TokenStream, TokenTree};
use thiserror::Error;

use crate::value::{Cell, Series, Value};

/// Errors that can occur while loading source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The tokenizer rejected the input
    #[error("cannot tokenize source: {message}")]
    Lex {
        /// Tokenizer message
        message: String,
    },

    /// A lexeme that is not any known form
    #[error("unexpected {text} at line {line}, column {column}")]
    Unexpected {
        /// The lexeme
        text: String,
        /// 1-based line
        line: usize,
        /// 0-based column
        column: usize,
    },

    /// A lexeme that starts like a number but is not one
    #[error("bad number {text} at line {line}, column {column}")]
    BadNumber {
        /// The lexeme
        text: String,
        /// 1-based line
        line: usize,
        /// 0-based column
        column: usize,
    },
}

/// Load source text into a sequence of cells.
pub fn load(src: &str) -> Result<Vec<Cell>, LoadError> {
    let stream = TokenStream::from_str(src).map_err(|e| LoadError::Lex {
        message: e.to_string(),
    })?;
    load_stream(stream)
}

fn load_stream(stream: TokenStream) -> Result<Vec<Cell>, LoadError> {
    let tokens = strip_comments(stream.into_iter().collect());
    let mut cells = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let mut end = start + 1;
        while end < tokens.len() && touching(&tokens[end - 1], &tokens[end]) {
            end += 1;
        }
        cells.push(classify_run(&tokens[start..end])?);
        start = end;
    }
    Ok(cells)
}

fn touching(a: &TokenTree, b: &TokenTree) -> bool {
    a.span().end() == b.span().start()
}

/// Drop `;` and every token starting later on the same line.
fn strip_comments(tokens: Vec<TokenTree>) -> Vec<TokenTree> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut comment_line = None;
    for token in tokens {
        let line = token.span().start().line;
        if comment_line == Some(line) {
            continue;
        }
        if matches!(&token, TokenTree::Punct(p) if p.as_char() == ';') {
            comment_line = Some(line);
            continue;
        }
        kept.push(token);
    }
    kept
}

fn unexpected(text: String, token: &TokenTree) -> LoadError {
    let at = token.span().start();
    LoadError::Unexpected {
        text,
        line: at.line,
        column: at.column,
    }
}

fn array(group: &Group) -> Result<Series, LoadError> {
    Ok(Series::new(load_stream(group.stream())?))
}

fn classify_run(run: &[TokenTree]) -> Result<Cell, LoadError> {
    match run {
        [TokenTree::Group(group)] => match group.delimiter() {
            Delimiter::Bracket => Ok(Cell::new(Value::Block(array(group)?))),
            Delimiter::Parenthesis => Ok(Cell::new(Value::Group(array(group)?))),
            _ => Err(unexpected(group.to_string(), &run[0])),
        },
        [TokenTree::Group(group), TokenTree::Punct(colon)]
            if colon.as_char() == ':' && group.delimiter() == Delimiter::Bracket =>
        {
            Ok(Cell::new(Value::SetBlock(array(group)?)))
        }
        [TokenTree::Punct(at), TokenTree::Group(group)]
            if at.as_char() == '@' && group.delimiter() == Delimiter::Parenthesis =>
        {
            Ok(Cell::new(Value::SymGroup(array(group)?)))
        }
        [TokenTree::Literal(literal)] if literal.to_string().starts_with('"') => {
            let text = literal.to_string();
            Ok(Cell::text(unescape(&text[1..text.len() - 1])))
        }
        _ => {
            if let Some(bad) = run.iter().find(|t| match t {
                TokenTree::Group(_) => true,
                TokenTree::Literal(l) => l.to_string().starts_with('"'),
                _ => false,
            }) {
                let text: String = run.iter().map(|t| t.to_string()).collect();
                return Err(unexpected(text, bad));
            }
            let text: String = run.iter().map(|t| t.to_string()).collect();
            classify(&text).map_err(|kind| {
                let at = run[0].span().start();
                match kind {
                    Malformed::Number => LoadError::BadNumber {
                        text,
                        line: at.line,
                        column: at.column,
                    },
                    Malformed::Other => LoadError::Unexpected {
                        text,
                        line: at.line,
                        column: at.column,
                    },
                }
            })
        }
    }
}

enum Malformed {
    Number,
    Other,
}

fn looks_numeric(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn number(text: &str) -> Result<Cell, Malformed> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Cell::integer(i));
    }
    text.parse::<f64>()
        .map(Cell::decimal)
        .map_err(|_| Malformed::Number)
}

fn is_tag(text: &str) -> bool {
    text.len() > 2
        && text.starts_with('<')
        && text.ends_with('>')
        && !text[1..text.len() - 1].contains(['<', '>', '='])
}

/// Elements of a path: integers, words, or anything else that loads.
fn path(text: &str) -> Result<Series, Malformed> {
    let elements = text
        .split('/')
        .map(|element| {
            if element.is_empty() {
                Err(Malformed::Other)
            } else if looks_numeric(element) {
                number(element)
            } else {
                Ok(Cell::word(element))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Series::new(elements))
}

fn is_path(text: &str) -> bool {
    text.len() > 1 && text.contains('/') && !text.starts_with('/')
}

/// Classify one lexeme.
fn classify(text: &str) -> Result<Cell, Malformed> {
    if text == "_" {
        return Ok(Cell::blank());
    }
    if let Some(rest) = text.strip_prefix('\'') {
        if rest.is_empty() {
            return Err(Malformed::Other);
        }
        return Ok(Cell::quoted(classify(rest)?));
    }
    if looks_numeric(text) {
        return number(text);
    }
    if is_tag(text) {
        return Ok(Cell::new(Value::Tag(text[1..text.len() - 1].into())));
    }
    if let Some(rest) = text.strip_prefix(':').filter(|r| !r.is_empty()) {
        if is_path(rest) {
            return Ok(Cell::new(Value::GetPath(path(rest)?)));
        }
        return Ok(Cell::get_word(rest));
    }
    if let Some(rest) = text.strip_suffix(':').filter(|r| !r.is_empty()) {
        if is_path(rest) {
            return Ok(Cell::new(Value::SetPath(path(rest)?)));
        }
        return Ok(Cell::set_word(rest));
    }
    if let Some(rest) = text.strip_prefix('@').filter(|r| !r.is_empty()) {
        return Ok(Cell::new(Value::SymWord(rest.into())));
    }
    if let Some(rest) = text.strip_prefix('/').filter(|r| !r.is_empty() && !r.contains('/')) {
        return Ok(Cell::refinement(rest));
    }
    if is_path(text) {
        return Ok(Cell::new(Value::Path(path(text)?)));
    }
    Ok(Cell::word(text))
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    fn one(src: &str) -> Cell {
        let cells = load(src).unwrap();
        assert_eq!(cells.len(), 1, "expected one cell from {:?}", src);
        cells.into_iter().next().unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(one("42"), Cell::integer(42));
        assert_eq!(one("-7"), Cell::integer(-7));
        assert_eq!(one("2.5"), Cell::decimal(2.5));
        assert_eq!(one("\"hi\\n\""), Cell::text("hi\n"));
        assert_eq!(one("_").kind(), Kind::Blank);
    }

    #[test]
    fn test_word_forms() {
        assert_eq!(one("not-equal?"), Cell::word("not-equal?"));
        assert_eq!(one("x:"), Cell::set_word("x"));
        assert_eq!(one(":x"), Cell::get_word("x"));
        assert_eq!(one("@x").kind(), Kind::SymWord);
        assert_eq!(one("/dup"), Cell::refinement("dup"));
        assert_eq!(one("'x"), Cell::quoted(Cell::word("x")));
    }

    #[test]
    fn test_operators_are_words() {
        for op in ["+", "-", "*", "/", "=", "<>", "<", ">", "<=", ">=", "|"] {
            assert_eq!(one(op), Cell::word(op), "operator {}", op);
        }
    }

    #[test]
    fn test_tags() {
        assert_eq!(one("<opt>").to_string(), "<opt>");
        assert_eq!(one("<...>").to_string(), "<...>");
    }

    #[test]
    fn test_paths() {
        assert_eq!(one("a/b").kind(), Kind::Path);
        assert_eq!(one("a/b:").kind(), Kind::SetPath);
        assert_eq!(one(":a/b").kind(), Kind::GetPath);
        assert_eq!(one("blk/2").to_string(), "blk/2");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(one("[1 [2] (3)]").to_string(), "[1 [2] (3)]");
        assert_eq!(one("[a _]:").kind(), Kind::SetBlock);
        assert_eq!(one("@(x)").kind(), Kind::SymGroup);
    }

    #[test]
    fn test_spacing_separates_cells() {
        let cells = load("1 + 2").unwrap();
        assert_eq!(cells.len(), 3);
        let cells = load("add 1 2\nsubtract 3 4").unwrap();
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn test_comments_run_to_end_of_line() {
        let cells = load("1 ; ignored words here\n2").unwrap();
        assert_eq!(cells, vec![Cell::integer(1), Cell::integer(2)]);
    }

    #[test]
    fn test_bad_number() {
        assert!(matches!(load("12abc"), Err(LoadError::BadNumber { .. })));
    }

    #[test]
    fn test_unbalanced_input_fails() {
        assert!(matches!(load("[1 2"), Err(LoadError::Lex { .. })));
    }
}
