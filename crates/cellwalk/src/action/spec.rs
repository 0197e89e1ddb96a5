//! Spec blocks: the parameter-list dialect shared by natives and `func`
//!
//! ```text
//! [
//!     "description text is ignored"
//!     value [integer! <opt>]     ; normal, with a type block
//!     :name                      ; hard quoted
//!     'name                      ; soft quoted (escapable)
//!     @name /switch              ; modal, gating the refinement after it
//!     args [<...>]               ; variadic
//!     /ref arg                   ; refinement plus the argument it gates
//!     return: [integer!]         ; result constraint
//!     <output> rest              ; output parameters
//!     <local> tmp                ; locals (`/local` works too)
//! ]
//! ```

use std::collections::HashSet;

use super::{Param, ParamClass};
use crate::error::EvalError;
use crate::value::{Cell, Kind, Symbol, TypeFlags, TypeSet, Value};

/// The result of parsing a spec block.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    /// Parameters in layout order
    pub params: Vec<Param>,
    /// Result constraint from `return: [...]`
    pub returns: Option<TypeSet>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Args,
    Locals,
    Outputs,
}

fn bad_spec(message: impl Into<String>) -> EvalError {
    EvalError::BadSpec {
        message: message.into(),
    }
}

/// Parse a spec block into a parameter list.
pub fn parse_spec(spec: &[Cell]) -> Result<ParamSpec, EvalError> {
    let mut out = ParamSpec::default();
    let mut seen: HashSet<Symbol> = HashSet::new();
    let mut mode = Mode::Args;
    let mut cells = spec.iter().peekable();

    while let Some(cell) = cells.next() {
        let (symbol, class) = match cell.value() {
            Value::Text(_) => continue,
            Value::Tag(tag) => {
                mode = match tag.as_ref() {
                    "local" => Mode::Locals,
                    "output" => Mode::Outputs,
                    other => return Err(bad_spec(format!("unknown spec tag <{}>", other))),
                };
                continue;
            }
            Value::SetWord(s) if s == "return" => {
                let types = match cells.next() {
                    Some(c) => match c.value() {
                        Value::Block(b) => parse_types(b.cells())?.0,
                        _ => return Err(bad_spec("return: must be followed by a type block")),
                    },
                    None => return Err(bad_spec("return: must be followed by a type block")),
                };
                out.returns = Some(types);
                continue;
            }
            Value::Refinement(s) if s == "local" => {
                mode = Mode::Locals;
                continue;
            }
            Value::Refinement(s) => {
                mode = Mode::Args;
                (s.clone(), ParamClass::Refinement)
            }
            Value::Word(s) => match mode {
                Mode::Args => (s.clone(), ParamClass::Normal),
                Mode::Locals => (s.clone(), ParamClass::Local),
                Mode::Outputs => (s.clone(), ParamClass::Output),
            },
            Value::GetWord(s) if mode == Mode::Args => (s.clone(), ParamClass::HardQuote),
            Value::SymWord(s) if mode == Mode::Args => (s.clone(), ParamClass::Modal),
            Value::Quoted(inner) if mode == Mode::Args => match inner.value() {
                Value::Word(s) => (s.clone(), ParamClass::SoftQuote),
                _ => return Err(bad_spec(format!("bad parameter {}", cell))),
            },
            _ => return Err(bad_spec(format!("bad parameter {}", cell))),
        };

        if !seen.insert(symbol.clone()) {
            return Err(bad_spec(format!("duplicate parameter {}", symbol)));
        }

        let mut class = class;
        let mut types = TypeSet::any_value();
        if let Some(next) = cells.peek() {
            if let Value::Block(b) = next.value() {
                if matches!(class, ParamClass::Local | ParamClass::Output) {
                    return Err(bad_spec(format!("{} cannot have a type block", symbol)));
                }
                let (parsed, declared_kinds) = parse_types(b.cells())?;
                types = if declared_kinds {
                    parsed
                } else {
                    TypeSet::any_value().union(parsed)
                };
                cells.next();
            }
        }

        if types.is_variadic() {
            if class != ParamClass::Normal {
                return Err(bad_spec(format!("{} cannot be both quoted and variadic", symbol)));
            }
            class = ParamClass::Variadic;
        }
        if types.is_skippable() && class != ParamClass::HardQuote {
            return Err(bad_spec(format!("only hard-quoted {} may be <skip>", symbol)));
        }
        if class == ParamClass::Refinement {
            types = TypeSet::of(&[Kind::Logic, Kind::Null]);
        }

        out.params.push(Param::new(symbol, class, types));
    }

    for (i, param) in out.params.iter().enumerate() {
        if param.class == ParamClass::Modal {
            let gated = out.params.get(i + 1);
            if !gated.is_some_and(|p| p.class == ParamClass::Refinement) {
                return Err(bad_spec(format!(
                    "modal {} must be followed by a refinement",
                    param.symbol
                )));
            }
        }
    }

    Ok(out)
}

/// Parse a type block. The flag reports whether any kinds (as opposed to
/// only conventions like `<end>`) were named.
fn parse_types(cells: &[Cell]) -> Result<(TypeSet, bool), EvalError> {
    let mut types = TypeSet::empty();
    let mut declared_kinds = false;
    for cell in cells {
        match cell.value() {
            Value::Word(s) => {
                let named = TypeSet::from_type_name(s.as_str())
                    .ok_or_else(|| bad_spec(format!("unknown type {}", s)))?;
                types = types.union(named);
                declared_kinds = true;
            }
            Value::Tag(tag) => {
                types = match tag.as_ref() {
                    "opt" => types.with(Kind::Null),
                    "end" => types.with_flags(TypeFlags::ENDABLE),
                    "skip" => types.with_flags(TypeFlags::SKIPPABLE),
                    "..." => types.with_flags(TypeFlags::VARIADIC),
                    other => return Err(bad_spec(format!("unknown type tag <{}>", other))),
                }
            }
            Value::Text(_) => {}
            _ => return Err(bad_spec(format!("bad type specification {}", cell))),
        }
    }
    Ok((types, declared_kinds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Series;

    fn tag(s: &str) -> Cell {
        Cell::new(Value::Tag(s.into()))
    }

    fn types(cells: Vec<Cell>) -> Cell {
        Cell::new(Value::Block(Series::new(cells)))
    }

    #[test]
    fn test_parse_classes() {
        let spec = vec![
            Cell::text("doc"),
            Cell::word("a"),
            Cell::get_word("b"),
            Cell::quoted(Cell::word("c")),
            Cell::refinement("d"),
            Cell::word("e"),
            tag("local"),
            Cell::word("tmp"),
        ];
        let parsed = parse_spec(&spec).unwrap();
        let classes: Vec<ParamClass> = parsed.params.iter().map(|p| p.class).collect();
        assert_eq!(
            classes,
            vec![
                ParamClass::Normal,
                ParamClass::HardQuote,
                ParamClass::SoftQuote,
                ParamClass::Refinement,
                ParamClass::Normal,
                ParamClass::Local,
            ]
        );
    }

    #[test]
    fn test_type_block_and_opt() {
        let spec = vec![
            Cell::word("value"),
            types(vec![Cell::word("integer!"), tag("opt")]),
        ];
        let parsed = parse_spec(&spec).unwrap();
        let ts = parsed.params[0].types;
        assert!(ts.contains(Kind::Integer));
        assert!(ts.contains(Kind::Null));
        assert!(!ts.contains(Kind::Text));
    }

    #[test]
    fn test_end_only_keeps_any_value() {
        let spec = vec![Cell::word("value"), types(vec![tag("end")])];
        let parsed = parse_spec(&spec).unwrap();
        let ts = parsed.params[0].types;
        assert!(ts.is_endable());
        assert!(ts.contains(Kind::Integer));
    }

    #[test]
    fn test_variadic() {
        let spec = vec![Cell::word("args"), types(vec![tag("...")])];
        let parsed = parse_spec(&spec).unwrap();
        assert_eq!(parsed.params[0].class, ParamClass::Variadic);
    }

    #[test]
    fn test_return_types() {
        let spec = vec![
            Cell::set_word("return"),
            types(vec![Cell::word("integer!")]),
            Cell::word("x"),
        ];
        let parsed = parse_spec(&spec).unwrap();
        assert!(parsed.returns.is_some_and(|r| r.contains(Kind::Integer)));
        assert_eq!(parsed.params.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let spec = vec![Cell::word("a"), Cell::word("a")];
        assert!(matches!(parse_spec(&spec), Err(EvalError::BadSpec { .. })));
    }

    #[test]
    fn test_modal_needs_refinement() {
        let spec = vec![Cell::new(Value::SymWord("x".into())), Cell::word("y")];
        assert!(parse_spec(&spec).is_err());
        let spec = vec![
            Cell::new(Value::SymWord("x".into())),
            Cell::refinement("y"),
        ];
        assert!(parse_spec(&spec).is_ok());
    }

    #[test]
    fn test_skip_requires_hard_quote() {
        let spec = vec![Cell::word("x"), types(vec![tag("skip")])];
        assert!(parse_spec(&spec).is_err());
    }
}
