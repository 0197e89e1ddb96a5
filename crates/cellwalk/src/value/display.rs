//! Display and Debug implementations for cells

use std::fmt;

use super::*;
use crate::action::ActionFlags;

fn write_cells(f: &mut fmt::Formatter<'_>, cells: &[Cell], sep: &str) -> fmt::Result {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", cell)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Void => write!(f, "~void~"),
            Value::Blank => write!(f, "_"),
            Value::Logic(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    write!(f, "{:.1}", d)
                } else {
                    write!(f, "{}", d)
                }
            }
            Value::Text(s) => write!(f, "{:?}", s.as_ref()),
            Value::Tag(s) => write!(f, "<{}>", s),
            Value::Word(s) => write!(f, "{}", s),
            Value::SetWord(s) => write!(f, "{}:", s),
            Value::GetWord(s) => write!(f, ":{}", s),
            Value::SymWord(s) => write!(f, "@{}", s),
            Value::Refinement(s) => write!(f, "/{}", s),
            Value::Block(s) => {
                write!(f, "[")?;
                write_cells(f, s.cells(), " ")?;
                write!(f, "]")
            }
            Value::Group(s) => {
                write!(f, "(")?;
                write_cells(f, s.cells(), " ")?;
                write!(f, ")")
            }
            Value::SetBlock(s) => {
                write!(f, "[")?;
                write_cells(f, s.cells(), " ")?;
                write!(f, "]:")
            }
            Value::SymGroup(s) => {
                write!(f, "@(")?;
                write_cells(f, s.cells(), " ")?;
                write!(f, ")")
            }
            Value::Path(s) => write_cells(f, s.cells(), "/"),
            Value::SetPath(s) => {
                write_cells(f, s.cells(), "/")?;
                write!(f, ":")
            }
            Value::GetPath(s) => {
                write!(f, ":")?;
                write_cells(f, s.cells(), "/")
            }
            Value::Quoted(inner) => write!(f, "'{}", inner),
            Value::Action(a) => {
                write!(f, "#[action!")?;
                if let Some(name) = a.action.name() {
                    write!(f, " {}", name)?;
                }
                if a.action.has(ActionFlags::IS_NATIVE) {
                    write!(f, " native")?;
                }
                write!(f, "]")
            }
            Value::Object(ctx) => {
                write!(f, "#[object! [")?;
                for (i, (key, value)) in ctx.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "]]")
            }
            Value::Datatype(kind) => write!(f, "#[datatype! {}]", kind.name()),
            Value::Varargs(index) => write!(f, "#[varargs! {}]", index),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {:?}", self.value, self.flags)
        }
    }
}
