//! Value cells: the tagged values that code and data are both made of

mod display;
mod series;
mod symbol;
mod typeset;

pub use series::Series;
pub use symbol::Symbol;
pub use typeset::{TypeFlags, TypeSet};

use std::rc::Rc;

use bitflags::bitflags;

use crate::action::Action;
use crate::environment::Context;

/// The closed set of cell kinds.
///
/// The evaluator's main switch dispatches on this, but never on the kind
/// alone where a [`CellFlags`] bit qualifies the treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The absence of a value (`null`)
    Null,
    /// An unset state; reading a void variable through a word is an error
    Void,
    /// `_`
    Blank,
    /// `true` / `false`
    Logic,
    /// 64-bit integer
    Integer,
    /// 64-bit float
    Decimal,
    /// `"text"`
    Text,
    /// `<tag>`
    Tag,
    /// `word`
    Word,
    /// `word:`
    SetWord,
    /// `:word`
    GetWord,
    /// `@word`
    SymWord,
    /// `/word`
    Refinement,
    /// `[...]`
    Block,
    /// `(...)`
    Group,
    /// `[...]:`
    SetBlock,
    /// `@(...)`
    SymGroup,
    /// `a/b`
    Path,
    /// `a/b:`
    SetPath,
    /// `:a/b`
    GetPath,
    /// `'x`
    Quoted,
    /// An invocable action
    Action,
    /// A context of named fields
    Object,
    /// A kind as a value (`integer!`)
    Datatype,
    /// A handle a dispatcher uses to pull more values from its caller's feed
    Varargs,
}

impl Kind {
    /// Every kind, in declaration order.
    pub const ALL: [Kind; 25] = [
        Kind::Null,
        Kind::Void,
        Kind::Blank,
        Kind::Logic,
        Kind::Integer,
        Kind::Decimal,
        Kind::Text,
        Kind::Tag,
        Kind::Word,
        Kind::SetWord,
        Kind::GetWord,
        Kind::SymWord,
        Kind::Refinement,
        Kind::Block,
        Kind::Group,
        Kind::SetBlock,
        Kind::SymGroup,
        Kind::Path,
        Kind::SetPath,
        Kind::GetPath,
        Kind::Quoted,
        Kind::Action,
        Kind::Object,
        Kind::Datatype,
        Kind::Varargs,
    ];

    /// The user-facing type name, e.g. `integer!`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Void => "void",
            Kind::Blank => "blank!",
            Kind::Logic => "logic!",
            Kind::Integer => "integer!",
            Kind::Decimal => "decimal!",
            Kind::Text => "text!",
            Kind::Tag => "tag!",
            Kind::Word => "word!",
            Kind::SetWord => "set-word!",
            Kind::GetWord => "get-word!",
            Kind::SymWord => "sym-word!",
            Kind::Refinement => "refinement!",
            Kind::Block => "block!",
            Kind::Group => "group!",
            Kind::SetBlock => "set-block!",
            Kind::SymGroup => "sym-group!",
            Kind::Path => "path!",
            Kind::SetPath => "set-path!",
            Kind::GetPath => "get-path!",
            Kind::Quoted => "quoted!",
            Kind::Action => "action!",
            Kind::Object => "object!",
            Kind::Datatype => "datatype!",
            Kind::Varargs => "varargs!",
        }
    }

    /// Look a kind up by its type name.
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.name() == name)
    }
}

bitflags! {
    /// Side flags that qualify how a cell is treated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// The cell was copied literally from a feed rather than computed.
        const UNEVALUATED = 1 << 0;
        /// An output cell whose content is left over from an earlier step.
        const STALE = 1 << 1;
        /// An argument that has already passed its type check.
        const CHECKED = 1 << 2;
    }
}

/// An action together with the binding it was fetched with.
///
/// The binding is how definitional constructs such as RETURN know which
/// frame they belong to.
#[derive(Clone)]
pub struct ActionValue {
    /// The action itself
    pub action: Rc<Action>,
    /// Context the action is bound to, if any
    pub binding: Option<Context>,
}

/// The payload of a cell.
#[derive(Clone)]
pub enum Value {
    /// No value
    Null,
    /// Unset
    Void,
    /// `_`
    Blank,
    /// Boolean
    Logic(bool),
    /// Integer
    Integer(i64),
    /// Float
    Decimal(f64),
    /// Text string
    Text(Rc<str>),
    /// Tag
    Tag(Rc<str>),
    /// Word
    Word(Symbol),
    /// Set-word
    SetWord(Symbol),
    /// Get-word
    GetWord(Symbol),
    /// Sym-word
    SymWord(Symbol),
    /// Refinement
    Refinement(Symbol),
    /// Block
    Block(Series),
    /// Group
    Group(Series),
    /// Set-block
    SetBlock(Series),
    /// Sym-group
    SymGroup(Series),
    /// Path
    Path(Series),
    /// Set-path
    SetPath(Series),
    /// Get-path
    GetPath(Series),
    /// One level of quoting around another cell
    Quoted(Box<Cell>),
    /// Action
    Action(ActionValue),
    /// Object
    Object(Context),
    /// Datatype
    Datatype(Kind),
    /// Variadic handle for the parameter at this index
    Varargs(usize),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Void => Kind::Void,
            Value::Blank => Kind::Blank,
            Value::Logic(_) => Kind::Logic,
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::Text(_) => Kind::Text,
            Value::Tag(_) => Kind::Tag,
            Value::Word(_) => Kind::Word,
            Value::SetWord(_) => Kind::SetWord,
            Value::GetWord(_) => Kind::GetWord,
            Value::SymWord(_) => Kind::SymWord,
            Value::Refinement(_) => Kind::Refinement,
            Value::Block(_) => Kind::Block,
            Value::Group(_) => Kind::Group,
            Value::SetBlock(_) => Kind::SetBlock,
            Value::SymGroup(_) => Kind::SymGroup,
            Value::Path(_) => Kind::Path,
            Value::SetPath(_) => Kind::SetPath,
            Value::GetPath(_) => Kind::GetPath,
            Value::Quoted(_) => Kind::Quoted,
            Value::Action(_) => Kind::Action,
            Value::Object(_) => Kind::Object,
            Value::Datatype(_) => Kind::Datatype,
            Value::Varargs(_) => Kind::Varargs,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Void, Value::Void) => true,
            (Value::Blank, Value::Blank) => true,
            (Value::Logic(a), Value::Logic(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Integer(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Tag(a), Value::Tag(b)) => a == b,
            (Value::Word(a), Value::Word(b))
            | (Value::SetWord(a), Value::SetWord(b))
            | (Value::GetWord(a), Value::GetWord(b))
            | (Value::SymWord(a), Value::SymWord(b))
            | (Value::Refinement(a), Value::Refinement(b)) => a == b,
            (Value::Block(a), Value::Block(b))
            | (Value::Group(a), Value::Group(b))
            | (Value::SetBlock(a), Value::SetBlock(b))
            | (Value::SymGroup(a), Value::SymGroup(b))
            | (Value::Path(a), Value::Path(b))
            | (Value::SetPath(a), Value::SetPath(b))
            | (Value::GetPath(a), Value::GetPath(b)) => a.cells() == b.cells(),
            (Value::Quoted(a), Value::Quoted(b)) => a == b,
            (Value::Action(a), Value::Action(b)) => Rc::ptr_eq(&a.action, &b.action),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Datatype(a), Value::Datatype(b)) => a == b,
            (Value::Varargs(a), Value::Varargs(b)) => a == b,
            _ => false,
        }
    }
}

/// A tagged value plus side flags.
///
/// Cells are owned by whichever array, argument slot or output holds them;
/// keeping one beyond that means cloning it.
#[derive(Clone)]
pub struct Cell {
    value: Value,
    flags: CellFlags,
}

impl Cell {
    /// Wrap a value with no flags set.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            flags: CellFlags::empty(),
        }
    }

    /// A fresh output cell: void, and already stale.
    pub fn fresh() -> Self {
        Self {
            value: Value::Void,
            flags: CellFlags::STALE,
        }
    }

    /// `null`
    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    /// void
    pub fn void() -> Self {
        Self::new(Value::Void)
    }

    /// `_`
    pub fn blank() -> Self {
        Self::new(Value::Blank)
    }

    /// A logic value.
    pub fn logic(b: bool) -> Self {
        Self::new(Value::Logic(b))
    }

    /// An integer.
    pub fn integer(i: i64) -> Self {
        Self::new(Value::Integer(i))
    }

    /// A decimal.
    pub fn decimal(d: f64) -> Self {
        Self::new(Value::Decimal(d))
    }

    /// A text string.
    pub fn text(s: impl AsRef<str>) -> Self {
        Self::new(Value::Text(Rc::from(s.as_ref())))
    }

    /// A plain word.
    pub fn word(s: impl Into<Symbol>) -> Self {
        Self::new(Value::Word(s.into()))
    }

    /// A set-word.
    pub fn set_word(s: impl Into<Symbol>) -> Self {
        Self::new(Value::SetWord(s.into()))
    }

    /// A get-word.
    pub fn get_word(s: impl Into<Symbol>) -> Self {
        Self::new(Value::GetWord(s.into()))
    }

    /// A refinement.
    pub fn refinement(s: impl Into<Symbol>) -> Self {
        Self::new(Value::Refinement(s.into()))
    }

    /// A block of cells.
    pub fn block(cells: Vec<Cell>) -> Self {
        Self::new(Value::Block(Series::new(cells)))
    }

    /// A group of cells.
    pub fn group(cells: Vec<Cell>) -> Self {
        Self::new(Value::Group(Series::new(cells)))
    }

    /// One level of quoting around `cell`.
    pub fn quoted(cell: Cell) -> Self {
        Self::new(Value::Quoted(Box::new(cell)))
    }

    /// An unbound action value.
    pub fn action(action: Rc<Action>) -> Self {
        Self::new(Value::Action(ActionValue {
            action,
            binding: None,
        }))
    }

    /// An action value bound to a context.
    pub fn bound_action(action: Rc<Action>, binding: Context) -> Self {
        Self::new(Value::Action(ActionValue {
            action,
            binding: Some(binding),
        }))
    }

    /// An object.
    pub fn object(ctx: Context) -> Self {
        Self::new(Value::Object(ctx))
    }

    /// A datatype.
    pub fn datatype(kind: Kind) -> Self {
        Self::new(Value::Datatype(kind))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// The cell's payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the cell, yielding its payload.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The cell's kind.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// The cell's flags.
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    /// Whether a flag is set.
    pub fn has(&self, flag: CellFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Set a flag.
    pub fn set(&mut self, flag: CellFlags) {
        self.flags.insert(flag);
    }

    /// Clear a flag.
    pub fn clear(&mut self, flag: CellFlags) {
        self.flags.remove(flag);
    }

    /// Builder form of [`Cell::set`].
    pub fn flagged(mut self, flag: CellFlags) -> Self {
        self.flags.insert(flag);
        self
    }

    /// Whether this output cell holds nothing produced by the current step.
    pub fn is_stale(&self) -> bool {
        self.flags.contains(CellFlags::STALE)
    }

    /// Mark an output as left over, without erasing it.
    pub fn mark_stale(&mut self) {
        self.flags.insert(CellFlags::STALE);
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    /// Whether the value is void.
    pub fn is_void(&self) -> bool {
        matches!(self.value, Value::Void)
    }

    /// Conditional truth: null, blank and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(
            self.value,
            Value::Null | Value::Void | Value::Blank | Value::Logic(false)
        )
    }

    /// The integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The action payload, if any.
    pub fn as_action(&self) -> Option<&ActionValue> {
        match &self.value {
            Value::Action(a) => Some(a),
            _ => None,
        }
    }

    /// The series payload of any array or path kind.
    pub fn as_series(&self) -> Option<&Series> {
        match &self.value {
            Value::Block(s)
            | Value::Group(s)
            | Value::SetBlock(s)
            | Value::SymGroup(s)
            | Value::Path(s)
            | Value::SetPath(s)
            | Value::GetPath(s) => Some(s),
            _ => None,
        }
    }

    /// The symbol of any word-like kind.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.value {
            Value::Word(s)
            | Value::SetWord(s)
            | Value::GetWord(s)
            | Value::SymWord(s)
            | Value::Refinement(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a soft-quoted parameter evaluates this cell instead of
    /// taking it literally.
    pub fn is_escapable(&self) -> bool {
        matches!(
            self.value,
            Value::Group(_) | Value::GetWord(_) | Value::GetPath(_)
        )
    }

    /// Whether evaluating this cell is the same as copying it.
    pub fn is_inert(&self) -> bool {
        !matches!(
            self.value,
            Value::Word(_)
                | Value::SetWord(_)
                | Value::GetWord(_)
                | Value::SymWord(_)
                | Value::Group(_)
                | Value::SetBlock(_)
                | Value::SymGroup(_)
                | Value::Path(_)
                | Value::SetPath(_)
                | Value::GetPath(_)
                | Value::Quoted(_)
                | Value::Action(_)
        )
    }

    /// A copy that remembers `scope` if it is an unscoped array.
    pub fn derelativize(&self, scope: &Context) -> Cell {
        let value = match &self.value {
            Value::Block(s) => Value::Block(s.derelativize(scope)),
            Value::Group(s) => Value::Group(s.derelativize(scope)),
            Value::SetBlock(s) => Value::SetBlock(s.derelativize(scope)),
            Value::SymGroup(s) => Value::SymGroup(s.derelativize(scope)),
            other => other.clone(),
        };
        Cell {
            value,
            flags: self.flags,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::new(value)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::integer(i)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::logic(b)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_equality_ignores_flags() {
        let a = Cell::integer(3).flagged(CellFlags::UNEVALUATED);
        let b = Cell::integer(3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Cell::null().is_truthy());
        assert!(!Cell::blank().is_truthy());
        assert!(!Cell::logic(false).is_truthy());
        assert!(Cell::integer(0).is_truthy());
        assert!(Cell::block(vec![]).is_truthy());
    }

    #[test]
    fn test_fresh_is_stale_void() {
        let c = Cell::fresh();
        assert!(c.is_stale());
        assert!(c.is_void());
    }

    #[test]
    fn test_escapable_kinds() {
        assert!(Cell::group(vec![]).is_escapable());
        assert!(Cell::get_word("x").is_escapable());
        assert!(!Cell::word("x").is_escapable());
        assert!(!Cell::block(vec![]).is_escapable());
    }
}
