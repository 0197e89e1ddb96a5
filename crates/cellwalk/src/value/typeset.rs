//! Type constraints for parameters and return values

use std::fmt;

use bitflags::bitflags;

use super::{Cell, Kind};

bitflags! {
    /// Parameter conventions that ride along with a type constraint.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeFlags: u8 {
        /// `<end>`: the parameter tolerates reaching the end of input.
        const ENDABLE = 1 << 0;
        /// `<skip>`: a hard-quoted parameter that is bypassed on mismatch.
        const SKIPPABLE = 1 << 1;
        /// `<...>`: the parameter is variadic.
        const VARIADIC = 1 << 2;
    }
}

/// A set of kinds plus parameter conventions.
///
/// `<opt>` is represented by including [`Kind::Null`].
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeSet {
    kinds: u32,
    flags: TypeFlags,
}

impl TypeSet {
    /// The empty set (accepts nothing).
    pub const fn empty() -> Self {
        Self {
            kinds: 0,
            flags: TypeFlags::empty(),
        }
    }

    /// Every kind that counts as a value: all but null and void.
    pub fn any_value() -> Self {
        Kind::ALL
            .iter()
            .filter(|k| !matches!(k, Kind::Null | Kind::Void))
            .fold(Self::empty(), |ts, k| ts.with(*k))
    }

    /// Build from a list of kinds.
    pub fn of(kinds: &[Kind]) -> Self {
        kinds.iter().fold(Self::empty(), |ts, k| ts.with(*k))
    }

    /// Add one kind.
    pub fn with(mut self, kind: Kind) -> Self {
        self.kinds |= 1 << kind as u32;
        self
    }

    /// Add a convention flag.
    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Union of two sets.
    pub fn union(mut self, other: TypeSet) -> Self {
        self.kinds |= other.kinds;
        self.flags |= other.flags;
        self
    }

    /// Whether `kind` is in the set.
    pub fn contains(&self, kind: Kind) -> bool {
        self.kinds & (1 << kind as u32) != 0
    }

    /// Whether a cell's kind is in the set.
    pub fn accepts(&self, cell: &Cell) -> bool {
        self.contains(cell.kind())
    }

    /// Whether no kinds were declared at all.
    pub fn is_unconstrained(&self) -> bool {
        self.kinds == 0
    }

    /// Whether null is acceptable (`<opt>`).
    pub fn is_optional(&self) -> bool {
        self.contains(Kind::Null)
    }

    /// Whether the end of input is acceptable (`<end>`).
    pub fn is_endable(&self) -> bool {
        self.flags.contains(TypeFlags::ENDABLE)
    }

    /// Whether the parameter is `<skip>`-able.
    pub fn is_skippable(&self) -> bool {
        self.flags.contains(TypeFlags::SKIPPABLE)
    }

    /// Whether the parameter is variadic.
    pub fn is_variadic(&self) -> bool {
        self.flags.contains(TypeFlags::VARIADIC)
    }

    /// Resolve a type word as written in a spec block.
    ///
    /// Accepts datatype names (`integer!`) and the pseudo-types
    /// `any-value!`, `any-word!`, `any-array!`, `any-path!` and `number!`.
    pub fn from_type_name(name: &str) -> Option<TypeSet> {
        if let Some(kind) = Kind::from_name(name) {
            return Some(Self::empty().with(kind));
        }
        let set = match name {
            "any-value!" => Self::any_value(),
            "any-word!" => Self::of(&[
                Kind::Word,
                Kind::SetWord,
                Kind::GetWord,
                Kind::SymWord,
                Kind::Refinement,
            ]),
            "any-array!" => Self::of(&[
                Kind::Block,
                Kind::Group,
                Kind::SetBlock,
                Kind::SymGroup,
            ]),
            "any-path!" => Self::of(&[Kind::Path, Kind::SetPath, Kind::GetPath]),
            "number!" => Self::of(&[Kind::Integer, Kind::Decimal]),
            _ => return None,
        };
        Some(set)
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for kind in Kind::ALL.iter().filter(|k| self.contains(**k)) {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", kind.name())?;
        }
        if self.is_endable() {
            write!(f, "{}<end>", if first { "" } else { " " })?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_value_excludes_null_and_void() {
        let ts = TypeSet::any_value();
        assert!(ts.contains(Kind::Integer));
        assert!(ts.contains(Kind::Block));
        assert!(!ts.contains(Kind::Null));
        assert!(!ts.contains(Kind::Void));
    }

    #[test]
    fn test_from_type_name() {
        let ts = TypeSet::from_type_name("integer!").unwrap();
        assert!(ts.accepts(&Cell::integer(1)));
        assert!(!ts.accepts(&Cell::text("x")));
        assert!(TypeSet::from_type_name("no-such!").is_none());
    }

    #[test]
    fn test_flags_survive_union() {
        let a = TypeSet::of(&[Kind::Integer]).with_flags(TypeFlags::ENDABLE);
        let b = TypeSet::of(&[Kind::Text]);
        let u = a.union(b);
        assert!(u.is_endable());
        assert!(u.contains(Kind::Text));
    }
}
