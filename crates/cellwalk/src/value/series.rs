//! Array-backed series positions

use std::rc::Rc;

use super::Cell;
use crate::environment::Context;

/// A position in a shared cell array, optionally carrying the scope its
/// words should be looked up in.
///
/// Blocks, groups and paths all share this representation. The array itself
/// is immutable once built; evaluation never writes into it.
#[derive(Clone)]
pub struct Series {
    array: Rc<Vec<Cell>>,
    index: usize,
    scope: Option<Context>,
}

impl Series {
    /// Create a series at the head of a fresh array.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            array: Rc::new(cells),
            index: 0,
            scope: None,
        }
    }

    /// Create a series over an existing shared array.
    pub fn from_shared(array: Rc<Vec<Cell>>, index: usize) -> Self {
        Self {
            array,
            index,
            scope: None,
        }
    }

    /// The cells from the current position to the tail.
    pub fn cells(&self) -> &[Cell] {
        let start = self.index.min(self.array.len());
        &self.array[start..]
    }

    /// The underlying shared array.
    pub fn array(&self) -> &Rc<Vec<Cell>> {
        &self.array
    }

    /// Zero-based position within the array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of cells from the current position to the tail.
    pub fn len(&self) -> usize {
        self.cells().len()
    }

    /// Whether the series is at (or past) its tail.
    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }

    /// One-based pick, as done by `block/2`.
    pub fn pick(&self, n: i64) -> Option<&Cell> {
        if n < 1 {
            return None;
        }
        self.cells().get((n - 1) as usize)
    }

    /// The scope attached to this series, if any.
    pub fn scope(&self) -> Option<&Context> {
        self.scope.as_ref()
    }

    /// Attach a scope, replacing any existing one.
    pub fn with_scope(mut self, scope: Context) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Attach `scope` only if the series has none yet.
    ///
    /// This is what happens when a literal array is copied out of a feed:
    /// it remembers where it was found.
    pub fn derelativize(&self, scope: &Context) -> Series {
        if self.scope.is_some() {
            return self.clone();
        }
        self.clone().with_scope(scope.clone())
    }

    /// Whether two series view the same array at the same position.
    pub fn same_as(&self, other: &Series) -> bool {
        Rc::ptr_eq(&self.array, &other.array) && self.index == other.index
    }
}
