//! The data stack: scoped push-down storage shared by nested calls
//!
//! Path dispatch pushes the refinements it names here (in mention order)
//! for the invocation engine to reconcile with parameter order, and actions
//! report `<output>` values here for a set-block to collect. Every user
//! records a [`StackMark`] first and unwinds to it when done, whether it
//! finished normally or not.

use crate::value::{Cell, Symbol};

/// A recorded stack height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackMark(usize);

/// A refinement named at a call site.
#[derive(Debug, Clone)]
pub struct PendingRefinement {
    /// The refinement's name
    pub symbol: Symbol,
    /// Parameter index, once the engine has found it
    pub slot: Option<usize>,
    /// Whether its gated arguments have been gathered
    pub fulfilled: bool,
}

/// One stack entry.
#[derive(Debug, Clone)]
pub enum Pushed {
    /// A value
    Value(Cell),
    /// A call-site refinement
    Refinement(PendingRefinement),
}

/// Push-down stack with mark / unwind discipline.
#[derive(Debug, Default)]
pub struct DataStack {
    items: Vec<Pushed>,
}

impl DataStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current height.
    pub fn mark(&self) -> StackMark {
        StackMark(self.items.len())
    }

    /// Drop everything above `mark`.
    pub fn unwind_to(&mut self, mark: StackMark) {
        debug_assert!(mark.0 <= self.items.len(), "unwinding to a mark above the top");
        self.items.truncate(mark.0);
    }

    /// Current height.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is pushed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a value.
    pub fn push(&mut self, cell: Cell) {
        self.items.push(Pushed::Value(cell));
    }

    /// Push a call-site refinement.
    pub fn push_refinement(&mut self, symbol: Symbol) {
        self.items.push(Pushed::Refinement(PendingRefinement {
            symbol,
            slot: None,
            fulfilled: false,
        }));
    }

    /// Everything above `mark`, bottom first.
    pub fn since(&self, mark: StackMark) -> &[Pushed] {
        &self.items[mark.0.min(self.items.len())..]
    }

    /// Remove and return everything above `mark`, bottom first.
    pub fn drain_since(&mut self, mark: StackMark) -> Vec<Pushed> {
        let start = mark.0.min(self.items.len());
        self.items.drain(start..).collect()
    }

    /// Position of the refinement named `symbol` above `mark`.
    pub fn find_refinement(&self, mark: StackMark, symbol: &Symbol) -> Option<usize> {
        self.since(mark)
            .iter()
            .position(|p| matches!(p, Pushed::Refinement(r) if &r.symbol == symbol))
            .map(|i| mark.0 + i)
    }

    /// Position of the earliest-mentioned refinement above `mark` whose
    /// arguments have not been gathered yet.
    pub fn first_unfulfilled(&self, mark: StackMark) -> Option<usize> {
        self.since(mark)
            .iter()
            .position(|p| matches!(p, Pushed::Refinement(r) if !r.fulfilled))
            .map(|i| mark.0 + i)
    }

    /// Mutable access to the refinement at an absolute position.
    pub fn refinement_mut(&mut self, position: usize) -> Option<&mut PendingRefinement> {
        match self.items.get_mut(position) {
            Some(Pushed::Refinement(r)) => Some(r),
            _ => None,
        }
    }

    /// Snapshot of the refinements above `mark`, in mention order.
    pub fn refinements_since(&self, mark: StackMark) -> Vec<PendingRefinement> {
        self.since(mark)
            .iter()
            .filter_map(|p| match p {
                Pushed::Refinement(r) => Some(r.clone()),
                Pushed::Value(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwind_restores_mark() {
        let mut stack = DataStack::new();
        stack.push(Cell::integer(1));
        let mark = stack.mark();
        stack.push(Cell::integer(2));
        stack.push_refinement("dup".into());
        assert_eq!(stack.len(), 3);
        stack.unwind_to(mark);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_first_unfulfilled_follows_mention_order() {
        let mut stack = DataStack::new();
        let mark = stack.mark();
        stack.push_refinement("c".into());
        stack.push_refinement("b".into());

        assert_eq!(stack.find_refinement(mark, &"b".into()), Some(1));
        assert_eq!(stack.first_unfulfilled(mark), Some(0));

        if let Some(r) = stack.refinement_mut(0) {
            r.fulfilled = true;
        }
        assert_eq!(stack.first_unfulfilled(mark), Some(1));
    }

    #[test]
    fn test_drain_since_is_bottom_first() {
        let mut stack = DataStack::new();
        let mark = stack.mark();
        stack.push(Cell::integer(1));
        stack.push(Cell::integer(2));
        let drained = stack.drain_since(mark);
        assert!(matches!(&drained[0], Pushed::Value(c) if c.as_integer() == Some(1)));
        assert!(stack.is_empty());
    }
}
