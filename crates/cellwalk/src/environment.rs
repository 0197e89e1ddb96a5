//! Contexts: ordered variable storage and binding resolution
//!
//! A [`Context`] is an ordered map from symbol to cell with a link to a
//! parent context. The same type serves as an object, as the scope a feed
//! evaluates in, and as the argument storage of an action frame (in which
//! case its keys line up index-for-index with the action's parameters).
//!
//! Words carry no binding of their own. A word is resolved against the
//! scope of the feed (or series) it was found in by walking the parent
//! chain, which ends at `lib`.

mod prelude;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::frame::FrameId;
use crate::value::{Cell, Symbol};

struct ContextData {
    vars: IndexMap<Symbol, Cell>,
    parent: Option<Context>,
    frame: Option<FrameId>,
}

/// A shared, mutable context.
#[derive(Clone)]
pub struct Context(Rc<RefCell<ContextData>>);

/// Where a word resolved to.
#[derive(Clone)]
pub struct Binding {
    /// The context holding the variable
    pub context: Context,
    /// Index of the variable within that context
    pub index: usize,
}

impl Binding {
    /// Read the bound variable.
    pub fn get(&self) -> Option<Cell> {
        self.context.get_index(self.index)
    }

    /// Write the bound variable.
    pub fn set(&self, cell: Cell) {
        self.context.set_index(self.index, cell);
    }
}

impl Context {
    /// Create an empty context.
    pub fn new(parent: Option<Context>) -> Self {
        Context(Rc::new(RefCell::new(ContextData {
            vars: IndexMap::new(),
            parent,
            frame: None,
        })))
    }

    /// Create argument storage for a frame, one void slot per key.
    pub fn for_frame<'a>(keys: impl Iterator<Item = &'a Symbol>, frame: FrameId) -> Self {
        let vars = keys.map(|k| (k.clone(), Cell::void())).collect();
        Context(Rc::new(RefCell::new(ContextData {
            vars,
            parent: None,
            frame: Some(frame),
        })))
    }

    /// Whether two handles refer to the same context.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The parent context.
    pub fn parent(&self) -> Option<Context> {
        self.0.borrow().parent.clone()
    }

    /// Replace the parent link.
    pub fn set_parent(&self, parent: Option<Context>) {
        self.0.borrow_mut().parent = parent;
    }

    /// The frame this context is the argument storage of, if any.
    pub fn frame_id(&self) -> Option<FrameId> {
        self.0.borrow().frame
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.0.borrow().vars.len()
    }

    /// Whether the context has no variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of a key in this context only.
    pub fn index_of(&self, name: &Symbol) -> Option<usize> {
        self.0.borrow().vars.get_index_of(name)
    }

    /// Value of a key in this context only.
    pub fn get(&self, name: &Symbol) -> Option<Cell> {
        self.0.borrow().vars.get(name).cloned()
    }

    /// Value at an index.
    pub fn get_index(&self, index: usize) -> Option<Cell> {
        self.0.borrow().vars.get_index(index).map(|(_, v)| v.clone())
    }

    /// Key at an index.
    pub fn key_at(&self, index: usize) -> Option<Symbol> {
        self.0.borrow().vars.get_index(index).map(|(k, _)| k.clone())
    }

    /// Overwrite the value at an index. Returns false if out of range.
    pub fn set_index(&self, index: usize, cell: Cell) -> bool {
        match self.0.borrow_mut().vars.get_index_mut(index) {
            Some((_, slot)) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Define (or overwrite) a key in this context, returning its index.
    pub fn define(&self, name: impl Into<Symbol>, cell: Cell) -> usize {
        let mut data = self.0.borrow_mut();
        let (index, _) = data.vars.insert_full(name.into(), cell);
        index
    }

    /// Snapshot of all entries, in definition order.
    pub fn entries(&self) -> Vec<(Symbol, Cell)> {
        self.0
            .borrow()
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether `name` is visible from here, walking parents.
    pub fn contains(&self, name: &Symbol) -> bool {
        bind(name, self).is_some()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let keys: Vec<&str> = data.vars.keys().map(|k| k.as_str()).collect();
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("frame", &data.frame)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Binding Resolution
// ═══════════════════════════════════════════════════════════════════════

/// Resolve `name` starting at `scope` and walking outward.
pub fn bind(name: &Symbol, scope: &Context) -> Option<Binding> {
    let mut current = Some(scope.clone());
    while let Some(ctx) = current {
        if let Some(index) = ctx.index_of(name) {
            return Some(Binding {
                context: ctx,
                index,
            });
        }
        current = ctx.parent();
    }
    None
}

/// Look up the value of `name` as seen from `scope`.
pub fn lookup(name: &Symbol, scope: &Context) -> Option<Cell> {
    bind(name, scope).and_then(|b| b.get())
}

/// Assign `name` as seen from `scope`.
///
/// An existing variable anywhere on the chain is overwritten; otherwise the
/// variable is created in `scope` itself.
pub fn assign(name: &Symbol, scope: &Context, cell: Cell) {
    match bind(name, scope) {
        Some(binding) => binding.set(cell),
        None => {
            scope.define(name.clone(), cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let outer = Context::new(None);
        outer.define("x", Cell::integer(1));
        let inner = Context::new(Some(outer.clone()));
        inner.define("y", Cell::integer(2));

        assert_eq!(lookup(&"x".into(), &inner), Some(Cell::integer(1)));
        assert_eq!(lookup(&"y".into(), &inner), Some(Cell::integer(2)));
        assert_eq!(lookup(&"y".into(), &outer), None);
    }

    #[test]
    fn test_inner_shadows_outer() {
        let outer = Context::new(None);
        outer.define("x", Cell::integer(1));
        let inner = Context::new(Some(outer.clone()));
        inner.define("x", Cell::integer(10));

        assert_eq!(lookup(&"x".into(), &inner), Some(Cell::integer(10)));
        assert_eq!(lookup(&"x".into(), &outer), Some(Cell::integer(1)));
    }

    #[test]
    fn test_assign_overwrites_existing_binding() {
        let outer = Context::new(None);
        outer.define("x", Cell::integer(1));
        let inner = Context::new(Some(outer.clone()));

        assign(&"x".into(), &inner, Cell::integer(5));
        assert_eq!(outer.get(&"x".into()), Some(Cell::integer(5)));
        assert!(inner.get(&"x".into()).is_none());
    }

    #[test]
    fn test_assign_creates_in_scope() {
        let outer = Context::new(None);
        let inner = Context::new(Some(outer.clone()));
        assign(&"z".into(), &inner, Cell::integer(7));
        assert_eq!(inner.get(&"z".into()), Some(Cell::integer(7)));
        assert!(outer.get(&"z".into()).is_none());
    }

    #[test]
    fn test_bind_reports_index() {
        let ctx = Context::new(None);
        ctx.define("a", Cell::null());
        ctx.define("b", Cell::null());
        let b = bind(&"b".into(), &ctx).unwrap();
        assert_eq!(b.index, 1);
        b.set(Cell::integer(3));
        assert_eq!(ctx.get_index(1), Some(Cell::integer(3)));
    }

    #[test]
    fn test_frame_context_keys_line_up() {
        let keys: Vec<Symbol> = vec!["a".into(), "b".into()];
        let ctx = Context::for_frame(keys.iter(), FrameId(7));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.key_at(1), Some(Symbol::new("b")));
        assert_eq!(ctx.frame_id(), Some(FrameId(7)));
        assert!(ctx.get_index(0).is_some_and(|c| c.is_void()));
    }
}
