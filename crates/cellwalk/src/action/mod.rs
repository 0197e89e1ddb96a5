//! Actions: parameter lists plus the dispatcher that implements them
//!
//! An [`Action`] is built once (by a native registration, `func`, or a host)
//! and is immutable afterwards. Behavior flags like `ENFIXED` are changed by
//! making a copy that shares the same parameter list, which is also what
//! makes two actions compatible for a redo.

mod spec;

pub use spec::{parse_spec, ParamSpec};

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::call::Call;
use crate::error::EvalError;
use crate::value::{Cell, Symbol, TypeSet};

/// How a parameter captures its argument at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Evaluate one expression from the feed (`arg`)
    Normal,
    /// Take the next cell literally (`:arg`)
    HardQuote,
    /// Take the next cell literally unless it is an escaping form (`'arg`)
    SoftQuote,
    /// Normal, or `@form` which also switches on the next refinement (`@arg`)
    Modal,
    /// Pull values from the feed on demand during dispatch (`<...>`)
    Variadic,
    /// Not supplied by the caller; written by the dispatcher (`<output>`)
    Output,
    /// Not supplied by the caller; scratch space (`<local>`)
    Local,
    /// Optional named switch gating the parameters after it (`/ref`)
    Refinement,
}

/// One formal parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name
    pub symbol: Symbol,
    /// Capture convention
    pub class: ParamClass,
    /// Accepted kinds and conventions
    pub types: TypeSet,
}

impl Param {
    /// Create a parameter.
    pub fn new(symbol: impl Into<Symbol>, class: ParamClass, types: TypeSet) -> Self {
        Self {
            symbol: symbol.into(),
            class,
            types,
        }
    }

    /// Whether callers never supply this parameter.
    pub fn is_hidden_class(&self) -> bool {
        matches!(self.class, ParamClass::Local | ParamClass::Output)
    }

    /// Whether the parameter takes its argument literally.
    pub fn is_quoting(&self) -> bool {
        matches!(self.class, ParamClass::HardQuote | ParamClass::SoftQuote)
    }
}

bitflags! {
    /// Behavior flags consulted by the evaluator when an action is fetched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionFlags: u16 {
        /// Takes its first argument from the value on its left.
        const ENFIXED = 1 << 0;
        /// First unspecialized parameter is hard or soft quoted.
        const QUOTES_FIRST = 1 << 1;
        /// While an argument is being gathered, lets that argument finish
        /// first (once) before running on it: `if x [a] else [b]`.
        const DEFERS_LOOKBACK = 1 << 2;
        /// Waits for the whole enclosing expression, not just one argument.
        const POSTPONES_ENTIRELY = 1 << 3;
        /// First unspecialized parameter is `<skip>`-able.
        const SKIPPABLE_FIRST = 1 << 4;
        /// Acts as end of input for argument gathering.
        const IS_BARRIER = 1 << 5;
        /// Implemented in Rust rather than interpreted.
        const IS_NATIVE = 1 << 6;
        /// A deferred enfix operator splitting this action's argument is an
        /// error rather than a silent reinterpretation.
        const ERROR_ON_DEFERRED_ENFIX = 1 << 7;
    }
}

/// What a dispatcher hands back to the invocation engine.
#[derive(Debug, Clone)]
pub enum Bounce {
    /// A produced value
    Value(Cell),
    /// Nothing: leave the output exactly as it was found
    Invisible,
    /// Run again with the (already retargeted) phase, optionally repeating
    /// the type check pass
    Redo {
        /// Whether arguments are type-checked again before dispatch
        checked: bool,
    },
}

/// Behavior callback implementing an action.
pub type Dispatcher = Rc<dyn Fn(&mut Call<'_>) -> Result<Bounce, EvalError>>;

/// Wrap a function or closure as a [`Dispatcher`].
pub fn dispatcher<F>(f: F) -> Dispatcher
where
    F: Fn(&mut Call<'_>) -> Result<Bounce, EvalError> + 'static,
{
    Rc::new(f)
}

/// An invocable entity: parameter list + dispatcher.
#[derive(Clone)]
pub struct Action {
    params: Rc<[Param]>,
    dispatcher: Dispatcher,
    details: Option<Rc<dyn Any>>,
    exemplar: Option<Rc<[Option<Cell>]>>,
    flags: ActionFlags,
    returns: Option<TypeSet>,
    name: Option<Symbol>,
}

impl Action {
    /// Create an action from its parameters and dispatcher.
    pub fn new(params: Vec<Param>, dispatcher: Dispatcher) -> Self {
        let mut action = Self {
            params: Rc::from(params),
            dispatcher,
            details: None,
            exemplar: None,
            flags: ActionFlags::empty(),
            returns: None,
            name: None,
        };
        action.recompute_first_param_flags();
        action
    }

    /// Create an action from a parsed spec.
    pub fn from_spec(spec: ParamSpec, dispatcher: Dispatcher) -> Self {
        let mut action = Self::new(spec.params, dispatcher);
        action.returns = spec.returns;
        action
    }

    /// A new action sharing this one's parameter list (and so compatible
    /// with it for redo), but with its own dispatcher.
    pub fn derive(&self, dispatcher: Dispatcher) -> Self {
        Self {
            params: Rc::clone(&self.params),
            dispatcher,
            details: None,
            exemplar: self.exemplar.clone(),
            flags: self.flags - ActionFlags::IS_NATIVE,
            returns: self.returns,
            name: self.name.clone(),
        }
    }

    /// Builder: set the label used in errors and display.
    pub fn with_name(mut self, name: impl Into<Symbol>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: add behavior flags.
    pub fn with_flags(mut self, flags: ActionFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Builder: attach the dispatcher-private payload.
    pub fn with_details<T: Any>(mut self, details: T) -> Self {
        self.details = Some(Rc::new(details));
        self
    }

    /// Builder: constrain the result.
    pub fn with_returns(mut self, returns: TypeSet) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Builder: pre-fill arguments. `Some` slots become hidden from callers.
    pub fn with_exemplar(mut self, exemplar: Vec<Option<Cell>>) -> Self {
        debug_assert_eq!(exemplar.len(), self.params.len());
        self.exemplar = Some(Rc::from(exemplar));
        self.recompute_first_param_flags();
        self
    }

    /// A copy of this action that is enfixed.
    pub fn enfixed(&self) -> Self {
        let mut copy = self.clone();
        copy.flags |= ActionFlags::ENFIXED;
        copy
    }

    fn recompute_first_param_flags(&mut self) {
        let (quotes, skippable) = match self.first_unspecialized_param() {
            Some((_, param)) => (param.is_quoting(), param.types.is_skippable()),
            None => (false, false),
        };
        self.flags -= ActionFlags::QUOTES_FIRST | ActionFlags::SKIPPABLE_FIRST;
        if quotes {
            self.flags |= ActionFlags::QUOTES_FIRST;
        }
        if skippable {
            self.flags |= ActionFlags::SKIPPABLE_FIRST;
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════

    /// The parameter list.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether two actions share parameter-list identity.
    pub fn shares_params(&self, other: &Action) -> bool {
        Rc::ptr_eq(&self.params, &other.params)
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The dispatcher-private payload, if it is a `T`.
    pub fn details<T: Any>(&self) -> Option<&T> {
        self.details.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    /// The exemplar, if any.
    pub fn exemplar(&self) -> Option<&[Option<Cell>]> {
        self.exemplar.as_deref()
    }

    /// Behavior flags.
    pub fn flags(&self) -> ActionFlags {
        self.flags
    }

    /// Whether a behavior flag is set.
    pub fn has(&self, flag: ActionFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Return type constraint, if declared.
    pub fn returns(&self) -> Option<TypeSet> {
        self.returns
    }

    /// The action's label, if it has one.
    pub fn name(&self) -> Option<&Symbol> {
        self.name.as_ref()
    }

    /// Index of a parameter by name.
    pub fn find_param(&self, symbol: &Symbol) -> Option<usize> {
        self.params.iter().position(|p| &p.symbol == symbol)
    }

    /// Whether the exemplar fills the parameter at `index`.
    pub fn is_specialized(&self, index: usize) -> bool {
        self.exemplar
            .as_ref()
            .is_some_and(|ex| ex.get(index).is_some_and(|slot| slot.is_some()))
    }

    /// The first parameter a caller actually supplies.
    pub fn first_unspecialized_param(&self) -> Option<(usize, &Param)> {
        self.params.iter().enumerate().find(|(i, p)| {
            !p.is_hidden_class() && p.class != ParamClass::Refinement && !self.is_specialized(*i)
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|p| p.symbol.as_str()).collect();
        write!(
            f,
            "Action({}, {:?}, {:?})",
            self.name.as_ref().map(|n| n.as_str()).unwrap_or("<anonymous>"),
            params,
            self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeFlags;

    fn noop() -> Dispatcher {
        dispatcher(|_call| Ok(Bounce::Invisible))
    }

    #[test]
    fn test_quotes_first_is_computed() {
        let action = Action::new(
            vec![Param::new("x", ParamClass::HardQuote, TypeSet::any_value())],
            noop(),
        );
        assert!(action.has(ActionFlags::QUOTES_FIRST));
        assert!(!action.has(ActionFlags::SKIPPABLE_FIRST));
    }

    #[test]
    fn test_skippable_first_is_computed() {
        let types = TypeSet::any_value().with_flags(TypeFlags::SKIPPABLE);
        let action = Action::new(
            vec![Param::new("x", ParamClass::HardQuote, types)],
            noop(),
        );
        assert!(action.has(ActionFlags::SKIPPABLE_FIRST));
    }

    #[test]
    fn test_specialized_first_param_is_skipped() {
        let action = Action::new(
            vec![
                Param::new("a", ParamClass::HardQuote, TypeSet::any_value()),
                Param::new("b", ParamClass::Normal, TypeSet::any_value()),
            ],
            noop(),
        )
        .with_exemplar(vec![Some(Cell::integer(1)), None]);
        assert!(!action.has(ActionFlags::QUOTES_FIRST));
        assert_eq!(action.first_unspecialized_param().map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_enfixed_copy_shares_params() {
        let action = Action::new(
            vec![Param::new("a", ParamClass::Normal, TypeSet::any_value())],
            noop(),
        );
        let enfixed = action.enfixed();
        assert!(enfixed.has(ActionFlags::ENFIXED));
        assert!(!action.has(ActionFlags::ENFIXED));
        assert!(enfixed.shares_params(&action));
    }

    #[test]
    fn test_details_downcast() {
        let action = Action::new(vec![], noop()).with_details(42_u32);
        assert_eq!(action.details::<u32>(), Some(&42));
        assert_eq!(action.details::<String>(), None);
    }
}
