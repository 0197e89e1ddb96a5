//! What a dispatcher sees: one fulfilled frame, plus access to the
//! evaluator and to the feed the action was called from.

use std::any::Any;
use std::rc::Rc;

use crate::action::{Action, Bounce, ParamClass};
use crate::environment::Context;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::feed::Feed;
use crate::frame::{Frame, FrameFlags, FrameId};
use crate::value::{Cell, Series, Symbol, Value};

/// A dispatcher's view of its invocation.
pub struct Call<'a> {
    evaluator: &'a mut Evaluator,
    frame: &'a mut Frame,
    feed: &'a mut Feed,
}

impl<'a> Call<'a> {
    pub(crate) fn new(evaluator: &'a mut Evaluator, frame: &'a mut Frame, feed: &'a mut Feed) -> Self {
        Self {
            evaluator,
            frame,
            feed,
        }
    }

    /// The evaluator running this call.
    pub fn evaluator(&mut self) -> &mut Evaluator {
        &mut *self.evaluator
    }

    /// The frame being dispatched.
    pub fn frame(&self) -> &Frame {
        &*self.frame
    }

    /// The frame's identity.
    pub fn frame_id(&self) -> FrameId {
        self.frame.id()
    }

    /// The feed this action was invoked from.
    pub fn feed(&mut self) -> &mut Feed {
        &mut *self.feed
    }

    /// Scope of the caller's feed.
    pub fn scope(&self) -> Context {
        self.feed.scope().clone()
    }

    fn invocation(&self) -> Result<&crate::frame::Invocation, EvalError> {
        self.frame
            .invocation()
            .ok_or_else(|| EvalError::protocol("dispatch without an action frame"))
    }

    /// The running phase.
    pub fn phase(&self) -> Result<Rc<Action>, EvalError> {
        Ok(Rc::clone(&self.invocation()?.phase))
    }

    /// Binding the action was fetched with.
    pub fn binding(&self) -> Option<Context> {
        self.frame.invocation().and_then(|inv| inv.binding.clone())
    }

    /// Label for error messages.
    pub fn label(&self) -> String {
        self.frame.label_string()
    }

    /// Argument storage.
    pub fn varlist(&self) -> Result<Context, EvalError> {
        Ok(self.invocation()?.varlist.clone())
    }

    /// The phase's dispatcher-private payload, if it is a `T`.
    pub fn details<T: Any + Clone>(&self) -> Option<T> {
        self.frame
            .phase()
            .and_then(|phase| phase.details::<T>().cloned())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Arguments
    // ═══════════════════════════════════════════════════════════════════

    fn index_of(&self, name: &str) -> Result<usize, EvalError> {
        let inv = self.invocation()?;
        inv.phase
            .find_param(&Symbol::new(name))
            .ok_or_else(|| EvalError::protocol(format!("{} has no parameter {}", self.label(), name)))
    }

    /// The argument for parameter `name`.
    pub fn arg(&self, name: &str) -> Result<Cell, EvalError> {
        let index = self.index_of(name)?;
        Ok(self.invocation()?.varlist.get_index(index).unwrap_or_else(Cell::null))
    }

    /// Overwrite the argument for parameter `name`.
    pub fn set_arg(&self, name: &str, cell: Cell) -> Result<(), EvalError> {
        let index = self.index_of(name)?;
        self.invocation()?.varlist.set_index(index, cell);
        Ok(())
    }

    /// Whether refinement `name` was used.
    pub fn refinement(&self, name: &str) -> Result<bool, EvalError> {
        Ok(self.arg(name)?.is_truthy())
    }

    /// Integer argument, or a type error.
    pub fn integer(&self, name: &str) -> Result<i64, EvalError> {
        let cell = self.arg(name)?;
        cell.as_integer().ok_or_else(|| {
            EvalError::type_error(format!("{} expected integer! for {}, got {}", self.label(), name, cell.kind().name()))
        })
    }

    /// Array argument, or a type error.
    pub fn series(&self, name: &str) -> Result<Series, EvalError> {
        let cell = self.arg(name)?;
        cell.as_series().cloned().ok_or_else(|| {
            EvalError::type_error(format!("{} expected a block for {}, got {}", self.label(), name, cell.kind().name()))
        })
    }

    /// Pull one more evaluated value for variadic parameter `name`.
    ///
    /// Returns `None` at the end of the caller's input or at a barrier.
    pub fn take_vararg(&mut self, name: &str) -> Result<Option<Cell>, EvalError> {
        let index = self.index_of(name)?;
        let phase = self.phase()?;
        let param = &phase.params()[index];
        if param.class != ParamClass::Variadic {
            return Err(EvalError::protocol(format!("{} is not variadic", name)));
        }
        if self.evaluator.at_end_or_barrier(self.feed) {
            return Ok(None);
        }
        let mut sub = self
            .evaluator
            .new_frame(FrameFlags::FULFILLING_ARG)
            .gathering_for(self.label());
        self.evaluator.run_one_step(&mut sub, self.feed)?;
        if sub.out.is_stale() {
            return Ok(None);
        }
        let mut cell = sub.out;
        cell.clear(crate::value::CellFlags::STALE);
        if !param.types.accepts(&cell) {
            return Err(EvalError::ArgumentType {
                action: self.label(),
                param: param.symbol.clone(),
                kind: cell.kind().name(),
            });
        }
        Ok(Some(cell))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════════

    /// Evaluate a block to its last value (void if it produced nothing).
    pub fn do_series(&mut self, series: &Series) -> Result<Cell, EvalError> {
        let scope = series.scope().cloned().unwrap_or_else(|| self.scope());
        self.evaluator.do_series(series, &scope)
    }

    /// Run a branch: a block is evaluated, an action is called with
    /// `arg` (if it takes one).
    pub fn run_branch(&mut self, branch: &Cell, arg: Option<Cell>) -> Result<Cell, EvalError> {
        match branch.value() {
            Value::Block(series) => self.do_series(series),
            Value::Action(action) => {
                let args: Vec<Cell> = match action.action.first_unspecialized_param() {
                    Some(_) => arg.into_iter().collect(),
                    None => Vec::new(),
                };
                self.evaluator.call(action, &args)
            }
            _ => Err(EvalError::type_error(format!(
                "{} expected a block or action branch, got {}",
                self.label(),
                branch.kind().name()
            ))),
        }
    }

    /// Splice `series` into the caller's feed, ahead of its remaining input.
    pub fn splice(&mut self, series: &Series) {
        let scope = series.scope().cloned().unwrap_or_else(|| self.scope());
        self.feed.splice(series, scope);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Outputs and Redo
    // ═══════════════════════════════════════════════════════════════════

    /// Set an `<output>` parameter.
    pub fn set_output(&self, name: &str, cell: Cell) -> Result<(), EvalError> {
        self.set_arg(name, cell)
    }

    /// Retarget this frame to `phase` and ask for it to be dispatched.
    ///
    /// `phase` must share its parameter list with the action originally
    /// invoked. With `checked`, arguments are type-checked again first.
    pub fn redo_as(&mut self, phase: Rc<Action>, checked: bool) -> Result<Bounce, EvalError> {
        let label = self.label();
        let inv = self
            .frame
            .invocation_mut()
            .ok_or_else(|| EvalError::protocol("redo without an action frame"))?;
        if !phase.shares_params(&inv.original) {
            return Err(EvalError::protocol(format!(
                "redo target is not compatible with {}",
                label
            )));
        }
        inv.phase = phase;
        Ok(Bounce::Redo { checked })
    }
}
