//! Argument fulfillment
//!
//! Parameters are walked in layout order with the frame's lockstep cursor.
//! Refinements named at the call site sit on the data stack in mention
//! order; a refinement that comes up in layout order but was not the
//! earliest mentioned still-pending one is marked for later, and its
//! arguments are gathered in the pickup pass once layout order is done.
//! That is what makes `f/b/a x y` hand `x` to `/b` and `y` to `/a`.

use std::rc::Rc;

use tracing::trace;

use super::Evaluator;
use crate::action::{Action, ActionFlags, Param, ParamClass};
use crate::data_stack::StackMark;
use crate::environment;
use crate::error::EvalError;
use crate::feed::{Feed, FeedFlags};
use crate::frame::{Frame, FrameFlags};
use crate::value::{Cell, CellFlags, Symbol, Value};

/// What happens to the arguments after a refinement.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Gather them now
    Fill,
    /// Refinement not in use; they are null
    Unused,
    /// Refinement used, but mentioned after one still pending; pick up later
    Deferred,
}

fn specialized(phase: &Action, index: usize) -> Option<Cell> {
    phase.exemplar().and_then(|ex| ex.get(index).cloned().flatten())
}

impl Evaluator {
    /// Walk the parameters in layout order, filling the varlist.
    pub(crate) fn fulfill(&mut self, af: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        let (phase, varlist, base) = {
            let inv = af
                .invocation()
                .ok_or_else(|| EvalError::protocol("fulfill without an action frame"))?;
            (Rc::clone(&inv.phase), inv.varlist.clone(), inv.base)
        };

        let mut gate = Gate::Fill;
        let mut modal_switch = false;
        let mut left_pending = af.has(FrameFlags::RUNNING_ENFIX);

        for (index, param) in phase.params().iter().enumerate() {
            af.set_cursor(index);

            if let Some(cell) = specialized(&phase, index) {
                if param.class == ParamClass::Refinement {
                    gate = if cell.is_truthy() { Gate::Fill } else { Gate::Unused };
                }
                varlist.set_index(index, cell);
                continue;
            }

            match param.class {
                ParamClass::Local | ParamClass::Output => {
                    varlist.set_index(index, Cell::null());
                    continue;
                }
                ParamClass::Refinement => {
                    gate = if std::mem::take(&mut modal_switch) {
                        Gate::Fill
                    } else {
                        self.claim_refinement(base, &param.symbol, index)
                    };
                    let cell = if gate == Gate::Unused {
                        Cell::null()
                    } else {
                        Cell::logic(true)
                    };
                    varlist.set_index(index, cell);
                    continue;
                }
                _ => {}
            }

            match gate {
                Gate::Unused => {
                    varlist.set_index(index, Cell::null());
                    continue;
                }
                Gate::Deferred => continue,
                Gate::Fill => {}
            }

            let cell = if std::mem::take(&mut left_pending) {
                self.take_left(af, feed, param, &phase)?
            } else {
                self.fulfill_arg(af, feed, index, param, &mut modal_switch)?
            };
            trace!(param = %param.symbol, arg = %cell, "fulfilled");
            varlist.set_index(index, cell);
        }
        Ok(())
    }

    /// Decide a refinement's gate from the call-site refinements pushed
    /// since `base`.
    fn claim_refinement(&mut self, base: StackMark, symbol: &Symbol, index: usize) -> Gate {
        let Some(position) = self.stack.find_refinement(base, symbol) else {
            return Gate::Unused;
        };
        let in_order = self.stack.first_unfulfilled(base) == Some(position);
        if let Some(pending) = self.stack.refinement_mut(position) {
            pending.slot = Some(index);
            if in_order {
                pending.fulfilled = true;
            }
        }
        if in_order {
            Gate::Fill
        } else {
            Gate::Deferred
        }
    }

    /// Gather the arguments of refinements that were named out of layout
    /// order, in the order they were named.
    pub(crate) fn pickups(&mut self, af: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        let (phase, varlist, base) = {
            let inv = af
                .invocation()
                .ok_or_else(|| EvalError::protocol("pickups without an action frame"))?;
            (Rc::clone(&inv.phase), inv.varlist.clone(), inv.base)
        };

        let pending = self.stack.refinements_since(base);
        if let Some(unknown) = pending.iter().find(|r| r.slot.is_none()) {
            return Err(EvalError::BadRefinement {
                action: af.label_string(),
                refinement: unknown.symbol.clone(),
            });
        }

        let params = phase.params();
        for refinement in pending.iter().filter(|r| !r.fulfilled) {
            let Some(slot) = refinement.slot else {
                continue;
            };
            trace!(refinement = %refinement.symbol, "pickup");
            let mut modal_switch = false;
            for (index, param) in params.iter().enumerate().skip(slot + 1) {
                if param.class == ParamClass::Refinement {
                    break;
                }
                if param.is_hidden_class() || phase.is_specialized(index) {
                    continue;
                }
                af.set_cursor(index);
                let cell = self.fulfill_arg(af, feed, index, param, &mut modal_switch)?;
                varlist.set_index(index, cell);
            }
        }

        self.stack.unwind_to(base);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Single Arguments
    // ═══════════════════════════════════════════════════════════════════

    /// The left argument of an enfix call, already sitting in `af.out`.
    fn take_left(&self, af: &Frame, feed: &mut Feed, param: &Param, phase: &Action) -> Result<Cell, EvalError> {
        // Deferring operators already waited for the whole left expression.
        if !phase.has(ActionFlags::DEFERS_LOOKBACK) && !phase.has(ActionFlags::POSTPONES_ENTIRELY) {
            feed.set(FeedFlags::NO_LOOKAHEAD);
        }

        if af.out.is_stale() {
            return self.end_arg(af, param);
        }
        let mut cell = af.out.clone();
        cell.clear(CellFlags::STALE | CellFlags::CHECKED);
        Ok(cell)
    }

    /// What a parameter gets at the end of input (or at a barrier).
    fn end_arg(&self, af: &Frame, param: &Param) -> Result<Cell, EvalError> {
        if param.types.is_endable() {
            return Ok(Cell::null().flagged(CellFlags::CHECKED));
        }
        Err(EvalError::MissingArgument {
            action: af.label_string(),
            param: param.symbol.clone(),
        })
    }

    /// Gather one argument from the feed according to its class.
    pub(crate) fn fulfill_arg(
        &mut self,
        af: &mut Frame,
        feed: &mut Feed,
        index: usize,
        param: &Param,
        modal_switch: &mut bool,
    ) -> Result<Cell, EvalError> {
        if param.class == ParamClass::Variadic {
            return Ok(Cell::new(Value::Varargs(index)));
        }
        if self.at_end_or_barrier(feed) {
            return self.end_arg(af, param);
        }

        match param.class {
            ParamClass::Modal => {
                let is_sym = matches!(
                    feed.current().map(Cell::value),
                    Some(Value::SymWord(_) | Value::SymGroup(_))
                );
                if !is_sym {
                    return self.eval_arg(af, feed, param);
                }
                let (cell, scope) = feed
                    .fetch()
                    .ok_or_else(|| EvalError::protocol("modal argument vanished"))?;
                *modal_switch = true;
                self.eval_escapable(&cell, &scope)
            }

            ParamClass::HardQuote => {
                let Some((current, scope)) = feed.upcoming(0).map(|(c, s)| (c.clone(), s.clone())) else {
                    return self.end_arg(af, param);
                };
                if param.types.is_skippable() && !param.types.accepts(&current) {
                    return Ok(Cell::null().flagged(CellFlags::CHECKED));
                }
                feed.fetch();
                Ok(current.derelativize(&scope).flagged(CellFlags::UNEVALUATED))
            }

            ParamClass::SoftQuote => {
                // An enfix operator that quotes leftward gets the cell.
                let next_quotes_left = feed.upcoming(1).is_some_and(|(cell, scope)| match cell.value() {
                    Value::Word(symbol) => environment::lookup(symbol, scope)
                        .and_then(|found| found.as_action().map(|a| Rc::clone(&a.action)))
                        .is_some_and(|a| a.has(ActionFlags::ENFIXED) && a.has(ActionFlags::QUOTES_FIRST)),
                    _ => false,
                });
                if next_quotes_left {
                    return self.eval_arg(af, feed, param);
                }
                let (cell, scope) = feed
                    .fetch()
                    .ok_or_else(|| EvalError::protocol("soft-quoted argument vanished"))?;
                if cell.is_escapable() {
                    af.spare = self.eval_escapable(&cell, &scope)?;
                    return Ok(std::mem::replace(&mut af.spare, Cell::fresh()));
                }
                Ok(cell.derelativize(&scope).flagged(CellFlags::UNEVALUATED))
            }

            _ => self.eval_arg(af, feed, param),
        }
    }

    /// Evaluate one argument in a subframe of its own.
    fn eval_arg(&mut self, af: &mut Frame, feed: &mut Feed, param: &Param) -> Result<Cell, EvalError> {
        let flags = self.arg_frame_flags(af);
        let mut sub = self.new_frame(flags).gathering_for(af.label_string());
        self.run_one_step(&mut sub, feed)?;
        if sub.out.is_stale() {
            return self.end_arg(af, param);
        }
        let mut cell = sub.out;
        cell.clear(CellFlags::STALE | CellFlags::CHECKED);
        Ok(cell)
    }
}
