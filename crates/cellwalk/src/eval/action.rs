//! The invocation engine: drive an action frame from fulfillment to result

use std::rc::Rc;

use tracing::debug;

use super::{plain, Evaluator};
use crate::action::{ActionFlags, Bounce, ParamClass};
use crate::call::Call;
use crate::data_stack::StackMark;
use crate::error::{EvalError, Throw, ThrowLabel};
use crate::feed::{Feed, FeedFlags};
use crate::frame::{ActionState, Frame, FrameFlags};
use crate::value::{ActionValue, Cell, Symbol};

impl Evaluator {
    /// Invoke `action` from `frame`, whose output (if not stale) is the
    /// left argument of an enfix call. `base` is the data stack height
    /// before any call-site refinements were pushed.
    pub(crate) fn run_action(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        action: &ActionValue,
        label: Option<Symbol>,
        enfix: bool,
        base: StackMark,
    ) -> Result<(), EvalError> {
        let mut flags = FrameFlags::empty();
        if enfix {
            flags |= FrameFlags::RUNNING_ENFIX;
        } else {
            feed.clear(FeedFlags::NO_LOOKAHEAD);
        }
        if frame.has(FrameFlags::WANTS_OUTPUTS) {
            flags |= FrameFlags::WANTS_OUTPUTS;
            frame.flags.remove(FrameFlags::WANTS_OUTPUTS);
        }

        let mut af = self.new_frame(flags);
        af.out = std::mem::replace(&mut frame.out, Cell::fresh());
        af.begin_action(Rc::clone(&action.action), action.binding.clone(), label, base);
        let result = self.invoke_action(&mut af, feed);
        frame.out = af.out;
        result
    }

    /// Drive a frame set up with [`Frame::begin_action`] through
    /// fulfillment, type checking and dispatch.
    ///
    /// On success `af.out` holds the result, or is left stale if the action
    /// was invisible. Whatever happens, the data stack is back at the
    /// frame's base afterwards (plus its `<output>` values, if asked for).
    pub fn invoke_action(&mut self, af: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        let base = af
            .invocation()
            .map(|inv| inv.base)
            .ok_or_else(|| EvalError::protocol("invoke without an action frame"))?;
        if let Err(e) = self.enter_call() {
            self.stack.unwind_to(base);
            return Err(e);
        }
        debug!(action = %af.label_string(), depth = self.depth, "invoke");

        let result = match self.drive(af, feed) {
            Err(EvalError::Thrown(Throw {
                label: ThrowLabel::Unwind(target),
                payload,
            })) if target == af.id() => {
                debug!(action = %af.label_string(), "unwound by return");
                self.check_return(af, &payload).map(|()| {
                    af.out = plain(payload);
                })
            }
            other => other,
        };

        self.exit_call();
        self.stack.unwind_to(base);
        if result.is_ok() && af.has(FrameFlags::WANTS_OUTPUTS) {
            self.push_outputs(af);
        }
        result
    }

    fn drive(&mut self, af: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        loop {
            let state = af
                .invocation()
                .map(|inv| inv.state)
                .ok_or_else(|| EvalError::protocol("action frame lost its invocation"))?;
            let next = match state {
                ActionState::Fulfill => {
                    self.fulfill(af, feed)?;
                    ActionState::Pickups
                }
                ActionState::Pickups => {
                    self.pickups(af, feed)?;
                    if let Some(hook) = self.hook.clone() {
                        hook(af)?;
                    }
                    ActionState::Typecheck
                }
                ActionState::Typecheck => {
                    self.typecheck(af)?;
                    ActionState::Dispatch
                }
                ActionState::Dispatch => self.dispatch(af, feed)?,
                ActionState::Done => return Ok(()),
            };
            if let Some(inv) = af.invocation_mut() {
                inv.state = next;
            }
        }
    }

    fn dispatch(&mut self, af: &mut Frame, feed: &mut Feed) -> Result<ActionState, EvalError> {
        let phase = af
            .phase()
            .cloned()
            .ok_or_else(|| EvalError::protocol("dispatch without a phase"))?;
        let dispatcher = Rc::clone(phase.dispatcher());

        feed.invalidate_gotten();
        let bounce = {
            let mut call = Call::new(self, af, feed);
            dispatcher(&mut call)
        };
        feed.invalidate_gotten();

        match bounce {
            Ok(Bounce::Value(cell)) => {
                self.check_return(af, &cell)?;
                af.out = plain(cell);
                Ok(ActionState::Done)
            }
            Ok(Bounce::Invisible) => Ok(ActionState::Done),
            Ok(Bounce::Redo { checked }) => {
                debug!(action = %af.label_string(), checked, "redo");
                Ok(redo_state(checked))
            }
            Err(EvalError::Thrown(Throw {
                label: ThrowLabel::Redo {
                    frame,
                    phase,
                    checked,
                },
                ..
            })) if frame == af.id() => {
                if let Some(phase) = phase {
                    let label = af.label_string();
                    let inv = af
                        .invocation_mut()
                        .ok_or_else(|| EvalError::protocol("redo without an action frame"))?;
                    if !phase.shares_params(&inv.original) {
                        return Err(EvalError::protocol(format!(
                            "redo target is not compatible with {}",
                            label
                        )));
                    }
                    inv.phase = phase;
                }
                debug!(action = %af.label_string(), checked, "redo by throw");
                Ok(redo_state(checked))
            }
            Err(e) => Err(e),
        }
    }

    fn check_return(&self, af: &Frame, cell: &Cell) -> Result<(), EvalError> {
        let Some(original) = af.invocation().map(|inv| &inv.original) else {
            return Ok(());
        };
        match original.returns() {
            Some(types) if !types.accepts(cell) => Err(EvalError::ReturnType {
                action: af.label_string(),
                kind: cell.kind().name(),
            }),
            _ => Ok(()),
        }
    }

    /// Report `<output>` parameters, in layout order, on the data stack.
    fn push_outputs(&mut self, af: &Frame) {
        let Some(inv) = af.invocation() else {
            return;
        };
        for (index, param) in inv.original.params().iter().enumerate() {
            if param.class == ParamClass::Output {
                let value = inv.varlist.get_index(index).unwrap_or_else(Cell::null);
                self.stack.push(plain(value));
            }
        }
    }

    /// Whether an action forbids deferred enfix inside its arguments.
    pub(crate) fn arg_frame_flags(&self, af: &Frame) -> FrameFlags {
        let strict = af
            .phase()
            .is_some_and(|phase| phase.has(ActionFlags::ERROR_ON_DEFERRED_ENFIX));
        if strict {
            FrameFlags::FULFILLING_ARG | FrameFlags::ERROR_ON_DEFERRED_ENFIX
        } else {
            FrameFlags::FULFILLING_ARG
        }
    }
}

fn redo_state(checked: bool) -> ActionState {
    if checked {
        ActionState::Typecheck
    } else {
        ActionState::Dispatch
    }
}
