//! One evaluation step
//!
//! ```text
//!   Start ──fetch/dispatch──▶ Lookahead ──enfix loop──▶ Finished
//!     ▲                                                    │
//!     └──── invisible step, and the frame may not vanish ──┘
//! ```

use tracing::trace;

use super::{plain, Evaluator};
use crate::action::ActionFlags;
use crate::environment::Context;
use crate::error::EvalError;
use crate::feed::Feed;
use crate::frame::{Frame, FrameFlags, StepState};
use crate::value::{Cell, CellFlags, Series, Value};

/// Remaining stack below which a step moves to a fresh segment. It must
/// cover the deepest native recursion between two steps.
const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each fresh stack segment.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

impl Evaluator {
    /// Evaluate one expression from `feed` into `frame.out`.
    ///
    /// If the step turns out to be invisible, `frame.out` keeps whatever it
    /// held before, now marked stale. A frame that is gathering an argument
    /// (or that carries `NO_INVISIBLE`) keeps stepping past invisibles until
    /// something is produced or the input runs out.
    pub fn run_one_step(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.step(frame, feed))
    }

    fn step(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        frame.state = StepState::Start;
        loop {
            match frame.state {
                StepState::Start => {
                    self.tick()?;
                    frame.out.mark_stale();
                    if feed.is_end() {
                        frame.state = StepState::Finished;
                    } else if self.backward_quote(frame, feed)? {
                        frame.state = StepState::Lookahead;
                    } else {
                        frame.state = self.evaluate_current(frame, feed)?;
                    }
                }
                StepState::Lookahead => {
                    self.lookahead(frame, feed)?;
                    frame.state = StepState::Finished;
                }
                StepState::Finished => {
                    let must_produce = frame.has(FrameFlags::FULFILLING_ARG) || frame.has(FrameFlags::NO_INVISIBLE);
                    if frame.out.is_stale() && must_produce && !self.at_end_or_barrier(feed) {
                        frame.state = StepState::Start;
                        continue;
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Fetch the current cell and do what its kind says.
    fn evaluate_current(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<StepState, EvalError> {
        let cached = feed.take_gotten();
        let (cell, scope) = feed
            .fetch()
            .ok_or_else(|| EvalError::protocol("step started at end of input"))?;
        if self.ctx.trace {
            trace!(tick = self.tick, kind = cell.kind().name(), cell = %cell, "step");
        }

        match cell.value() {
            Value::Word(symbol) => {
                let looked_up = match cached {
                    Some(found) => found,
                    None => self.lookup(symbol, &scope)?,
                };
                if let Some(action) = looked_up.as_action() {
                    let action = action.clone();
                    let enfix = action.action.has(ActionFlags::ENFIXED);
                    let base = self.stack.mark();
                    self.run_action(frame, feed, &action, Some(symbol.clone()), enfix, base)?;
                    return Ok(StepState::Lookahead);
                }
                if looked_up.is_void() {
                    return Err(EvalError::NoValue { name: symbol.clone() });
                }
                frame.out = plain(looked_up);
            }

            Value::GetWord(symbol) | Value::SymWord(symbol) => {
                frame.out = plain(self.lookup(symbol, &scope)?);
            }

            Value::SetWord(symbol) => {
                self.eval_set_word(frame, feed, symbol, &scope)?;
                return Ok(StepState::Finished);
            }

            Value::SetPath(series) => {
                self.eval_set_path(frame, feed, series, &scope)?;
                return Ok(StepState::Finished);
            }

            Value::SetBlock(series) => {
                self.eval_set_block(frame, feed, series, &scope)?;
                return Ok(StepState::Finished);
            }

            Value::Path(series) => {
                self.eval_path(frame, feed, series, &scope)?;
            }

            Value::GetPath(series) => {
                frame.out = plain(self.get_path(series, &scope)?);
            }

            Value::Group(series) | Value::SymGroup(series) => {
                if let Some(produced) = self.eval_group(series, &scope)? {
                    frame.out = produced;
                }
            }

            Value::Quoted(inner) => {
                let mut unquoted = inner.derelativize(&scope);
                unquoted.clear(CellFlags::UNEVALUATED | CellFlags::CHECKED | CellFlags::STALE);
                frame.out = unquoted;
            }

            Value::Action(action) => {
                let action = action.clone();
                let enfix = action.action.has(ActionFlags::ENFIXED);
                let base = self.stack.mark();
                let label = action.action.name().cloned();
                self.run_action(frame, feed, &action, label, enfix, base)?;
            }

            _ => {
                frame.out = plain(cell.derelativize(&scope)).flagged(CellFlags::UNEVALUATED);
            }
        }
        Ok(StepState::Lookahead)
    }

    /// Run a group's contents in a frame of its own. `None` if every step
    /// in it was invisible.
    pub(crate) fn eval_group(&mut self, series: &Series, scope: &Context) -> Result<Option<Cell>, EvalError> {
        let inner_scope = series.scope().cloned().unwrap_or_else(|| scope.clone());
        let mut inner = Feed::new(series, inner_scope);
        let mut sub = self.new_frame(FrameFlags::empty());
        if self.run_to_end(&mut sub, &mut inner)? {
            Ok(Some(plain(sub.out)))
        } else {
            Ok(None)
        }
    }

    /// Evaluate a cell that a soft-quoted parameter lets escape (group,
    /// get-word, get-path), or the plain form of a sym-word or sym-group.
    pub(crate) fn eval_escapable(&mut self, cell: &Cell, scope: &Context) -> Result<Cell, EvalError> {
        match cell.value() {
            Value::Group(series) | Value::SymGroup(series) => {
                Ok(self.eval_group(series, scope)?.unwrap_or_else(Cell::null))
            }
            Value::GetWord(symbol) | Value::SymWord(symbol) => Ok(plain(self.lookup(symbol, scope)?)),
            Value::GetPath(series) => Ok(plain(self.get_path(series, scope)?)),
            _ => Err(EvalError::protocol(format!("{} is not an escapable form", cell))),
        }
    }
}
