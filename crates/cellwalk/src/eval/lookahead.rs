//! Enfix lookahead and backward quoting
//!
//! After a step produces a value, the word to its right may be bound to an
//! enfix action wanting that value as its left argument. Whether it gets it
//! now, later, or never depends on the operator's flags and on the feed's
//! `NO_LOOKAHEAD` / `DEFERRING_ENFIX` flags, which nested argument frames
//! use to pass the decision up to whichever frame should run the operator:
//!
//! ```text
//!   1 + 2 * 3          ; `*` waits for `+` to finish: 9
//!   if false [2] else [3]   ; `else` waits for all of `if`: 3
//! ```

use std::rc::Rc;

use tracing::debug;

use super::Evaluator;
use crate::action::{ActionFlags, ParamClass};
use crate::environment::{self, Context};
use crate::error::EvalError;
use crate::feed::{Feed, FeedFlags};
use crate::frame::{Frame, FrameFlags};
use crate::value::{ActionValue, Cell, CellFlags, Symbol, Value};

impl Evaluator {
    // ═══════════════════════════════════════════════════════════════════
    // Peeking at Upcoming Words
    // ═══════════════════════════════════════════════════════════════════

    /// What the current cell looks up to, if it is a bound word. The result
    /// is cached on the feed until the next fetch.
    pub(crate) fn peek_gotten(&self, feed: &mut Feed) -> Option<Cell> {
        if let Some(found) = feed.gotten() {
            return Some(found.clone());
        }
        let (symbol, scope) = match feed.upcoming(0) {
            Some((cell, scope)) => match cell.value() {
                Value::Word(symbol) => (symbol.clone(), scope.clone()),
                _ => return None,
            },
            None => return None,
        };
        let found = environment::lookup(&symbol, &scope)?;
        feed.set_gotten(found.clone());
        Some(found)
    }

    fn peek_action(&self, feed: &mut Feed) -> Option<ActionValue> {
        self.peek_gotten(feed)?.as_action().cloned()
    }

    /// The action the cell after the current one looks up to, if any.
    fn action_after(&self, feed: &Feed) -> Option<ActionValue> {
        let (cell, scope) = feed.upcoming(1)?;
        match cell.value() {
            Value::Word(symbol) => environment::lookup(symbol, scope)?.as_action().cloned(),
            _ => None,
        }
    }

    /// Whether argument gathering must stop here: end of input, or a cell
    /// naming a barrier action.
    pub(crate) fn at_end_or_barrier(&self, feed: &mut Feed) -> bool {
        let literal = match feed.current() {
            None => return true,
            Some(cell) => match cell.value() {
                Value::Action(action) => Some(action.action.has(ActionFlags::IS_BARRIER)),
                Value::Word(_) => None,
                _ => Some(false),
            },
        };
        match literal {
            Some(is_barrier) => is_barrier,
            None => self
                .peek_action(feed)
                .is_some_and(|a| a.action.has(ActionFlags::IS_BARRIER)),
        }
    }

    /// Whether `cell` is a word or path whose head looks up to an action.
    fn names_action(&self, cell: &Cell, scope: &Context) -> bool {
        let head = match cell.value() {
            Value::Word(symbol) => symbol.clone(),
            Value::Path(series) => match series.cells().first().map(Cell::value) {
                Some(Value::Word(symbol)) => symbol.clone(),
                _ => return false,
            },
            _ => return false,
        };
        environment::lookup(&head, scope).is_some_and(|found| found.as_action().is_some())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Backward Quoting
    // ═══════════════════════════════════════════════════════════════════

    /// Before the current cell is evaluated, give an enfix operator after
    /// it the chance to quote it. Returns true if the operator ran.
    pub(crate) fn backward_quote(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<bool, EvalError> {
        let Some(enfix) = self.action_after(feed) else {
            return Ok(false);
        };
        let action = Rc::clone(&enfix.action);
        if !action.has(ActionFlags::ENFIXED) || !action.has(ActionFlags::QUOTES_FIRST) {
            return Ok(false);
        }
        let Some((current, current_scope)) = feed.upcoming(0).map(|(c, s)| (c.clone(), s.clone())) else {
            return Ok(false);
        };

        // A prefix action that itself quotes rightward wins the cell.
        if matches!(current.value(), Value::Word(_)) {
            if let Some(left) = self.peek_action(feed) {
                if !left.action.has(ActionFlags::ENFIXED) && left.action.has(ActionFlags::QUOTES_FIRST) {
                    return Ok(false);
                }
            }
        }

        // Operator last in the input, after something that will run:
        // let that run and take the operator as its argument.
        let operator_is_last = feed.upcoming(2).is_none();
        if operator_is_last && self.names_action(&current, &current_scope) {
            return Ok(false);
        }

        let Some((_, first)) = action.first_unspecialized_param() else {
            return Ok(false);
        };
        let (class, types) = (first.class, first.types);

        if action.has(ActionFlags::SKIPPABLE_FIRST) && !types.accepts(&current) {
            return Ok(false);
        }
        if action.has(ActionFlags::POSTPONES_ENTIRELY) && frame.has(FrameFlags::FULFILLING_ARG) {
            return Ok(false);
        }

        let (cell, scope) = feed
            .fetch()
            .ok_or_else(|| EvalError::protocol("backward quote lost its left cell"))?;
        frame.out = if class == ParamClass::SoftQuote && cell.is_escapable() {
            self.eval_escapable(&cell, &scope)?
        } else {
            cell.derelativize(&scope).flagged(CellFlags::UNEVALUATED)
        };

        let (operator, _) = feed
            .fetch()
            .ok_or_else(|| EvalError::protocol("backward quote lost its operator"))?;
        debug!(operator = %operator, quoted = %frame.out, "backward quote");
        let base = self.stack.mark();
        self.run_action(frame, feed, &enfix, operator.as_symbol().cloned(), true, base)?;
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookahead
    // ═══════════════════════════════════════════════════════════════════

    /// Run enfix operators to the right of the value in `frame.out` for as
    /// long as they belong to this frame.
    pub(crate) fn lookahead(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<(), EvalError> {
        loop {
            if !matches!(feed.current().map(Cell::value), Some(Value::Word(_))) {
                feed.clear(FeedFlags::NO_LOOKAHEAD);
                return Ok(());
            }
            let Some(enfix) = self
                .peek_action(feed)
                .filter(|a| a.action.has(ActionFlags::ENFIXED))
            else {
                feed.clear(FeedFlags::NO_LOOKAHEAD);
                return Ok(());
            };
            let action = Rc::clone(&enfix.action);

            let fulfilling = frame.has(FrameFlags::FULFILLING_ARG);

            // Left-quoting operators were offered the cell before it ran. One
            // that declined it has nothing left to quote but a result.
            if action.has(ActionFlags::QUOTES_FIRST) {
                let postponed = fulfilling && action.has(ActionFlags::POSTPONES_ENTIRELY);
                if frame.out.is_stale() || postponed {
                    return Ok(());
                }
                return Err(EvalError::EvaluativeQuote {
                    action: operator_name(feed).to_string(),
                });
            }

            // An enfix operator just took our left tightly: the one after it
            // belongs to whoever is waiting on that operator's result.
            if fulfilling && !action.has(ActionFlags::DEFERS_LOOKBACK) && feed.has(FeedFlags::NO_LOOKAHEAD) {
                feed.clear(FeedFlags::NO_LOOKAHEAD);
                feed.set(FeedFlags::DEFERRING_ENFIX);
                return Ok(());
            }
            feed.clear(FeedFlags::NO_LOOKAHEAD);

            let defers = action.has(ActionFlags::POSTPONES_ENTIRELY)
                || (action.has(ActionFlags::DEFERS_LOOKBACK) && !feed.has(FeedFlags::DEFERRING_ENFIX));
            if fulfilling && defers {
                let operator = operator_name(feed);
                if frame.has(FrameFlags::ERROR_ON_DEFERRED_ENFIX) {
                    return Err(EvalError::AmbiguousInfix {
                        operator,
                        action: frame.parent_label().to_string(),
                    });
                }
                debug!(operator = %operator, "deferring enfix");
                feed.set(FeedFlags::DEFERRING_ENFIX);
                return Ok(());
            }

            feed.clear(FeedFlags::DEFERRING_ENFIX);
            let (operator, _) = feed
                .fetch()
                .ok_or_else(|| EvalError::protocol("lookahead lost its operator"))?;
            let base = self.stack.mark();
            self.run_action(frame, feed, &enfix, operator.as_symbol().cloned(), true, base)?;
        }
    }
}

fn operator_name(feed: &Feed) -> Symbol {
    feed.current()
        .and_then(Cell::as_symbol)
        .cloned()
        .unwrap_or_else(|| "?".into())
}
