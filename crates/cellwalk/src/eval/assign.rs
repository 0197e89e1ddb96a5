//! Assignment steps: `word:`, `obj/field:` and `[a b]:`

use super::{plain, Evaluator};
use crate::data_stack::Pushed;
use crate::environment::{self, Context};
use crate::error::EvalError;
use crate::feed::Feed;
use crate::frame::{Frame, FrameFlags};
use crate::value::{Cell, Series, Symbol, Value};

impl Evaluator {
    /// Evaluate the right-hand side of an assignment into `frame.out`.
    ///
    /// The right side may not vanish: invisible steps are skipped over, and
    /// running out of input first is an error.
    fn eval_rhs(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        target: &Cell,
        extra: FrameFlags,
    ) -> Result<Cell, EvalError> {
        let need_value = || EvalError::NeedValue {
            target: target.to_string(),
        };
        if self.at_end_or_barrier(feed) {
            return Err(need_value());
        }

        if frame.has(FrameFlags::FULFILLING_ARG) {
            let mut sub = self
                .new_frame(FrameFlags::NO_INVISIBLE | extra)
                .gathering_for(frame.parent_label().to_string());
            self.run_one_step(&mut sub, feed)?;
            frame.out = sub.out;
        } else {
            let saved = frame.flags;
            frame.flags.insert(FrameFlags::NO_INVISIBLE | extra);
            let result = self.run_one_step(frame, feed);
            frame.flags = saved;
            result?;
        }

        if frame.out.is_stale() {
            return Err(need_value());
        }
        frame.out = plain(frame.out.clone());
        Ok(frame.out.clone())
    }

    pub(crate) fn eval_set_word(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        symbol: &Symbol,
        scope: &Context,
    ) -> Result<(), EvalError> {
        let value = self.eval_rhs(frame, feed, &Cell::set_word(symbol.clone()), FrameFlags::empty())?;
        environment::assign(symbol, scope, value);
        feed.invalidate_gotten();
        Ok(())
    }

    pub(crate) fn eval_set_path(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        series: &Series,
        scope: &Context,
    ) -> Result<(), EvalError> {
        let target = Cell::new(Value::SetPath(series.clone()));
        let value = self.eval_rhs(frame, feed, &target, FrameFlags::empty())?;
        self.set_path(series, scope, value)?;
        feed.invalidate_gotten();
        Ok(())
    }

    /// `[a b c]: action ...` assigns the action's result to `a` and its
    /// `<output>` parameters, in order, to `b` and `c`. A blank skips a
    /// position; positions without a value get null.
    pub(crate) fn eval_set_block(
        &mut self,
        frame: &mut Frame,
        feed: &mut Feed,
        series: &Series,
        scope: &Context,
    ) -> Result<(), EvalError> {
        let targets = series
            .cells()
            .iter()
            .map(|cell| match cell.value() {
                Value::Word(symbol) => Ok(Some(symbol.clone())),
                Value::Blank => Ok(None),
                _ => Err(EvalError::type_error(format!(
                    "set-block can only hold words and blanks, not {}",
                    cell
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let target = Cell::new(Value::SetBlock(series.clone()));
        let mark = self.stack.mark();
        let primary = match self.eval_rhs(frame, feed, &target, FrameFlags::WANTS_OUTPUTS) {
            Ok(value) => value,
            Err(e) => {
                self.stack.unwind_to(mark);
                return Err(e);
            }
        };
        let outputs = self
            .stack
            .drain_since(mark)
            .into_iter()
            .filter_map(|pushed| match pushed {
                Pushed::Value(cell) => Some(cell),
                Pushed::Refinement(_) => None,
            });

        let mut values = std::iter::once(primary).chain(outputs);
        for target in targets {
            let value = values.next().unwrap_or_else(Cell::null);
            if let Some(symbol) = target {
                environment::assign(&symbol, scope, value);
            }
        }
        feed.invalidate_gotten();
        Ok(())
    }
}
