//! The evaluator
//!
//! Two tightly coupled halves live here:
//!
//! - the step evaluator ([`Evaluator::run_one_step`]), which takes one
//!   expression from a [`Feed`] into a frame's output and then runs the
//!   enfix lookahead protocol;
//! - the invocation engine ([`Evaluator::invoke_action`]), which fulfills,
//!   type checks and dispatches an action frame, re-entering the step
//!   evaluator once per argument.
//!
//! Both are written as explicit state machines over
//! [`StepState`](crate::frame::StepState) and
//! [`ActionState`](crate::frame::ActionState). Recursion is ordinary Rust
//! recursion, bounded by [`EvalContext::max_call_depth`].

mod action;
mod assign;
mod fulfill;
mod lookahead;
mod path;
mod step;
mod typecheck;

use std::rc::Rc;

use tracing::warn;

use crate::action::ParamClass;
use crate::context::EvalContext;
use crate::data_stack::DataStack;
use crate::environment::{self, Context};
use crate::error::EvalError;
use crate::feed::Feed;
use crate::frame::{Frame, FrameFlags, FrameId};
use crate::loader;
use crate::value::{ActionValue, Cell, CellFlags, Series, Symbol};

/// Host hook run between argument fulfillment and type checking.
///
/// It sees the fulfilled frame and may rewrite arguments through the
/// frame's varlist; whatever it leaves is what gets type checked.
pub type FulfillHook = Rc<dyn Fn(&Frame) -> Result<(), EvalError>>;

/// One independent evaluator instance.
pub struct Evaluator {
    ctx: EvalContext,
    lib: Context,
    user: Context,
    stack: DataStack,
    depth: usize,
    tick: u64,
    countdown: u32,
    next_frame: u64,
    hook: Option<FulfillHook>,
}

/// Strip evaluation flags from a cell that is leaving a frame.
pub(crate) fn plain(cell: Cell) -> Cell {
    Cell::new(cell.into_value())
}

impl Evaluator {
    /// Create an evaluator with default settings and the native library.
    pub fn new() -> Result<Self, EvalError> {
        Self::with_context(EvalContext::default())
    }

    /// Create an evaluator with the given configuration.
    pub fn with_context(ctx: EvalContext) -> Result<Self, EvalError> {
        let lib = Context::lib()?;
        let user = Context::new(Some(lib.clone()));
        Ok(Self {
            countdown: ctx.signal_interval.max(1),
            ctx,
            lib,
            user,
            stack: DataStack::new(),
            depth: 0,
            tick: 0,
            next_frame: 0,
            hook: None,
        })
    }

    /// Configuration.
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// The root context holding natives and datatypes.
    pub fn lib(&self) -> &Context {
        &self.lib
    }

    /// The context top-level code runs in.
    pub fn user(&self) -> &Context {
        &self.user
    }

    /// The data stack.
    pub fn data_stack(&self) -> &DataStack {
        &self.stack
    }

    /// Number of action invocations currently live.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Steps taken so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Install (or remove) the hook run between fulfillment and type
    /// checking.
    pub fn set_fulfill_hook(&mut self, hook: Option<FulfillHook>) {
        self.hook = hook;
    }

    /// A fresh frame with a new identity.
    pub fn new_frame(&mut self, flags: FrameFlags) -> Frame {
        self.next_frame += 1;
        Frame::new(FrameId(self.next_frame), flags)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Running Code
    // ═══════════════════════════════════════════════════════════════════

    /// Load and evaluate source text in the user context.
    pub fn eval_str(&mut self, src: &str) -> Result<Cell, EvalError> {
        let cells = loader::load(src)?;
        let user = self.user.clone();
        let series = Series::new(cells).with_scope(user.clone());
        self.do_series(&series, &user)
    }

    /// Evaluate a series to its end, returning the last value produced
    /// (void if every step was invisible).
    pub fn do_series(&mut self, series: &Series, scope: &Context) -> Result<Cell, EvalError> {
        let mut feed = Feed::new(series, scope.clone());
        self.do_feed(&mut feed)
    }

    /// Evaluate a feed to its end.
    pub fn do_feed(&mut self, feed: &mut Feed) -> Result<Cell, EvalError> {
        let mut frame = self.new_frame(FrameFlags::empty());
        if self.run_to_end(&mut frame, feed)? {
            Ok(plain(frame.out))
        } else {
            Ok(Cell::void())
        }
    }

    /// Run steps until the feed ends. Reports whether any step produced a
    /// value; invisible steps leave an earlier value in place.
    pub(crate) fn run_to_end(&mut self, frame: &mut Frame, feed: &mut Feed) -> Result<bool, EvalError> {
        let mut produced = false;
        while !feed.is_end() {
            self.run_one_step(frame, feed)?;
            if !frame.out.is_stale() {
                produced = true;
            }
        }
        if produced {
            frame.out.clear(CellFlags::STALE);
        }
        Ok(produced)
    }

    /// Invoke an action with named arguments.
    ///
    /// Every parameter not named is null, and a refinement is in use when
    /// its value is truthy. Arguments are type checked like any others.
    pub fn apply(&mut self, action: &ActionValue, args: &[(Symbol, Cell)]) -> Result<Cell, EvalError> {
        let original = &action.action;
        for (name, _) in args {
            if original.find_param(name).is_none() {
                return Err(EvalError::NoSuchParameter {
                    action: label_of(action),
                    name: name.clone(),
                });
            }
        }

        let template = original
            .params()
            .iter()
            .enumerate()
            .map(|(index, param)| {
                if let Some(cell) = specialized(action, index) {
                    return Some(cell);
                }
                if param.is_hidden_class() {
                    return None;
                }
                let given = args
                    .iter()
                    .rev()
                    .find(|(name, _)| name == &param.symbol)
                    .map(|(_, cell)| plain(cell.clone()));
                Some(match param.class {
                    ParamClass::Refinement => match given {
                        Some(cell) if cell.is_truthy() => Cell::logic(true),
                        _ => Cell::null(),
                    },
                    _ => given.unwrap_or_else(Cell::null),
                })
            })
            .collect();
        self.run_template(action, template)
    }

    /// Invoke an action with positional arguments for its leading
    /// parameters. Refinements are not in use.
    pub fn call(&mut self, action: &ActionValue, args: &[Cell]) -> Result<Cell, EvalError> {
        let mut supplied = args.iter();
        let mut gated = false;
        let mut template = Vec::with_capacity(action.action.params().len());
        for (index, param) in action.action.params().iter().enumerate() {
            if let Some(cell) = specialized(action, index) {
                template.push(Some(cell));
                continue;
            }
            template.push(match param.class {
                ParamClass::Local | ParamClass::Output => None,
                ParamClass::Refinement => {
                    gated = true;
                    Some(Cell::null())
                }
                _ if gated => Some(Cell::null()),
                _ => Some(supplied.next().map_or_else(Cell::null, |c| plain(c.clone()))),
            });
        }
        if supplied.next().is_some() {
            return Err(EvalError::protocol(format!(
                "too many arguments for {}",
                label_of(action)
            )));
        }
        self.run_template(action, template)
    }

    fn run_template(&mut self, action: &ActionValue, template: Vec<Option<Cell>>) -> Result<Cell, EvalError> {
        let templated = ActionValue {
            action: Rc::new((*action.action).clone().with_exemplar(template)),
            binding: action.binding.clone(),
        };
        let mut feed = Feed::empty(self.user.clone());
        let mut frame = self.new_frame(FrameFlags::empty());
        let base = self.stack.mark();
        let label = action.action.name().cloned();
        self.run_action(&mut frame, &mut feed, &templated, label, false, base)?;
        if frame.out.is_stale() {
            Ok(Cell::void())
        } else {
            Ok(plain(frame.out))
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Counters
    // ═══════════════════════════════════════════════════════════════════

    /// Count a step and, every `signal_interval` steps, honor an interrupt.
    fn tick(&mut self) -> Result<(), EvalError> {
        self.tick += 1;
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.ctx.signal_interval.max(1);
            if self.ctx.is_interrupted() {
                warn!(tick = self.tick, "evaluation interrupted");
                return Err(EvalError::Interrupted);
            }
        }
        Ok(())
    }

    /// Enter an action invocation. Returns error if max depth exceeded.
    fn enter_call(&mut self) -> Result<(), EvalError> {
        if self.depth >= self.ctx.max_call_depth {
            return Err(EvalError::StackOverflow {
                depth: self.depth,
                max: self.ctx.max_call_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Exit an action invocation.
    fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Look a word up, failing if it is unbound.
    pub(crate) fn lookup(&self, name: &Symbol, scope: &Context) -> Result<Cell, EvalError> {
        environment::lookup(name, scope).ok_or_else(|| EvalError::UnboundWord { name: name.clone() })
    }

    /// Look a word up for its value, failing if it is unbound or unset.
    pub(crate) fn lookup_value(&self, name: &Symbol, scope: &Context) -> Result<Cell, EvalError> {
        let cell = self.lookup(name, scope)?;
        if cell.is_void() {
            return Err(EvalError::NoValue { name: name.clone() });
        }
        Ok(plain(cell))
    }
}

fn specialized(action: &ActionValue, index: usize) -> Option<Cell> {
    action
        .action
        .exemplar()
        .and_then(|ex| ex.get(index).cloned().flatten())
}

fn label_of(action: &ActionValue) -> String {
    action
        .action
        .name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "anonymous action".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ids_are_unique() {
        let mut ev = Evaluator::new().unwrap();
        let a = ev.new_frame(FrameFlags::empty());
        let b = ev.new_frame(FrameFlags::empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_do_series_of_nothing_is_void() {
        let mut ev = Evaluator::new().unwrap();
        let user = ev.user().clone();
        let result = ev.do_series(&Series::new(vec![]), &user).unwrap();
        assert!(result.is_void());
    }

    #[test]
    fn test_ticks_advance_per_step() {
        let mut ev = Evaluator::new().unwrap();
        ev.eval_str("1 2 3").unwrap();
        assert_eq!(ev.ticks(), 3);
    }

    #[test]
    fn test_depth_returns_to_zero() {
        let mut ev = Evaluator::new().unwrap();
        ev.eval_str("add 1 add 2 3").unwrap();
        assert_eq!(ev.depth(), 0);
        assert!(ev.data_stack().is_empty());
    }
}
