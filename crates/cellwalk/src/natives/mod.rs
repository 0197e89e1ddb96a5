//! Native actions
//!
//! Each native is a plain function over a [`Call`] plus a spec string in the
//! same dialect `func` uses, so natives and user functions are fulfilled
//! and type checked identically.

mod control;
mod data;
mod function;
mod math;

use std::ops::ControlFlow;
use std::rc::Rc;

use crate::action::{dispatcher, parse_spec, Action, ActionFlags, Bounce};
use crate::call::Call;
use crate::environment::Context;
use crate::error::EvalError;
use crate::feed::Feed;
use crate::frame::FrameFlags;
use crate::loader;
use crate::value::{Cell, Series};

/// Signature of a native's implementation.
pub type NativeFn = fn(&mut Call<'_>) -> Result<Bounce, EvalError>;

/// Define every native in `lib`.
pub fn register(lib: &Context) -> Result<(), EvalError> {
    math::register(lib)?;
    control::register(lib)?;
    function::register(lib)?;
    data::register(lib)?;
    Ok(())
}

/// Build a native from its spec text and define it under `name`.
pub(crate) fn native(lib: &Context, name: &str, spec: &str, f: NativeFn) -> Result<Rc<Action>, EvalError> {
    native_with(lib, name, spec, f, ActionFlags::empty())
}

/// [`native`] with extra behavior flags.
pub(crate) fn native_with(
    lib: &Context,
    name: &str,
    spec: &str,
    f: NativeFn,
    flags: ActionFlags,
) -> Result<Rc<Action>, EvalError> {
    let cells = loader::load(spec)?;
    let parsed = parse_spec(&cells)?;
    let action = Rc::new(
        Action::from_spec(parsed, dispatcher(f))
            .with_name(name)
            .with_flags(ActionFlags::IS_NATIVE | flags),
    );
    lib.define(name, Cell::action(Rc::clone(&action)));
    Ok(action)
}

/// Define an enfixed copy of `action` under `name`.
pub(crate) fn enfix_alias(lib: &Context, name: &str, action: &Action) {
    let op = action.enfixed().with_name(name);
    lib.define(name, Cell::action(Rc::new(op)));
}

/// Step through `block`, handing each produced value to `f` until it
/// breaks. Invisible steps are skipped.
pub(crate) fn each_value<F>(call: &mut Call<'_>, block: &Series, mut f: F) -> Result<ControlFlow<Cell>, EvalError>
where
    F: FnMut(Cell) -> ControlFlow<Cell>,
{
    let scope = block.scope().cloned().unwrap_or_else(|| call.scope());
    let evaluator = call.evaluator();
    let mut feed = Feed::new(block, scope);
    while !feed.is_end() {
        let mut frame = evaluator.new_frame(FrameFlags::empty());
        evaluator.run_one_step(&mut frame, &mut feed)?;
        if frame.out.is_stale() {
            continue;
        }
        if let ControlFlow::Break(done) = f(crate::eval::plain(frame.out)) {
            return Ok(ControlFlow::Break(done));
        }
    }
    Ok(ControlFlow::Continue(()))
}
