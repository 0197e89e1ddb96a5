//! Making and calling functions: `func`, `return`, `redo`, `enfix`, `apply`

use std::rc::Rc;

use tracing::debug;

use super::native;
use crate::action::{dispatcher, parse_spec, Action, Bounce, Param, ParamClass};
use crate::call::Call;
use crate::environment::{self, Context};
use crate::error::{EvalError, Throw};
use crate::feed::Feed;
use crate::frame::FrameFlags;
use crate::value::{ActionValue, Cell, Series, Symbol, TypeSet, Value};

pub(super) fn register(lib: &Context) -> Result<(), EvalError> {
    native(lib, "func", "spec [block!] body [block!]", native_func)?;
    native(lib, "return", "value [<opt> <end> any-value!]", native_return)?;
    native(lib, "redo", ":target [word!] /other phase [action!]", native_redo)?;
    native(lib, "enfix", "action [action!]", native_enfix)?;
    native(lib, "apply", "action [action!] def [block!]", native_apply)?;
    Ok(())
}

/// What a `func` dispatcher needs besides its frame.
#[derive(Clone)]
struct FuncBody {
    body: Series,
    scope: Context,
    return_slot: Option<usize>,
    return_action: Rc<Action>,
}

/// `func [a b /ref c <local> d] [body]`
///
/// Every call gets its own varlist as the innermost scope of the body, and
/// a `return` bound to that frame.
fn native_func(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let spec = call.series("spec")?;
    let body = call.series("body")?;
    let mut parsed = parse_spec(spec.cells())?;

    if let Some(variadic) = parsed.params.iter().find(|p| p.class == ParamClass::Variadic) {
        return Err(EvalError::BadSpec {
            message: format!("{} is variadic; only natives take variadic arguments", variadic.symbol),
        });
    }

    let return_symbol = Symbol::new("return");
    let return_slot = if parsed.params.iter().any(|p| p.symbol == return_symbol) {
        None
    } else {
        parsed
            .params
            .push(Param::new(return_symbol.clone(), ParamClass::Local, TypeSet::any_value()));
        Some(parsed.params.len() - 1)
    };

    let return_action = call
        .evaluator()
        .lib()
        .get(&return_symbol)
        .and_then(|cell| cell.as_action().map(|a| Rc::clone(&a.action)))
        .ok_or_else(|| EvalError::protocol("lib has no return"))?;

    let scope = body.scope().cloned().unwrap_or_else(|| call.scope());
    let details = FuncBody {
        body,
        scope,
        return_slot,
        return_action,
    };
    let action = Action::from_spec(parsed, dispatcher(func_dispatch)).with_details(details);
    Ok(Bounce::Value(Cell::action(Rc::new(action))))
}

fn func_dispatch(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let details = call
        .details::<FuncBody>()
        .ok_or_else(|| EvalError::protocol("func dispatcher without a body"))?;
    let varlist = call.varlist()?;
    varlist.set_parent(Some(details.scope.clone()));
    if let Some(slot) = details.return_slot {
        varlist.set_index(slot, Cell::bound_action(details.return_action, varlist.clone()));
    }
    let result = call.evaluator().do_series(&details.body, &varlist)?;
    Ok(Bounce::Value(result))
}

/// Definitional return: unwinds to the frame its binding names.
fn native_return(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("value")?;
    let target = call
        .binding()
        .and_then(|ctx| ctx.frame_id())
        .ok_or_else(|| EvalError::type_error("return used outside of a function"))?;
    Err(EvalError::Thrown(Throw::unwind(target, value)))
}

/// `redo arg` restarts the function that `arg` is an argument of, with
/// whatever its arguments hold now. `/other` runs a different action with
/// the same parameter list instead.
fn native_redo(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let target = call.arg("target")?;
    let Some(symbol) = target.as_symbol() else {
        return Err(EvalError::type_error("redo needs a word"));
    };
    let scope = call.scope();
    let frame = environment::bind(symbol, &scope)
        .and_then(|binding| binding.context.frame_id())
        .ok_or_else(|| EvalError::type_error(format!("{} is not a function argument", symbol)))?;
    let phase = if call.refinement("other")? {
        match call.arg("phase")?.as_action() {
            Some(action) => Some(Rc::clone(&action.action)),
            None => return Err(EvalError::type_error("redo/other needs an action")),
        }
    } else {
        None
    };
    debug!(target = %symbol, "redo requested");
    Err(EvalError::Thrown(Throw::redo(frame, phase, true)))
}

fn native_enfix(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("action")?;
    let action = value
        .as_action()
        .ok_or_else(|| EvalError::type_error("enfix needs an action"))?;
    Ok(Bounce::Value(Cell::new(Value::Action(ActionValue {
        action: Rc::new(action.action.enfixed()),
        binding: action.binding.clone(),
    }))))
}

/// `apply :f [a: 1 ref: true]`
fn native_apply(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("action")?;
    let action = value
        .as_action()
        .cloned()
        .ok_or_else(|| EvalError::type_error("apply needs an action"))?;
    let def = call.series("def")?;
    let scope = def.scope().cloned().unwrap_or_else(|| call.scope());

    let evaluator = call.evaluator();
    let mut feed = Feed::new(&def, scope);
    let mut args = Vec::new();
    while let Some((cell, _)) = feed.fetch() {
        let Value::SetWord(name) = cell.value() else {
            return Err(EvalError::type_error(format!(
                "apply expects name: value pairs, found {}",
                cell
            )));
        };
        if evaluator.at_end_or_barrier(&mut feed) {
            return Err(EvalError::NeedValue {
                target: cell.to_string(),
            });
        }
        let mut frame = evaluator.new_frame(FrameFlags::NO_INVISIBLE);
        evaluator.run_one_step(&mut frame, &mut feed)?;
        if frame.out.is_stale() {
            return Err(EvalError::NeedValue {
                target: cell.to_string(),
            });
        }
        args.push((name.clone(), frame.out));
    }
    Ok(Bounce::Value(evaluator.apply(&action, &args)?))
}
