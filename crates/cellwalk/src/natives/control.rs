//! Conditionals, blocks, throws and the invisibles

use std::ops::ControlFlow;

use super::{each_value, native, native_with};
use crate::action::{ActionFlags, Bounce};
use crate::call::Call;
use crate::environment::{self, Context};
use crate::error::{EvalError, Throw, ThrowLabel};
use crate::value::{Cell, Series, Value};

pub(super) fn register(lib: &Context) -> Result<(), EvalError> {
    native(
        lib,
        "if",
        "condition [<opt> any-value!] branch [block! action!]",
        native_if,
    )?;
    native(
        lib,
        "either",
        "condition [<opt> any-value!] true-branch [block! action!] false-branch [block! action!]",
        native_either,
    )?;
    native_with(
        lib,
        "else",
        "optional [<opt> any-value!] branch [block! action!]",
        native_else,
        ActionFlags::ENFIXED | ActionFlags::DEFERS_LOOKBACK,
    )?;
    native_with(
        lib,
        "then",
        "optional [<opt> any-value!] branch [block! action!]",
        native_then,
        ActionFlags::ENFIXED | ActionFlags::DEFERS_LOOKBACK,
    )?;
    native(lib, "all", "block [block!]", native_all)?;
    native(lib, "any", "block [block!]", native_any)?;
    native(lib, "do", "source [block!]", native_do)?;
    native(lib, "reduce", "block [block!]", native_reduce)?;
    native(lib, "catch", "block [block!] /name word [word!]", native_catch)?;
    native(
        lib,
        "throw",
        "value [<opt> any-value!] /name word [word!]",
        native_throw,
    )?;

    native(
        lib,
        "comment",
        ":discarded [block! text! integer! decimal! word!]",
        native_comment,
    )?;
    native(lib, "elide", "discarded [<opt> any-value!]", native_comment)?;
    native(lib, "the", ":value [any-value!]", native_the)?;
    native(lib, "inline", "code [block!]", native_inline)?;
    native_with(lib, "|", "", native_barrier, ActionFlags::IS_BARRIER)?;
    native_with(
        lib,
        "default",
        ":target [set-word!] branch [block!]",
        native_default,
        ActionFlags::ENFIXED,
    )?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals
// ═══════════════════════════════════════════════════════════════════════

fn native_if(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let condition = call.arg("condition")?;
    if !condition.is_truthy() {
        return Ok(Bounce::Value(Cell::null()));
    }
    let branch = call.arg("branch")?;
    branch_result(call.run_branch(&branch, Some(condition))?)
}

fn native_either(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let condition = call.arg("condition")?;
    let branch = if condition.is_truthy() {
        call.arg("true-branch")?
    } else {
        call.arg("false-branch")?
    };
    branch_result(call.run_branch(&branch, Some(condition))?)
}

/// A branch that produced nothing yields null.
fn branch_result(cell: Cell) -> Result<Bounce, EvalError> {
    if cell.is_void() {
        return Ok(Bounce::Value(Cell::null()));
    }
    Ok(Bounce::Value(cell))
}

fn native_else(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let optional = call.arg("optional")?;
    if !optional.is_null() {
        return Ok(Bounce::Value(optional));
    }
    let branch = call.arg("branch")?;
    branch_result(call.run_branch(&branch, None)?)
}

fn native_then(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let optional = call.arg("optional")?;
    if optional.is_null() {
        return Ok(Bounce::Value(Cell::null()));
    }
    let branch = call.arg("branch")?;
    branch_result(call.run_branch(&branch, Some(optional))?)
}

fn native_all(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let block = call.series("block")?;
    let mut last = Cell::void();
    let flow = each_value(call, &block, |value| {
        if value.is_truthy() {
            last = value;
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Cell::null())
        }
    })?;
    Ok(Bounce::Value(match flow {
        ControlFlow::Break(null) => null,
        ControlFlow::Continue(()) => last,
    }))
}

fn native_any(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let block = call.series("block")?;
    let flow = each_value(call, &block, |value| {
        if value.is_truthy() {
            ControlFlow::Break(value)
        } else {
            ControlFlow::Continue(())
        }
    })?;
    Ok(Bounce::Value(match flow {
        ControlFlow::Break(found) => found,
        ControlFlow::Continue(()) => Cell::null(),
    }))
}

// ═══════════════════════════════════════════════════════════════════════
// Blocks
// ═══════════════════════════════════════════════════════════════════════

fn native_do(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let source = call.series("source")?;
    Ok(Bounce::Value(call.do_series(&source)?))
}

fn native_reduce(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let block = call.series("block")?;
    let mut values = Vec::new();
    let _flow = each_value(call, &block, |value| {
        values.push(value);
        ControlFlow::<Cell>::Continue(())
    })?;
    Ok(Bounce::Value(Cell::new(Value::Block(Series::new(values)))))
}

// ═══════════════════════════════════════════════════════════════════════
// Throw and Catch
// ═══════════════════════════════════════════════════════════════════════

fn native_throw(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("value")?;
    let name = if call.refinement("name")? {
        Some(call.arg("word")?)
    } else {
        None
    };
    Err(EvalError::Thrown(Throw::user(name, value)))
}

/// Catches unnamed throws, or with `/name` only throws of that name.
fn native_catch(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let block = call.series("block")?;
    let wanted = if call.refinement("name")? {
        Some(call.arg("word")?)
    } else {
        None
    };
    match call.do_series(&block) {
        Ok(value) => Ok(Bounce::Value(value)),
        Err(EvalError::Thrown(Throw {
            label: ThrowLabel::User(name),
            payload,
        })) if caught(&wanted, &name) => Ok(Bounce::Value(payload)),
        Err(e) => Err(e),
    }
}

fn caught(wanted: &Option<Cell>, name: &Cell) -> bool {
    match wanted {
        Some(wanted) => wanted == name,
        None => !name.is_truthy(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Invisibles
// ═══════════════════════════════════════════════════════════════════════

fn native_comment(_call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Invisible)
}

fn native_barrier(_call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Invisible)
}

fn native_the(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Value(call.arg("value")?))
}

/// Runs its block as if it had been written in place of the call.
fn native_inline(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let code = call.series("code")?;
    call.splice(&code);
    Ok(Bounce::Invisible)
}

/// `x: default [10]` sets `x` only if it is unset or null.
fn native_default(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let target = call.arg("target")?;
    let Some(symbol) = target.as_symbol().cloned() else {
        return Err(EvalError::type_error("default needs a set-word"));
    };
    let scope = call.scope();
    let current = environment::lookup(&symbol, &scope);
    if let Some(current) = current.filter(|c| !c.is_null() && !c.is_void()) {
        return Ok(Bounce::Value(current));
    }
    let branch = call.arg("branch")?;
    let value = call.run_branch(&branch, None)?;
    environment::assign(&symbol, &scope, value.clone());
    Ok(Bounce::Value(value))
}
