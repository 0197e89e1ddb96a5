//! Objects, type inspection and output

use super::native;
use crate::action::Bounce;
use crate::call::Call;
use crate::environment::Context;
use crate::error::EvalError;
use crate::value::{Cell, Value};

pub(super) fn register(lib: &Context) -> Result<(), EvalError> {
    native(lib, "object", "body [block!]", native_object)?;
    native(lib, "type-of", "value [<opt> any-value!]", native_type_of)?;
    native(lib, "null?", "value [<opt> any-value!]", native_null_q)?;
    native(lib, "print", "value [<opt> any-value!]", native_print)?;
    Ok(())
}

/// `object [a: 1 b: a + 1]`: top-level set-words of the body become the
/// fields, and the body runs with the new object as its scope.
fn native_object(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let body = call.series("body")?;
    let outer = body.scope().cloned().unwrap_or_else(|| call.scope());
    let object = Context::new(Some(outer));
    for cell in body.cells() {
        if let Value::SetWord(field) = cell.value() {
            object.define(field.clone(), Cell::null());
        }
    }
    call.evaluator().do_series(&body, &object)?;
    object.set_parent(None);
    Ok(Bounce::Value(Cell::object(object)))
}

fn native_type_of(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("value")?;
    if value.is_null() {
        return Ok(Bounce::Value(Cell::null()));
    }
    Ok(Bounce::Value(Cell::datatype(value.kind())))
}

fn native_null_q(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Value(Cell::logic(call.arg("value")?.is_null())))
}

/// Text prints without quotes; anything else prints as it would load.
fn native_print(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let value = call.arg("value")?;
    match value.value() {
        Value::Text(text) => println!("{}", text),
        _ => println!("{}", value),
    }
    Ok(Bounce::Value(Cell::void()))
}
