//! Arithmetic, comparison and logic

use std::cmp::Ordering;

use super::{enfix_alias, native};
use crate::action::Bounce;
use crate::call::Call;
use crate::environment::Context;
use crate::error::EvalError;
use crate::value::{Cell, Value};

pub(super) fn register(lib: &Context) -> Result<(), EvalError> {
    let add = native(lib, "add", "value1 [number!] value2 [number!]", native_add)?;
    let subtract = native(lib, "subtract", "value1 [number!] value2 [number!]", native_subtract)?;
    let multiply = native(lib, "multiply", "value1 [number!] value2 [number!]", native_multiply)?;
    let divide = native(lib, "divide", "value1 [number!] value2 [number!]", native_divide)?;
    enfix_alias(lib, "+", &add);
    enfix_alias(lib, "-", &subtract);
    enfix_alias(lib, "*", &multiply);
    enfix_alias(lib, "/", &divide);

    let any_pair = "value1 [<opt> any-value!] value2 [<opt> any-value!]";
    let equal = native(lib, "equal?", any_pair, native_equal)?;
    let not_equal = native(lib, "not-equal?", any_pair, native_not_equal)?;
    let lesser = native(lib, "lesser?", any_pair, native_lesser)?;
    let greater = native(lib, "greater?", any_pair, native_greater)?;
    let lesser_eq = native(lib, "lesser-or-equal?", any_pair, native_lesser_or_equal)?;
    let greater_eq = native(lib, "greater-or-equal?", any_pair, native_greater_or_equal)?;
    enfix_alias(lib, "=", &equal);
    enfix_alias(lib, "<>", &not_equal);
    enfix_alias(lib, "<", &lesser);
    enfix_alias(lib, ">", &greater);
    enfix_alias(lib, "<=", &lesser_eq);
    enfix_alias(lib, ">=", &greater_eq);

    native(lib, "not", "value [<opt> any-value!]", native_not)?;
    native(
        lib,
        "divmod",
        "dividend [integer!] divisor [integer!] return: [integer!] <output> remainder",
        native_divmod,
    )?;
    native(lib, "sum", "values [<...> number!]", native_sum)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum Op {
    Add,
    Subtract,
    Multiply,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Subtract => "subtract",
            Op::Multiply => "multiply",
        }
    }

    fn integers(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Op::Add => a.checked_add(b),
            Op::Subtract => a.checked_sub(b),
            Op::Multiply => a.checked_mul(b),
        }
    }

    fn decimals(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Subtract => a - b,
            Op::Multiply => a * b,
        }
    }
}

fn as_f64(cell: &Cell) -> Option<f64> {
    match cell.value() {
        Value::Integer(i) => Some(*i as f64),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn arith(op: Op, a: &Cell, b: &Cell) -> Result<Cell, EvalError> {
    match (a.value(), b.value()) {
        (Value::Integer(x), Value::Integer(y)) => op
            .integers(*x, *y)
            .map(Cell::integer)
            .ok_or(EvalError::IntegerOverflow { op: op.name() }),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => Ok(Cell::decimal(op.decimals(x, y))),
            _ => Err(EvalError::type_error(format!(
                "cannot {} {} and {}",
                op.name(),
                a.kind().name(),
                b.kind().name()
            ))),
        },
    }
}

fn binary(call: &mut Call<'_>, op: Op) -> Result<Bounce, EvalError> {
    let a = call.arg("value1")?;
    let b = call.arg("value2")?;
    Ok(Bounce::Value(arith(op, &a, &b)?))
}

fn native_add(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    binary(call, Op::Add)
}

fn native_subtract(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    binary(call, Op::Subtract)
}

fn native_multiply(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    binary(call, Op::Multiply)
}

/// Integer division stays integral when exact.
fn native_divide(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let a = call.arg("value1")?;
    let b = call.arg("value2")?;
    let result = match (a.value(), b.value()) {
        (Value::Integer(_), Value::Integer(0)) => return Err(EvalError::DivisionByZero),
        (Value::Integer(x), Value::Integer(y)) if x.checked_rem(*y) == Some(0) => x
            .checked_div(*y)
            .map(Cell::integer)
            .ok_or(EvalError::IntegerOverflow { op: "divide" })?,
        _ => match (as_f64(&a), as_f64(&b)) {
            (Some(_), Some(y)) if y == 0.0 => return Err(EvalError::DivisionByZero),
            (Some(x), Some(y)) => Cell::decimal(x / y),
            _ => {
                return Err(EvalError::type_error(format!(
                    "cannot divide {} by {}",
                    a.kind().name(),
                    b.kind().name()
                )))
            }
        },
    };
    Ok(Bounce::Value(result))
}

fn native_divmod(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let dividend = call.integer("dividend")?;
    let divisor = call.integer("divisor")?;
    if divisor == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let quotient = dividend
        .checked_div_euclid(divisor)
        .ok_or(EvalError::IntegerOverflow { op: "divmod" })?;
    let remainder = dividend.rem_euclid(divisor);
    call.set_output("remainder", Cell::integer(remainder))?;
    Ok(Bounce::Value(Cell::integer(quotient)))
}

/// Adds up every value its caller supplies after it, up to the end of the
/// input or a barrier.
fn native_sum(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    let mut total = Cell::integer(0);
    while let Some(value) = call.take_vararg("values")? {
        total = arith(Op::Add, &total, &value)?;
    }
    Ok(Bounce::Value(total))
}

// ═══════════════════════════════════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════════════════════════════════

fn compare(a: &Cell, b: &Cell) -> Result<Ordering, EvalError> {
    let ordering = match (a.value(), b.value()) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        EvalError::type_error(format!(
            "cannot compare {} with {}",
            a.kind().name(),
            b.kind().name()
        ))
    })
}

fn ordered(call: &mut Call<'_>, test: fn(Ordering) -> bool) -> Result<Bounce, EvalError> {
    let a = call.arg("value1")?;
    let b = call.arg("value2")?;
    Ok(Bounce::Value(Cell::logic(test(compare(&a, &b)?))))
}

fn native_equal(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Value(Cell::logic(call.arg("value1")? == call.arg("value2")?)))
}

fn native_not_equal(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Value(Cell::logic(call.arg("value1")? != call.arg("value2")?)))
}

fn native_lesser(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    ordered(call, Ordering::is_lt)
}

fn native_greater(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    ordered(call, Ordering::is_gt)
}

fn native_lesser_or_equal(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    ordered(call, Ordering::is_le)
}

fn native_greater_or_equal(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    ordered(call, Ordering::is_ge)
}

fn native_not(call: &mut Call<'_>) -> Result<Bounce, EvalError> {
    Ok(Bounce::Value(Cell::logic(!call.arg("value")?.is_truthy())))
}
