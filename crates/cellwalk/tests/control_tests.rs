//! Tests for conditionals, throws, limits and arithmetic natives

use cellwalk::*;

fn eval(src: &str) -> std::result::Result<Value, EvalError> {
    let mut evaluator = Evaluator::new()?;
    evaluator.eval_str(src).map(Cell::into_value)
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_if_true_branch() {
    assert!(matches!(eval("if true [42]"), Ok(Value::Integer(42))));
}

#[test]
fn test_if_false_is_null() {
    assert!(matches!(eval("if false [42]"), Ok(Value::Null)));
}

#[test]
fn test_if_empty_branch_is_null() {
    assert!(matches!(eval("if true []"), Ok(Value::Null)));
}

#[test]
fn test_if_action_branch_gets_condition() {
    assert!(matches!(eval("if 5 func [x] [x + 1]"), Ok(Value::Integer(6))));
}

#[test]
fn test_either() {
    assert!(matches!(eval("either 1 > 2 [\"a\"] [\"b\"]"), Ok(Value::Text(ref s)) if &**s == "b"));
}

#[test]
fn test_truthiness() {
    assert!(matches!(eval("if 0 [1]"), Ok(Value::Integer(1))));
    assert!(matches!(eval("if null [1]"), Ok(Value::Null)));
    assert!(matches!(eval("not null"), Ok(Value::Logic(true))));
    assert!(matches!(eval("not 0"), Ok(Value::Logic(false))));
}

#[test]
fn test_all_and_any() {
    assert!(matches!(eval("all [1 2 3]"), Ok(Value::Integer(3))));
    assert!(matches!(eval("all [1 false 3]"), Ok(Value::Null)));
    assert!(matches!(eval("any [false null 2]"), Ok(Value::Integer(2))));
    assert!(matches!(eval("any [false null]"), Ok(Value::Null)));
}

#[test]
fn test_all_stops_early() {
    assert!(matches!(eval("x: 0 all [false x: 1] x"), Ok(Value::Integer(0))));
}

#[test]
fn test_do_block() {
    assert!(matches!(eval("do [1 + 1]"), Ok(Value::Integer(2))));
}

#[test]
fn test_branch_sees_enclosing_words() {
    assert!(matches!(eval("x: 10 if true [x + 1]"), Ok(Value::Integer(11))));
}

// ═══════════════════════════════════════════════════════════════════════
// Throw and Catch
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_catch_unnamed() {
    assert!(matches!(eval("catch [1 throw 2 3]"), Ok(Value::Integer(2))));
}

#[test]
fn test_catch_without_throw() {
    assert!(matches!(eval("catch [1 + 1]"), Ok(Value::Integer(2))));
}

#[test]
fn test_throw_during_argument_gathering() {
    let mut evaluator = Evaluator::new().unwrap();
    let result = evaluator.eval_str("f: func [a b c] [a] catch [f 1 throw 99 3]");
    assert!(matches!(result.map(Cell::into_value), Ok(Value::Integer(99))));
    assert_eq!(evaluator.depth(), 0);
    assert!(evaluator.data_stack().is_empty());
}

#[test]
fn test_throw_passes_through_function() {
    let src = "f: func [] [throw 7 0] catch [f + 1]";
    assert!(matches!(eval(src), Ok(Value::Integer(7))));
}

#[test]
fn test_named_catch() {
    assert!(matches!(eval("catch/name [throw/name 1 'a] 'a"), Ok(Value::Integer(1))));
}

#[test]
fn test_unnamed_catch_ignores_named_throw() {
    let src = "catch/name [catch [throw/name 1 'b] 2] 'b";
    assert!(matches!(eval(src), Ok(Value::Integer(1))));
}

#[test]
fn test_uncaught_throw() {
    assert!(matches!(eval("throw 1"), Err(EvalError::Thrown(_))));
}

// ═══════════════════════════════════════════════════════════════════════
// Limits
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_stack_overflow() {
    let mut evaluator = Evaluator::with_context(EvalContext::with_max_call_depth(20)).unwrap();
    let result = evaluator.eval_str("f: func [n] [f n] f 1");
    assert!(matches!(result, Err(EvalError::StackOverflow { max: 20, .. })));
    assert_eq!(evaluator.depth(), 0);
    assert!(evaluator.data_stack().is_empty());
}

#[test]
fn test_default_depth_limit_fits_a_small_thread() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut evaluator = Evaluator::new().unwrap();
            let result = evaluator.eval_str("f: func [n] [f n + 1] f 0");
            let max = evaluator.context().max_call_depth;
            matches!(result, Err(EvalError::StackOverflow { max: m, .. }) if m == max) && evaluator.depth() == 0
        })
        .unwrap();
    assert!(worker.join().unwrap());
}

#[test]
fn test_interrupt() {
    let ctx = EvalContext::new().signal_interval(1);
    ctx.interrupt();
    let mut evaluator = Evaluator::with_context(ctx).unwrap();
    assert!(matches!(evaluator.eval_str("1 + 2"), Err(EvalError::Interrupted)));
}

#[test]
fn test_interrupt_reset() {
    let ctx = EvalContext::new().signal_interval(1);
    ctx.interrupt();
    let mut evaluator = Evaluator::with_context(ctx).unwrap();
    assert!(evaluator.eval_str("1").is_err());
    evaluator.context().reset_interrupt();
    assert!(matches!(evaluator.eval_str("1").map(Cell::into_value), Ok(Value::Integer(1))));
}

#[test]
fn test_ticks_count_steps() {
    let mut evaluator = Evaluator::new().unwrap();
    evaluator.eval_str("1 2 3").unwrap();
    assert_eq!(evaluator.ticks(), 3);
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_division() {
    assert!(matches!(eval("6 / 3"), Ok(Value::Integer(2))));
    assert!(matches!(eval("7 / 2"), Ok(Value::Decimal(d)) if d == 3.5));
    assert!(matches!(eval("1 / 0"), Err(EvalError::DivisionByZero)));
}

#[test]
fn test_divmod_is_euclidean() {
    assert!(matches!(eval("[q r]: divmod -7 2 r"), Ok(Value::Integer(1))));
    assert!(matches!(eval("divmod -7 2"), Ok(Value::Integer(-4))));
}

#[test]
fn test_overflow() {
    assert!(matches!(eval("9223372036854775807 + 1"), Err(EvalError::IntegerOverflow { .. })));
}

#[test]
fn test_comparisons() {
    assert!(matches!(eval("1 < 2"), Ok(Value::Logic(true))));
    assert!(matches!(eval("2 >= 2"), Ok(Value::Logic(true))));
    assert!(matches!(eval("1 <> 1"), Ok(Value::Logic(false))));
    assert!(matches!(eval("\"a\" < \"b\""), Ok(Value::Logic(true))));
    assert!(matches!(eval("1 < \"b\""), Err(EvalError::TypeError { .. })));
}

#[test]
fn test_equality_across_numbers() {
    assert!(matches!(eval("1 = 1.0"), Ok(Value::Logic(true))));
    assert!(matches!(eval("equal? [1 2] [1 2]"), Ok(Value::Logic(true))));
}
