//! Tests for the invocation engine: fulfillment, refinements, type
//! checking, the fulfillment hook, dispatch and redo

use std::cell::Cell as StdCell;
use std::rc::Rc;

use cellwalk::*;
use pretty_assertions::assert_eq;

fn eval(src: &str) -> std::result::Result<Value, EvalError> {
    let mut evaluator = Evaluator::new()?;
    evaluator.eval_str(src).map(Cell::into_value)
}

fn eval_cell(src: &str) -> Cell {
    let mut evaluator = Evaluator::new().expect("lib failed to build");
    evaluator.eval_str(src).expect("evaluation failed")
}

fn block(values: &[i64]) -> Cell {
    Cell::block(values.iter().copied().map(Cell::integer).collect())
}

fn lib_action(evaluator: &Evaluator, name: &str) -> ActionValue {
    evaluator
        .lib()
        .get(&Symbol::new(name))
        .and_then(|cell| cell.as_action().cloned())
        .expect("no such native")
}

/// An action over `value [integer!]` that, on its first dispatch, puts text
/// in its argument and asks to be run again.
fn retyping_action(checked: bool) -> Rc<Action> {
    let spec = parse_spec(&load("value [integer!]").unwrap()).unwrap();
    let passes = Rc::new(StdCell::new(0));
    let action = Action::from_spec(
        spec,
        dispatcher(move |call| {
            passes.set(passes.get() + 1);
            if passes.get() == 1 {
                call.set_arg("value", Cell::text("retyped"))?;
                let phase = call.phase()?;
                return call.redo_as(phase, checked);
            }
            Ok(Bounce::Value(call.arg("value")?))
        }),
    );
    Rc::new(action.with_name("retype"))
}

// ═══════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_func_call() {
    assert!(matches!(eval("double: func [x] [x * 2] double 21"), Ok(Value::Integer(42))));
}

#[test]
fn test_recursion() {
    let src = "fact: func [n] [either n <= 1 [1] [n * fact n - 1]] fact 5";
    assert!(matches!(eval(src), Ok(Value::Integer(120))));
}

#[test]
fn test_locals_start_null() {
    assert!(matches!(eval("f: func [<local> tmp] [null? tmp] f"), Ok(Value::Logic(true))));
}

#[test]
fn test_return_unwinds_to_its_function() {
    let src = "f: func [x] [if x > 0 [return 1] 2]";
    assert!(matches!(eval(&format!("{} f 5", src)), Ok(Value::Integer(1))));
    assert!(matches!(eval(&format!("{} f -5", src)), Ok(Value::Integer(2))));
}

#[test]
fn test_return_type_checked() {
    let src = "f: func [return: [integer!]] [\"text\"] f";
    assert!(matches!(eval(src), Err(EvalError::ReturnType { .. })));
}

#[test]
fn test_return_through_return_type() {
    let src = "f: func [return: [integer!]] [return \"text\"] f";
    assert!(matches!(eval(src), Err(EvalError::ReturnType { .. })));
}

#[test]
fn test_func_rejects_variadic() {
    assert!(matches!(eval("func [args [<...>]] [args]"), Err(EvalError::BadSpec { .. })));
}

#[test]
fn test_missing_argument_at_end() {
    assert!(matches!(
        eval("add 1"),
        Err(EvalError::MissingArgument { ref param, .. }) if param.as_str() == "value2"
    ));
}

// ═══════════════════════════════════════════════════════════════════════
// Quoting Parameters
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_hard_quote_never_looks_up() {
    assert_eq!(eval_cell("the undefined-word"), Cell::word("undefined-word"));
}

#[test]
fn test_hard_quote_takes_groups_literally() {
    assert_eq!(eval_cell("the (1 + 2)").kind(), Kind::Group);
}

#[test]
fn test_soft_quote_escapes_groups() {
    let src = "f: func ['x] [x]";
    assert!(matches!(eval(&format!("{} f (1 + 2)", src)), Ok(Value::Integer(3))));
    assert!(matches!(eval(&format!("{} f foo", src)), Ok(Value::Word(ref s)) if s.as_str() == "foo"));
}

#[test]
fn test_modal_argument_switches_refinement() {
    let src = "f: func [@v /big] [either big [v * 10] [v]] n: 5";
    assert!(matches!(eval(&format!("{} f n", src)), Ok(Value::Integer(5))));
    assert!(matches!(eval(&format!("{} f @n", src)), Ok(Value::Integer(50))));
}

#[test]
fn test_variadic_sum() {
    assert!(matches!(eval("sum 1 2 3"), Ok(Value::Integer(6))));
    assert!(matches!(eval("sum"), Ok(Value::Integer(0))));
    assert!(matches!(eval("sum 1 + 2 3"), Ok(Value::Integer(6))));
}

#[test]
fn test_variadic_values_are_type_checked() {
    assert!(matches!(eval("sum 1 \"two\""), Err(EvalError::ArgumentType { .. })));
}

// ═══════════════════════════════════════════════════════════════════════
// Refinements
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_refinement_order_follows_call_site() {
    let src = "f: func [/a x /b y] [reduce [x y]]";
    assert_eq!(eval_cell(&format!("{} f/a/b 1 2", src)), block(&[1, 2]));
    assert_eq!(eval_cell(&format!("{} f/b/a 1 2", src)), block(&[2, 1]));
}

#[test]
fn test_unused_refinement_is_null() {
    let src = "f: func [/a x] [reduce [null? a null? x]] f";
    let expected = Cell::block(vec![Cell::logic(true), Cell::logic(true)]);
    assert_eq!(eval_cell(src), expected);
}

#[test]
fn test_used_refinement_is_true() {
    assert!(matches!(eval("f: func [/a] [a] f/a"), Ok(Value::Logic(true))));
}

#[test]
fn test_unknown_refinement() {
    assert!(matches!(
        eval("f: func [/a] [a] f/b"),
        Err(EvalError::BadRefinement { ref refinement, .. }) if refinement.as_str() == "b"
    ));
}

#[test]
fn test_duplicate_refinement() {
    assert!(matches!(eval("f: func [/a] [a] f/a/a"), Err(EvalError::DuplicateRefinement { .. })));
}

#[test]
fn test_bad_refinement_leaves_stack_clean() {
    let mut evaluator = Evaluator::new().unwrap();
    let result = evaluator.eval_str("f: func [/a x] [x] f/b/a 1");
    assert!(matches!(result, Err(EvalError::BadRefinement { .. })));
    assert!(evaluator.data_stack().is_empty());
    assert_eq!(evaluator.depth(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Type Checking
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_argument_type() {
    assert!(matches!(
        eval("add \"a\" 1"),
        Err(EvalError::ArgumentType { ref param, kind: "text!", .. }) if param.as_str() == "value1"
    ));
}

#[test]
fn test_typed_func_argument() {
    let src = "f: func [x [integer!]] [x]";
    assert!(matches!(eval(&format!("{} f 1", src)), Ok(Value::Integer(1))));
    assert!(matches!(eval(&format!("{} f 1.5", src)), Err(EvalError::ArgumentType { .. })));
}

#[test]
fn test_null_needs_opt() {
    assert!(matches!(eval("f: func [x [integer!]] [x] f null"), Err(EvalError::ArgumentType { .. })));
    assert!(matches!(eval("f: func [x [<opt> integer!]] [x] f null"), Ok(Value::Null)));
}

#[test]
fn test_hook_mutation_is_type_checked() {
    let mut evaluator = Evaluator::new().unwrap();
    evaluator.set_fulfill_hook(Some(Rc::new(|frame: &Frame| {
        if frame.label_string() == "add" {
            if let Some(varlist) = frame.varlist() {
                varlist.set_index(0, Cell::text("oops"));
            }
        }
        Ok(())
    })));
    let result = evaluator.eval_str("add 1 2");
    assert!(matches!(result, Err(EvalError::ArgumentType { kind: "text!", .. })));
}

#[test]
fn test_hook_sees_every_call() {
    let mut evaluator = Evaluator::new().unwrap();
    let seen = Rc::new(StdCell::new(0));
    let counter = Rc::clone(&seen);
    evaluator.set_fulfill_hook(Some(Rc::new(move |_frame: &Frame| {
        counter.set(counter.get() + 1);
        Ok(())
    })));
    let result = evaluator.eval_str("1 + 2 * 3").unwrap();
    assert_eq!(result, Cell::integer(9));
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_hook_error_aborts_call() {
    let mut evaluator = Evaluator::new().unwrap();
    evaluator.set_fulfill_hook(Some(Rc::new(|_frame: &Frame| Err(EvalError::protocol("vetoed")))));
    assert!(matches!(evaluator.eval_str("add 1 2"), Err(EvalError::Protocol { .. })));
    assert_eq!(evaluator.depth(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Redo
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unchecked_redo_skips_type_check() {
    let mut evaluator = Evaluator::new().unwrap();
    evaluator.user().define("retype", Cell::action(retyping_action(false)));
    let result = evaluator.eval_str("retype 1").unwrap();
    assert_eq!(result, Cell::text("retyped"));
}

#[test]
fn test_checked_redo_type_checks_again() {
    let mut evaluator = Evaluator::new().unwrap();
    evaluator.user().define("retype", Cell::action(retyping_action(true)));
    let result = evaluator.eval_str("retype 1");
    assert!(matches!(result, Err(EvalError::ArgumentType { kind: "text!", .. })));
}

#[test]
fn test_redo_as_derived_phase() {
    let mut evaluator = Evaluator::new().unwrap();
    let spec = parse_spec(&load("value [integer!]").unwrap()).unwrap();
    let base = Action::from_spec(spec, dispatcher(|_call| Ok(Bounce::Value(Cell::null()))));
    let second = Rc::new(base.derive(dispatcher(|call| {
        let value = call.integer("value")?;
        Ok(Bounce::Value(Cell::integer(value + 100)))
    })));
    let first = base.derive(dispatcher(move |call| call.redo_as(Rc::clone(&second), true)));
    evaluator.user().define("first", Cell::action(Rc::new(first.with_name("first"))));
    assert_eq!(evaluator.eval_str("first 1").unwrap(), Cell::integer(101));
}

#[test]
fn test_redo_as_incompatible_phase() {
    let mut evaluator = Evaluator::new().unwrap();
    let other = lib_action(&evaluator, "add").action;
    let spec = parse_spec(&load("value [integer!]").unwrap()).unwrap();
    let action = Action::from_spec(spec, dispatcher(move |call| call.redo_as(Rc::clone(&other), true)));
    evaluator.user().define("bad", Cell::action(Rc::new(action)));
    assert!(matches!(evaluator.eval_str("bad 1"), Err(EvalError::Protocol { .. })));
}

#[test]
fn test_redo_in_func_reruns_body() {
    let src = "count: 0 f: func [n] [count: count + 1 if n > 0 [n: n - 1 redo n] count] f 3";
    assert!(matches!(eval(src), Ok(Value::Integer(4))));
}

#[test]
fn test_redo_other_needs_shared_parameters() {
    let src = "f: func [n] [redo/other n :add] f 1";
    assert!(matches!(eval(src), Err(EvalError::Protocol { .. })));
}

#[test]
fn test_redo_outside_function() {
    assert!(matches!(eval("x: 1 redo x"), Err(EvalError::TypeError { .. })));
}

// ═══════════════════════════════════════════════════════════════════════
// Host Calls
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_call_positional() {
    let mut evaluator = Evaluator::new().unwrap();
    let add = lib_action(&evaluator, "add");
    let result = evaluator.call(&add, &[Cell::integer(2), Cell::integer(3)]).unwrap();
    assert_eq!(result, Cell::integer(5));
}

#[test]
fn test_call_too_many_arguments() {
    let mut evaluator = Evaluator::new().unwrap();
    let add = lib_action(&evaluator, "add");
    let result = evaluator.call(&add, &[Cell::integer(1), Cell::integer(2), Cell::integer(3)]);
    assert!(matches!(result, Err(EvalError::Protocol { .. })));
}

#[test]
fn test_call_type_checks() {
    let mut evaluator = Evaluator::new().unwrap();
    let add = lib_action(&evaluator, "add");
    let result = evaluator.call(&add, &[Cell::text("x"), Cell::integer(3)]);
    assert!(matches!(result, Err(EvalError::ArgumentType { .. })));
}

#[test]
fn test_apply_named() {
    let mut evaluator = Evaluator::new().unwrap();
    let subtract = lib_action(&evaluator, "subtract");
    let args = [
        (Symbol::new("value2"), Cell::integer(1)),
        (Symbol::new("value1"), Cell::integer(10)),
    ];
    assert_eq!(evaluator.apply(&subtract, &args).unwrap(), Cell::integer(9));
}

#[test]
fn test_apply_unknown_parameter() {
    let mut evaluator = Evaluator::new().unwrap();
    let add = lib_action(&evaluator, "add");
    let result = evaluator.apply(&add, &[(Symbol::new("value3"), Cell::integer(1))]);
    assert!(matches!(result, Err(EvalError::NoSuchParameter { .. })));
}

#[test]
fn test_apply_native() {
    assert!(matches!(eval("apply :subtract [value1: 10 value2: 4]"), Ok(Value::Integer(6))));
}

#[test]
fn test_apply_refinement() {
    let src = "f: func [/a x] [either a [x] [0]]";
    assert!(matches!(eval(&format!("{} apply :f [a: true x: 5]", src)), Ok(Value::Integer(5))));
    assert!(matches!(eval(&format!("{} apply :f []", src)), Ok(Value::Integer(0))));
}

#[test]
fn test_apply_argument_of_unused_refinement() {
    let src = "f: func [/a x] [x] apply :f [x: 5]";
    assert!(matches!(eval(src), Err(EvalError::UnusedRefinementArg { .. })));
}
