use std::{cell::RefCell, rc::Rc};

use obiq::{Exception, NoPrint, RunOptions, Runner, Value};

fn run(source: &str) -> Result<Value, Exception> {
    let runner = Runner::new(source, "test.obq")?;
    runner.run_with_print(&RunOptions::default(), Rc::new(RefCell::new(NoPrint)))
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected Int, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence() {
    let result = run("Object Main { method main(): Int { return 3 + 4 * 2 } }").unwrap();
    assert_eq!(as_int(&result), 11);
}

#[test]
fn while_loop_accumulates() {
    let result = run(
        "Object Main {\n    method main(): Int {\n        x: Int = 0\n        i: Int = 1\n        \
         while (i <= 3) {\n            x = x + i\n            i = i + 1\n        }\n        \
         return x\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 6);
}

/// One `Runner` can execute repeatedly; each run starts from a fresh
/// context.
#[test]
fn repeat_exec() {
    let runner = Runner::new(
        "Object Main { method main(): Int { return 1 + 2 } }",
        "test.obq",
    )
    .unwrap();
    let options = RunOptions::default();

    let first = runner
        .run_with_print(&options, Rc::new(RefCell::new(NoPrint)))
        .unwrap();
    assert_eq!(as_int(&first), 3);

    let second = runner
        .run_with_print(&options, Rc::new(RefCell::new(NoPrint)))
        .unwrap();
    assert_eq!(as_int(&second), 3);
}

#[test]
fn program_args_are_bound_as_a_text_list() {
    let runner = Runner::new(
        "Object Main { method main(): Int { return __program_args__.size() } }",
        "test.obq",
    )
    .unwrap();
    let options = RunOptions {
        args: Some(vec!["alpha".to_owned(), "beta".to_owned()]),
        ..RunOptions::default()
    };
    let result = runner
        .run_with_print(&options, Rc::new(RefCell::new(NoPrint)))
        .unwrap();
    assert_eq!(as_int(&result), 2);
}

#[test]
fn absent_args_are_not_bound() {
    let err = run("Object Main { method main(): Int { return __program_args__.size() } }")
        .unwrap_err();
    assert_eq!(err.kind(), obiq::ErrorKind::Unresolved);
}

#[test]
fn program_without_main_is_rejected() {
    let err = run("Object Helper { method ping(): Int { return 1 } }").unwrap_err();
    assert!(err.message().contains("'Main' object as entry point"));
}

#[test]
fn main_without_main_method_is_rejected() {
    let err = run("Object Main { method start(): Int { return 1 } }").unwrap_err();
    assert!(err.message().contains("'main()' method"));
}

#[test]
fn non_int_results_map_to_exit_status_zero() {
    let result = run("Object Main { method main(): Text { return \"done\" } }").unwrap();
    assert_eq!(obiq::exit_status(&result), 0);
    let result = run("Object Main { method main(): Int { return 7 } }").unwrap();
    assert_eq!(obiq::exit_status(&result), 7);
}
