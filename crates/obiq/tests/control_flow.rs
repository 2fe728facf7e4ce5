use std::{cell::RefCell, rc::Rc};

use obiq::{
    CollectStringPrint, ErrorKind, Exception, NoPrint, PrintWriter, RunOptions, Runner, Value,
};

fn run(source: &str) -> Result<Value, Exception> {
    let runner = Runner::new(source, "test.obq")?;
    runner.run_with_print(&RunOptions::default(), Rc::new(RefCell::new(NoPrint)))
}

/// Runs the program collecting print output, returning (result, output).
fn run_collect(source: &str) -> (Result<Value, Exception>, String) {
    let runner = match Runner::new(source, "test.obq") {
        Ok(runner) => runner,
        Err(err) => return (Err(err), String::new()),
    };
    let sink = Rc::new(RefCell::new(CollectStringPrint::new()));
    let dyn_sink: Rc<RefCell<dyn PrintWriter>> = sink.clone();
    let result = runner.run_with_print(&RunOptions::default(), dyn_sink);
    let output = sink.borrow().output().to_owned();
    (result, output)
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected Int, got {other:?}"),
    }
}

#[test]
fn assigning_to_a_constant_fails_immutability() {
    let err = run(
        "Object Main { method main(): Int { const k: Int = 1\nk = 2\nreturn k } }",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Immutability);
    assert!(err.message().contains("constant 'k'"));
}

#[test]
fn caught_throw_binds_the_value_and_finally_runs_once() {
    let (result, output) = run_collect(
        "import system.io\nObject Main {\n    method main(): Text {\n        try {\n            \
         throw(\"boom\")\n        } catch (e) {\n            return e\n        } finally {\n            \
         io.println(\"cleanup\")\n        }\n    }\n}",
    );
    let value = result.unwrap();
    assert!(matches!(value, Value::Text(ref s) if s == "boom"));
    assert_eq!(output, "cleanup\n");
}

#[test]
fn statements_between_throw_and_catch_do_not_execute() {
    let (result, output) = run_collect(
        "import system.io\nObject Main {\n    method main(): Int {\n        try {\n            \
         throw(\"x\")\n            io.println(\"unreachable\")\n        } catch (e) {\n            \
         io.println(\"handled\")\n        }\n        return 0\n    }\n}",
    );
    result.unwrap();
    assert_eq!(output, "handled\n");
}

#[test]
fn finally_runs_on_return_paths() {
    let (result, output) = run_collect(
        "import system.io\nObject Main {\n    method main(): Int {\n        try {\n            \
         return 1\n        } finally {\n            io.println(\"fin\")\n        }\n    }\n}",
    );
    assert_eq!(as_int(&result.unwrap()), 1);
    assert_eq!(output, "fin\n");
}

#[test]
fn finally_runs_on_uncaught_errors() {
    let (result, output) = run_collect(
        "import system.io\nObject Main {\n    method main(): Int {\n        try {\n            \
         return 1 / 0\n        } finally {\n            io.println(\"fin\")\n        }\n    }\n}",
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::DivisionByZero);
    assert_eq!(output, "fin\n");
}

#[test]
fn finally_runs_on_break_paths() {
    let (result, output) = run_collect(
        "import system.io\nObject Main {\n    method main(): Int {\n        i: Int = 0\n        \
         while (true) {\n            try {\n                break\n            } finally {\n                \
         io.println(\"fin\")\n            }\n        }\n        return i\n    }\n}",
    );
    assert_eq!(as_int(&result.unwrap()), 0);
    assert_eq!(output, "fin\n");
}

#[test]
fn a_raise_in_finally_supersedes_the_in_flight_outcome() {
    let err = run(
        "Object Main {\n    method main(): Text {\n        try {\n            throw(\"a\")\n        \
         } catch (e) {\n            return \"caught\"\n        } finally {\n            \
         throw(\"b\")\n        }\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserThrow);
    assert_eq!(err.message(), "b");
}

#[test]
fn fatal_errors_are_not_catchable() {
    let err = run(
        "Object Main {\n    method main(): Int {\n        try {\n            return 1 / 0\n        \
         } catch (e) {\n            return 2\n        }\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivisionByZero);
}

#[test]
fn thrown_error_instances_keep_their_message() {
    let result = run(
        "Object Main {\n    method main(): Text {\n        try {\n            throw(new \
         Error(\"bad input\"))\n        } catch (e) {\n            return e.getMessage()\n        \
         }\n    }\n}",
    )
    .unwrap();
    assert!(matches!(result, Value::Text(ref s) if s == "bad input"));
}

#[test]
fn break_terminates_only_the_innermost_loop() {
    let result = run(
        "Object Main {\n    method main(): Int {\n        total: Int = 0\n        i: Int = 0\n        \
         while (i < 3) {\n            j: Int = 0\n            while (true) {\n                j = \
         j + 1\n                if (j == 2) {\n                    break\n                \
         }\n            }\n            total = total + j\n            i = i + 1\n        }\n        \
         return total\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 6);
}

#[test]
fn nested_try_catches_at_the_inner_level() {
    let result = run(
        "Object Main {\n    method main(): Text {\n        try {\n            try {\n                \
         throw(\"inner\")\n            } catch (e) {\n                return \"caught \" + \
         e\n            }\n        } catch (e) {\n            return \"outer\"\n        }\n    \
         }\n}",
    )
    .unwrap();
    assert!(matches!(result, Value::Text(ref s) if s == "caught inner"));
}

#[test]
fn uncaught_user_throw_reports_throw_site_frames() {
    let err = run(
        "Object Main {\n    method main(): Int {\n        throw(\"kaboom\")\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserThrow);
    assert_eq!(err.message(), "kaboom");
    let rendered = err.to_string();
    assert!(rendered.contains("at throw (test.obq:"));
    assert!(rendered.contains("at Main.main (test.obq:"));
}

#[test]
fn return_inside_while_returns_from_the_method() {
    let result = run(
        "Object Main {\n    method main(): Int {\n        i: Int = 0\n        while (true) {\n            \
         i = i + 1\n            if (i == 4) {\n                return i\n            }\n        \
         }\n        return -1\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 4);
}
