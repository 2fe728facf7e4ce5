use std::{cell::RefCell, rc::Rc};

use obiq::{
    Context, ErrorKind, EvalResult, Exception, MethodBody, MethodDef, NoPrint, ObjectInstance,
    Param, ProtocolInstance, ProtocolSignature, RunOptions, Runner, Value,
};

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

const PROTOCOL_GO: &str = "Protocol P {\n    method go(): Int\n}\n";

#[test]
fn external_method_call_through_protocol_object() {
    let result = run(&format!(
        "{PROTOCOL_GO}Object O : P {{\n    @external method go(): Int {{\n        return 7\n    \
         }}\n}}\nObject Main {{\n    method main(): Int {{\n        return new O().go()\n    \
         }}\n}}"
    ))
    .unwrap();
    assert_eq!(as_int(&result), 7);
}

/// Removing `@external` still satisfies the protocol (visibility is not
/// part of conformance), but the external invocation fails.
#[test]
fn non_external_method_satisfies_protocol_but_rejects_external_calls() {
    let err = run(&format!(
        "{PROTOCOL_GO}Object O : P {{\n    method go(): Int {{\n        return 7\n    \
         }}\n}}\nObject Main {{\n    method main(): Int {{\n        return new O().go()\n    \
         }}\n}}"
    ))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Visibility);
    assert!(err.message().contains("not marked @external"));
}

#[test]
fn missing_protocol_method_fails_conformance() {
    let err = run(&format!(
        "{PROTOCOL_GO}Object O : P {{\n    @external method other(): Int {{\n        return 1\n    \
         }}\n}}\nObject Main {{\n    method main(): Int {{\n        return 0\n    }}\n}}"
    ))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolConformance);
    assert!(err.message().contains("Missing method: go"));
}

#[test]
fn signature_mismatch_fails_conformance_with_diagnostics() {
    let err = run(
        "Protocol P {\n    method go(x: Int): Int\n}\nObject O : P {\n    @external method go(x: \
         Text): Int {\n        return 1\n    }\n}\nObject Main {\n    method main(): Int {\n        \
         return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolConformance);
    assert!(err.message().contains("parameter 0 type mismatch"));
    assert!(err.message().contains("expected 'Int', got 'Text'"));
}

#[test]
fn return_type_mismatch_fails_conformance() {
    let err = run(&format!(
        "{PROTOCOL_GO}Object O : P {{\n    @external method go(): Text {{\n        return \
         \"x\"\n    }}\n}}\nObject Main {{\n    method main(): Int {{\n        return 0\n    \
         }}\n}}"
    ))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolConformance);
    assert!(err.message().contains("return type mismatch"));
}

#[test]
fn undeclared_protocol_is_unresolved() {
    let err = run(
        "Object O : Ghost {\n    method go(): Int {\n        return 1\n    }\n}\nObject Main {\n    \
         method main(): Int {\n        return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unresolved);
    assert!(err.message().contains("Protocol 'Ghost' not found"));
}

/// Methods registered without signature metadata (the built-in binding
/// path) satisfy a protocol by presence alone.
#[test]
fn protocol_accepts_methods_without_signature_metadata() {
    fn answer(
        _this: &Rc<ObjectInstance>,
        _args: &[Value],
        _ctx: &mut Context,
    ) -> EvalResult<Value> {
        Ok(Value::Int(42))
    }

    let mut object = ObjectInstance::new("Native");
    object
        .add_method(
            "go",
            MethodDef {
                body: MethodBody::Native(answer),
                external: true,
                signature: None,
            },
        )
        .unwrap();

    let protocol = ProtocolInstance::new(
        "P",
        vec![ProtocolSignature {
            name: "go".to_owned(),
            params: vec![Param {
                name: "x".to_owned(),
                type_name: "Int".to_owned(),
            }],
            return_type: "Int".to_owned(),
        }],
    );
    assert!(protocol.is_implemented_by(&object));
    assert!(protocol.validation_errors(&object).is_empty());
}

#[test]
fn constructor_runs_once_and_properties_persist() {
    let result = run(
        "Object Counter {\n    property count: Int\n    constructor(start: Int) {\n        \
         this.count = start\n    }\n    @external method increment(): Int {\n        this.count \
         = this.count + 1\n        return this.count\n    }\n}\nObject Main {\n    method main(): \
         Int {\n        c: Counter = new Counter(5)\n        c.increment()\n        return \
         c.increment()\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 7);
}

#[test]
fn constructor_arity_is_checked() {
    let err = run(
        "Object Counter {\n    constructor(start: Int) {\n        this.count = start\n    \
         }\n}\nObject Main {\n    method main(): Int {\n        c: Counter = new Counter()\n        \
         return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
}

#[test]
fn args_without_constructor_fail() {
    let err = run(
        "Object Bare {\n    @external method ping(): Int {\n        return 1\n    }\n}\nObject \
         Main {\n    method main(): Int {\n        b: Bare = new Bare(1)\n        return 0\n    \
         }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert!(err.message().contains("has no constructor"));
}

#[test]
fn internal_methods_are_callable_through_this() {
    let result = run(
        "Object Calc {\n    method helper(): Int {\n        return 21\n    }\n    @external \
         method total(): Int {\n        return this.helper() * 2\n    }\n}\nObject Main {\n    \
         method main(): Int {\n        return new Calc().total()\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 42);
}

#[test]
fn method_arity_is_checked() {
    let err = run(
        "Object Calc {\n    @external method add(a: Int, b: Int): Int {\n        return a + b\n    \
         }\n}\nObject Main {\n    method main(): Int {\n        return new Calc().add(1)\n    \
         }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert!(err.message().contains("expects 2 arguments, got 1"));
}

#[test]
fn unknown_method_and_property() {
    let err = run(
        "Object O {\n    @external method go(): Int {\n        return 1\n    }\n}\nObject Main \
         {\n    method main(): Int {\n        return new O().stop()\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownMethod);

    let err = run(
        "Object O {\n    @external method go(): Int {\n        return 1\n    }\n}\nObject Main \
         {\n    method main(): Int {\n        o: O = new O()\n        return o.ghost\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProperty);
}

#[test]
fn duplicate_method_names_are_a_load_time_error() {
    let err = run(
        "Object O {\n    method go(): Int {\n        return 1\n    }\n    method go(): Int {\n        \
         return 2\n    }\n}\nObject Main {\n    method main(): Int {\n        return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Redeclaration);
}

#[test]
fn objects_compare_by_identity_and_share_mutation() {
    let result = run(
        "Object Box {\n    property v: Int\n    constructor() {\n        this.v = 0\n    }\n    \
         @external method bump(): Int {\n        this.v = this.v + 1\n        return this.v\n    \
         }\n    @external method value(): Int {\n        return this.v\n    }\n}\nObject Main {\n    \
         method main(): Int {\n        a: Box = new Box()\n        b: Box = a\n        \
         b.bump()\n        if (a == b) {\n            return a.value()\n        }\n        return \
         -1\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 1);

    let result = run(
        "Object Box {\n    @external method ping(): Int {\n        return 1\n    }\n}\nObject \
         Main {\n    method main(): Bool {\n        return new Box() == new Box()\n    }\n}",
    )
    .unwrap();
    assert!(matches!(result, Value::Bool(false)));
}

#[test]
fn instantiating_a_non_object_fails() {
    let err = run(
        "Record R {\n    a: Int\n}\nObject Main {\n    method main(): Int {\n        x: R = new \
         R()\n        return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert!(err.message().contains("Cannot instantiate non-object type"));
}
