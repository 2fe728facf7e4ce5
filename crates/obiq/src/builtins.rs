//! Native bindings surfaced through the module loader.
//!
//! `system.io` is the one built-in unit: an object whose methods are native
//! functions registered without signature metadata, exercising the
//! signature-unchecked compatibility path of the protocol checker and the
//! visibility rules exactly like declared methods do.

use std::rc::Rc;

use crate::{
    context::Context,
    exception::EvalResult,
    types::{MethodBody, MethodDef, NativeFn, ObjectInstance},
    value::Value,
};

fn join_stringified(args: &[Value]) -> String {
    args.iter()
        .map(Value::stringify)
        .collect::<Vec<_>>()
        .join(" ")
}

fn io_print(_this: &Rc<ObjectInstance>, args: &[Value], ctx: &mut Context) -> EvalResult<Value> {
    ctx.out().borrow_mut().write(&join_stringified(args));
    Ok(Value::Int(0))
}

fn io_println(_this: &Rc<ObjectInstance>, args: &[Value], ctx: &mut Context) -> EvalResult<Value> {
    ctx.out().borrow_mut().writeln(&join_stringified(args));
    Ok(Value::Int(0))
}

/// The `system.io` object: `@external print` / `println` writing through the
/// context's print sink.
pub fn system_io() -> Rc<ObjectInstance> {
    let mut io = ObjectInstance::new("io");
    let native = |f: NativeFn| MethodDef {
        body: MethodBody::Native(f),
        external: true,
        signature: None,
    };
    io.add_method("print", native(io_print))
        .expect("fresh object has no methods");
    io.add_method("println", native(io_println))
        .expect("fresh object has no methods");
    Rc::new(io)
}
