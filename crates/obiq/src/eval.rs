//! The single evaluator over the AST sums.
//!
//! Evaluation order is deterministic and source-directed: statements in
//! source order, expressions left-to-right, arguments left-to-right before
//! the call, short-circuit for `&&` and `||`. Non-local outcomes travel as
//! [`Flow`] signals: `Return` is consumed at the method-call boundary,
//! `Break` by the innermost `while`, and only `UserThrow` raises are
//! catchable by `try`/`catch`.

use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    context::Context,
    exception::{ErrorKind, EvalResult, Exception, Flow, RunResult},
    expressions::{
        BinaryOp, Block, CmpOp, Decl, ElseArm, Expr, ExprLoc, IfStmt, Literal, LogicalOp,
        ObjectDecl, Stmt, UnaryOp,
    },
    types::{
        EnumInstance, ErrorInstance, ListInstance, MapInstance, MethodBody, MethodDef,
        MethodSignature, ObjectInstance, ProtocolInstance, RecordType, ResultInstance,
        SetInstance,
    },
    value::Value,
};

// --- declarations --------------------------------------------------------

/// Builds the class-template [`ObjectInstance`] for an object declaration.
///
/// Methods close over the declaring module's visible top-level bindings, so
/// imported objects keep resolving their own imports when invoked from
/// another module. If the declaration names a protocol, the template is
/// validated against it here; failure is `ProtocolConformance` carrying the
/// accumulated diagnostics.
pub fn object_template(decl: &ObjectDecl, ctx: &mut Context) -> RunResult<Rc<ObjectInstance>> {
    let mut template = ObjectInstance::new(&decl.name);
    let captures = Rc::new(ctx.snapshot_bindings());

    if let Some(ctor) = &decl.constructor {
        template.add_method(
            "constructor",
            MethodDef {
                body: MethodBody::Declared {
                    params: ctor.params.clone(),
                    block: Rc::clone(&ctor.body),
                    captures: Rc::clone(&captures),
                    loc: ctor.loc,
                },
                external: false,
                signature: None,
            },
        )?;
    }
    for method in &decl.methods {
        template.add_method(
            &method.name,
            MethodDef {
                body: MethodBody::Declared {
                    params: method.params.clone(),
                    block: Rc::clone(&method.body),
                    captures: Rc::clone(&captures),
                    loc: method.loc,
                },
                external: method.external,
                signature: Some(MethodSignature {
                    params: method.params.clone(),
                    return_type: method.return_type.clone(),
                }),
            },
        )?;
    }

    let template = Rc::new(template);
    if let Some(protocol_name) = &decl.protocol {
        if !ctx.has_variable(protocol_name) {
            return Err(Exception::new(
                ErrorKind::Unresolved,
                format!("Protocol '{protocol_name}' not found"),
            ));
        }
        let Value::Protocol(protocol) = ctx.get_variable(protocol_name)? else {
            return Err(Exception::new(
                ErrorKind::TypeMismatch,
                format!("'{protocol_name}' is not a protocol"),
            ));
        };
        let errors = protocol.validation_errors(&template);
        if !errors.is_empty() {
            return Err(Exception::new(
                ErrorKind::ProtocolConformance,
                format!(
                    "Object '{}' does not implement all methods required by protocol '{}': {}",
                    decl.name,
                    protocol_name,
                    errors.join("; ")
                ),
            ));
        }
    }
    Ok(template)
}

/// Produces the runtime value of a non-namespace, non-import declaration and
/// the name to bind it under.
pub fn declaration_value(decl: &Decl, ctx: &mut Context) -> RunResult<(String, Value)> {
    match decl {
        Decl::Object(object) => {
            let template = object_template(object, ctx)?;
            Ok((object.name.clone(), Value::Object(template)))
        }
        Decl::Protocol(protocol) => Ok((
            protocol.name.clone(),
            Value::Protocol(Rc::new(ProtocolInstance::new(
                &protocol.name,
                protocol.signatures.clone(),
            ))),
        )),
        Decl::Record(record) => Ok((
            record.name.clone(),
            Value::RecordType(Rc::new(RecordType::new(&record.name, record.fields.clone()))),
        )),
        Decl::Enum(enumeration) => Ok((
            enumeration.name.clone(),
            Value::Enum(Rc::new(EnumInstance::new(
                &enumeration.name,
                &enumeration.members,
            ))),
        )),
        Decl::Namespace(_) | Decl::Import(_) => Err(Exception::new(
            ErrorKind::Syntax,
            "namespace and import declarations have no direct value",
        )),
    }
}

/// Evaluates a namespace body, registering each member under both its fully
/// qualified name and its short name in the enclosing context.
pub fn register_namespace(
    decl: &crate::expressions::NamespaceDecl,
    ctx: &mut Context,
) -> RunResult<()> {
    let full_namespace = decl.path.join(".");
    for member in &decl.body {
        let (name, value) = declaration_value(member, ctx)?;
        ctx.define_variable(&format!("{full_namespace}.{name}"), value.clone())?;
        ctx.define_variable(&name, value)?;
    }
    Ok(())
}

// --- statements ----------------------------------------------------------

/// Evaluates statements in order; the block's value is the last statement's
/// value, `Int(0)` when empty. `Return` propagates uncaught.
pub fn eval_block(block: &Block, ctx: &mut Context) -> EvalResult<Value> {
    let mut result = Value::Int(0);
    for stmt in &block.statements {
        result = eval_stmt(stmt, ctx)?;
    }
    Ok(result)
}

pub fn eval_stmt(stmt: &Stmt, ctx: &mut Context) -> EvalResult<Value> {
    match stmt {
        Stmt::VarDecl { name, init, .. } => {
            let value = eval_expr(init, ctx)?;
            ctx.define_variable(name, value.clone())?;
            Ok(value)
        }
        Stmt::ConstDecl { name, init, .. } => {
            let value = eval_expr(init, ctx)?;
            ctx.define_constant(name, value.clone())?;
            Ok(value)
        }
        Stmt::Assign { name, value, .. } => {
            let value = eval_expr(value, ctx)?;
            ctx.reassign_variable(name, value.clone())?;
            Ok(value)
        }
        Stmt::PropertyAssign { name, value, .. } => {
            if !ctx.has_this() {
                return Err(Exception::new(
                    ErrorKind::ThisOutOfContext,
                    format!("'this.{name}' can only be used inside object methods"),
                )
                .into());
            }
            let value = eval_expr(value, ctx)?;
            let this = ctx.current_this()?;
            this.set_property(name, value.clone());
            Ok(value)
        }
        Stmt::If(if_stmt) => eval_if(if_stmt, ctx),
        Stmt::While { cond, body, .. } => {
            loop {
                if !eval_expr(cond, ctx)?.is_truthy() {
                    break;
                }
                match eval_block(body, ctx) {
                    Ok(_) => {}
                    Err(Flow::Break) => break,
                    Err(other) => return Err(other),
                }
            }
            Ok(Value::Int(0))
        }
        Stmt::Break { .. } => Err(Flow::Break),
        Stmt::Return { value, .. } => {
            let result = match value {
                Some(expr) => eval_expr(expr, ctx)?,
                None => Value::Int(0),
            };
            Err(Flow::Return(result))
        }
        Stmt::Throw { value, loc } => ctx.framed("throw", "ThrowStatement", *loc, |ctx| {
            let thrown = eval_expr(value, ctx)?;
            let frames = ctx.capture_frames();
            Err(Flow::Raise(Exception::user_throw(thrown, frames)))
        }),
        Stmt::Try {
            body,
            catch,
            finally,
            ..
        } => eval_try(body, catch.as_ref(), finally.as_ref(), ctx),
        Stmt::Expr(expr) => eval_expr(expr, ctx),
    }
}

fn eval_if(if_stmt: &IfStmt, ctx: &mut Context) -> EvalResult<Value> {
    if eval_expr(&if_stmt.cond, ctx)?.is_truthy() {
        eval_block(&if_stmt.then_block, ctx)
    } else {
        match if_stmt.else_arm.as_deref() {
            Some(ElseArm::ElseIf(nested)) => eval_if(nested, ctx),
            Some(ElseArm::Else(block)) => eval_block(block, ctx),
            None => Ok(Value::Int(0)),
        }
    }
}

fn eval_try(
    body: &Block,
    catch: Option<&(String, Block)>,
    finally: Option<&Block>,
    ctx: &mut Context,
) -> EvalResult<Value> {
    let mut outcome = match eval_block(body, ctx) {
        Err(Flow::Raise(exc)) if exc.kind().is_catchable() && catch.is_some() => {
            let (variable, handler) = catch.expect("checked above");
            let caught = exc
                .payload()
                .cloned()
                .unwrap_or_else(|| Value::Text(exc.message().to_owned()));
            ctx.scoped(|ctx| {
                ctx.define_variable(variable, caught)?;
                eval_block(handler, ctx)
            })
        }
        other => other,
    };
    if let Some(finally_block) = finally {
        // finally runs on every exit path; its own raise supersedes any
        // in-flight outcome.
        if let Err(flow) = eval_block(finally_block, ctx) {
            outcome = Err(flow);
        }
    }
    outcome
}

// --- expressions ---------------------------------------------------------

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(v) => Value::Int(*v),
        Literal::Long(v) => Value::Long(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Double(v) => Value::Double(*v),
        Literal::Bool(v) => Value::Bool(*v),
        Literal::Char(c) => Value::Char(*c),
        Literal::Text(s) => Value::Text(s.clone()),
    }
}

fn eval_args(args: &[ExprLoc], ctx: &mut Context) -> EvalResult<SmallVec<[Value; 4]>> {
    let mut values = SmallVec::with_capacity(args.len());
    for arg in args {
        values.push(eval_expr(arg, ctx)?);
    }
    Ok(values)
}

/// Resolves a possibly dotted name: the full dotted form first, then the
/// last component.
fn resolve_dotted(ctx: &Context, name: &str) -> RunResult<Value> {
    if ctx.has_variable(name) {
        return ctx.get_variable(name);
    }
    if let Some((_, last)) = name.rsplit_once('.')
        && ctx.has_variable(last)
    {
        return ctx.get_variable(last);
    }
    Err(Exception::new(
        ErrorKind::Unresolved,
        format!("'{name}' not found in current context"),
    ))
}

pub fn eval_expr(expr: &ExprLoc, ctx: &mut Context) -> EvalResult<Value> {
    match &expr.expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),
        Expr::Identifier(name) => Ok(ctx.get_variable(name)?),
        Expr::This => Ok(Value::Object(ctx.current_this()?)),
        Expr::New { type_name, args } => eval_new(type_name, args, ctx),
        Expr::MethodCall {
            object,
            method,
            args,
        } => {
            // A call through `this` is the object calling itself; every
            // other receiver is an external call site.
            let external_call = !matches!(object.expr, Expr::This);
            let receiver = eval_expr(object, ctx)?;
            let arg_values = eval_args(args, ctx)?;
            call_on_value(&receiver, method, &arg_values, ctx, external_call)
        }
        Expr::MemberAccess { object, member } => {
            let receiver = match eval_expr(object, ctx) {
                Ok(value) => value,
                Err(Flow::Raise(exc)) if exc.kind() == ErrorKind::Unresolved => {
                    // The chain may be a qualified name registered by a
                    // namespace: try the full dotted form, then the last
                    // component.
                    if let Some(parts) = expr.expr.qualified_parts() {
                        return Ok(resolve_dotted(ctx, &parts.join("."))?);
                    }
                    return Err(Flow::Raise(exc));
                }
                Err(other) => return Err(other),
            };
            member_access(&receiver, member)
        }
        Expr::FunctionCall { name, args } => eval_function_call(name, args, ctx),
        Expr::RecordInit { type_name, fields } => {
            if !ctx.has_variable(type_name) {
                return Err(Exception::new(
                    ErrorKind::Unresolved,
                    format!("Undefined variable '{type_name}'"),
                )
                .into());
            }
            let Value::RecordType(record_type) = ctx.get_variable(type_name)? else {
                return Err(Exception::new(
                    ErrorKind::TypeMismatch,
                    format!("'{type_name}' is not a record type"),
                )
                .into());
            };
            let mut field_values = IndexMap::with_capacity(fields.len());
            for (field_name, field_expr) in fields {
                let value = eval_expr(field_expr, ctx)?;
                field_values.insert(field_name.clone(), value);
            }
            let instance = record_type.create_instance(field_values)?;
            Ok(Value::Record(Rc::new(instance)))
        }
        Expr::ListLit(elements) => {
            let values = eval_args(elements, ctx)?;
            let element_type = values.first().map(Value::type_name).unwrap_or_default();
            Ok(Value::List(Rc::new(ListInstance::from_values(
                element_type,
                values.into_vec(),
            ))))
        }
        Expr::MapLit(entries) => {
            let mut evaluated = Vec::with_capacity(entries.len());
            for (key_expr, value_expr) in entries {
                let key = eval_expr(key_expr, ctx)?;
                let value = eval_expr(value_expr, ctx)?;
                evaluated.push((key, value));
            }
            let (key_type, value_type) = evaluated
                .first()
                .map(|(k, v)| (k.type_name(), v.type_name()))
                .unwrap_or_default();
            let map = MapInstance::new(key_type, value_type);
            for (key, value) in evaluated {
                map.put(key, value);
            }
            Ok(Value::Map(Rc::new(map)))
        }
        Expr::SetLit(elements) => {
            let values = eval_args(elements, ctx)?;
            let element_type = values.first().map(Value::type_name).unwrap_or_default();
            let set = SetInstance::new(element_type);
            for value in values {
                set.add(value);
            }
            Ok(Value::Set(Rc::new(set)))
        }
        Expr::Binary { left, op, right } => {
            let left_value = eval_expr(left, ctx)?;
            let right_value = eval_expr(right, ctx)?;
            eval_binary(*op, &left_value, &right_value)
        }
        Expr::Comparison { left, op, right } => {
            let left_value = eval_expr(left, ctx)?;
            let right_value = eval_expr(right, ctx)?;
            eval_comparison(*op, &left_value, &right_value)
        }
        Expr::Logical { left, op, right } => {
            let frame_name = format!("logical_{}", op.symbol());
            ctx.framed(frame_name, "LogicalExpression", expr.loc, |ctx| {
                eval_logical(*op, left, right, ctx)
            })
        }
        Expr::Unary { op, operand } => {
            let frame_name = format!("unary_{}", op.symbol());
            ctx.framed(frame_name, "UnaryExpression", expr.loc, |ctx| {
                let value = eval_expr(operand, ctx)?;
                eval_unary(*op, &value)
            })
        }
    }
}

fn eval_new(type_name: &str, args: &[ExprLoc], ctx: &mut Context) -> EvalResult<Value> {
    // `Error` is a built-in constructor, not a declared object.
    if type_name == "Error" {
        let arg_values = eval_args(args, ctx)?;
        if let [Value::Text(message)] = arg_values.as_slice() {
            return Ok(Value::Error(Rc::new(ErrorInstance::new(message.clone()))));
        }
        return Err(Exception::new(
            ErrorKind::TypeMismatch,
            "Error constructor requires exactly one Text argument",
        )
        .into());
    }

    let class_value = resolve_dotted(ctx, type_name)?;
    let Value::Object(template) = class_value else {
        return Err(Exception::new(
            ErrorKind::TypeMismatch,
            format!("Cannot instantiate non-object type: {type_name}"),
        )
        .into());
    };

    let instance = template.instantiate();
    let arg_values = eval_args(args, ctx)?;
    if instance.has_method("constructor") {
        instance.call_method("constructor", &arg_values, ctx, false)?;
    } else if !arg_values.is_empty() {
        return Err(Exception::new(
            ErrorKind::Arity,
            format!("Object '{type_name}' has no constructor but arguments were provided"),
        )
        .into());
    }
    Ok(Value::Object(instance))
}

fn eval_function_call(name: &str, args: &[ExprLoc], ctx: &mut Context) -> EvalResult<Value> {
    // The two static Result forms are special-cased by name, mirroring
    // their special-casing in the parser.
    if name == "Result.success" || name == "Result.error" {
        if args.len() != 1 {
            return Err(Exception::new(
                ErrorKind::Arity,
                format!("{name} requires exactly one argument"),
            )
            .into());
        }
        let value = eval_expr(&args[0], ctx)?;
        let result = if name == "Result.success" {
            ResultInstance::success(value)
        } else {
            ResultInstance::error(value)
        };
        return Ok(Value::Result(Rc::new(result)));
    }

    // An imported object bound under this name may be called as a function:
    // its first declared method is invoked. Explicit `obj.method(args)` is
    // the recommended form.
    if ctx.has_variable(name)
        && let Value::Object(object) = ctx.get_variable(name)?
        && let Some(first_method) = object.first_method_name()
    {
        let first_method = first_method.to_owned();
        let arg_values = eval_args(args, ctx)?;
        return object.call_method(&first_method, &arg_values, ctx, false);
    }

    Err(Exception::new(
        ErrorKind::Unresolved,
        format!("Function '{name}' not found"),
    )
    .into())
}

/// `MethodCall` dispatch on the evaluated receiver; the built-in composites
/// carry their own method sets and ignore visibility.
fn call_on_value(
    receiver: &Value,
    method: &str,
    args: &[Value],
    ctx: &mut Context,
    external_call: bool,
) -> EvalResult<Value> {
    match receiver {
        Value::Object(object) => object.call_method(method, args, ctx, external_call),
        Value::List(list) => list.call_method(method, args),
        Value::Map(map) => map.call_method(method, args),
        Value::Set(set) => set.call_method(method, args),
        Value::Result(result) => result.call_method(method, args),
        Value::Error(error) => error.call_method(method, args),
        other => Err(Exception::new(
            ErrorKind::TypeMismatch,
            format!(
                "Cannot call method '{method}' on value of type {}",
                other.type_name()
            ),
        )
        .into()),
    }
}

/// `MemberAccess` dispatch: enum member, record field, or object property.
fn member_access(receiver: &Value, member: &str) -> EvalResult<Value> {
    match receiver {
        Value::Enum(enumeration) => enumeration.member_value(member).map(Value::Int).ok_or_else(
            || {
                Exception::new(
                    ErrorKind::UnknownMember,
                    format!(
                        "Enum '{}' has no member '{member}'",
                        enumeration.name()
                    ),
                )
                .into()
            },
        ),
        Value::Record(record) => Ok(record.get_field(member)?),
        Value::Object(object) => Ok(object.get_property(member)?),
        other => Err(Exception::new(
            ErrorKind::TypeMismatch,
            format!(
                "Cannot access member '{member}' on value of type {}",
                other.type_name()
            ),
        )
        .into()),
    }
}

fn type_mismatch(op: &str, left: &Value, right: &Value) -> Flow {
    Exception::new(
        ErrorKind::TypeMismatch,
        format!(
            "Cannot apply '{op}' to {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
    .into()
}

fn division_by_zero() -> Flow {
    Exception::new(ErrorKind::DivisionByZero, "Division by zero").into()
}

/// Arithmetic: numeric variants must match exactly and the result keeps the
/// operand variant; `+` additionally concatenates two `Text` values.
fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    use Value::{Double, Float, Int, Long, Text};
    match (op, left, right) {
        (BinaryOp::Add, Int(a), Int(b)) => Ok(Int(a.wrapping_add(*b))),
        (BinaryOp::Add, Long(a), Long(b)) => Ok(Long(a.wrapping_add(*b))),
        (BinaryOp::Add, Float(a), Float(b)) => Ok(Float(a + b)),
        (BinaryOp::Add, Double(a), Double(b)) => Ok(Double(a + b)),
        (BinaryOp::Add, Text(a), Text(b)) => Ok(Text(format!("{a}{b}"))),

        (BinaryOp::Sub, Int(a), Int(b)) => Ok(Int(a.wrapping_sub(*b))),
        (BinaryOp::Sub, Long(a), Long(b)) => Ok(Long(a.wrapping_sub(*b))),
        (BinaryOp::Sub, Float(a), Float(b)) => Ok(Float(a - b)),
        (BinaryOp::Sub, Double(a), Double(b)) => Ok(Double(a - b)),

        (BinaryOp::Mul, Int(a), Int(b)) => Ok(Int(a.wrapping_mul(*b))),
        (BinaryOp::Mul, Long(a), Long(b)) => Ok(Long(a.wrapping_mul(*b))),
        (BinaryOp::Mul, Float(a), Float(b)) => Ok(Float(a * b)),
        (BinaryOp::Mul, Double(a), Double(b)) => Ok(Double(a * b)),

        // Integer division by zero is an error; float division follows IEEE.
        (BinaryOp::Div, Int(_), Int(0)) => Err(division_by_zero()),
        (BinaryOp::Div, Int(a), Int(b)) => Ok(Int(a.wrapping_div(*b))),
        (BinaryOp::Div, Long(_), Long(0)) => Err(division_by_zero()),
        (BinaryOp::Div, Long(a), Long(b)) => Ok(Long(a.wrapping_div(*b))),
        (BinaryOp::Div, Float(a), Float(b)) => Ok(Float(a / b)),
        (BinaryOp::Div, Double(a), Double(b)) => Ok(Double(a / b)),

        // `%` is defined only for the integer variants.
        (BinaryOp::Mod, Int(_), Int(0)) => Err(division_by_zero()),
        (BinaryOp::Mod, Int(a), Int(b)) => Ok(Int(a.wrapping_rem(*b))),
        (BinaryOp::Mod, Long(_), Long(0)) => Err(division_by_zero()),
        (BinaryOp::Mod, Long(a), Long(b)) => Ok(Long(a.wrapping_rem(*b))),

        (op, left, right) => Err(type_mismatch(op.symbol(), left, right)),
    }
}

fn eval_comparison(op: CmpOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match op {
        CmpOp::Eq => return Ok(Value::Bool(left.equals(right))),
        CmpOp::NotEq => return Ok(Value::Bool(!left.equals(right))),
        _ => {}
    }
    // Ordering requires both operands to share one numeric variant, or both
    // be Text (lexicographic).
    let outcome = match (left, right) {
        (Value::Int(a), Value::Int(b)) => ordering_result(op, a.cmp(b)),
        (Value::Long(a), Value::Long(b)) => ordering_result(op, a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => float_ordering(op, (*a).into(), (*b).into()),
        (Value::Double(a), Value::Double(b)) => float_ordering(op, *a, *b),
        (Value::Text(a), Value::Text(b)) => ordering_result(op, a.cmp(b)),
        (left, right) => return Err(type_mismatch(op.symbol(), left, right)),
    };
    Ok(Value::Bool(outcome))
}

fn ordering_result(op: CmpOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::LtEq => ordering.is_le(),
        CmpOp::GtEq => ordering.is_ge(),
        CmpOp::Eq | CmpOp::NotEq => unreachable!("handled before ordering"),
    }
}

fn float_ordering(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::LtEq => a <= b,
        CmpOp::GtEq => a >= b,
        CmpOp::Eq | CmpOp::NotEq => unreachable!("handled before ordering"),
    }
}

/// Left-to-right with short-circuit; both operands must be `Bool` when
/// evaluated, the skipped one is never inspected.
fn eval_logical(
    op: LogicalOp,
    left: &ExprLoc,
    right: &ExprLoc,
    ctx: &mut Context,
) -> EvalResult<Value> {
    let Value::Bool(left_bool) = eval_expr(left, ctx)? else {
        return Err(Exception::new(
            ErrorKind::TypeMismatch,
            "Left operand of logical operator must be a Bool",
        )
        .into());
    };
    match op {
        LogicalOp::And if !left_bool => Ok(Value::Bool(false)),
        LogicalOp::Or if left_bool => Ok(Value::Bool(true)),
        _ => {
            let Value::Bool(right_bool) = eval_expr(right, ctx)? else {
                let side = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                return Err(Exception::new(
                    ErrorKind::TypeMismatch,
                    format!("Right operand of logical {side} must be a Bool"),
                )
                .into());
            };
            Ok(Value::Bool(right_bool))
        }
    }
}

/// `!` requires `Bool`; `-` requires a numeric variant and preserves it.
fn eval_unary(op: UnaryOp, value: &Value) -> EvalResult<Value> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(Exception::new(
            ErrorKind::TypeMismatch,
            format!(
                "NOT operator requires a Bool operand, got {}",
                other.type_name()
            ),
        )
        .into()),
        (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Long(v)) => Ok(Value::Long(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Neg, Value::Double(v)) => Ok(Value::Double(-v)),
        (UnaryOp::Neg, other) => Err(Exception::new(
            ErrorKind::TypeMismatch,
            format!(
                "Unary minus operator requires a numeric operand, got {}",
                other.type_name()
            ),
        )
        .into()),
    }
}
