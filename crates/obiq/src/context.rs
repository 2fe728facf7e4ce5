use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    exception::{ErrorKind, EvalResult, Exception, Flow, RunResult, StackFrame},
    expressions::Loc,
    io::PrintWriter,
    types::ObjectInstance,
    value::Value,
};

/// Whether a binding may be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Constant,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    kind: BindingKind,
    /// Declaration ordinal within the owning scope, for shadowing
    /// diagnostics.
    ordinal: u32,
}

#[derive(Debug, Default)]
struct Scope {
    bindings: AHashMap<String, Binding>,
    next_ordinal: u32,
}

/// Lexically-scoped execution state of a running module.
///
/// Owns the scope chain with constants tracking, the `this` stack pushed on
/// method entry, and the call-frame stack captured into errors for traces.
/// Strictly single-owner and single-threaded; the evaluator passes it down
/// by `&mut` and the guard helpers (`scoped`, `framed`, `with_this`)
/// guarantee the matching pop on every exit path, including propagated
/// failures.
pub struct Context {
    file: String,
    scopes: Vec<Scope>,
    this_stack: Vec<Rc<ObjectInstance>>,
    frames: Vec<StackFrame>,
    out: Rc<RefCell<dyn PrintWriter>>,
}

impl Context {
    pub fn new(file: impl Into<String>, out: Rc<RefCell<dyn PrintWriter>>) -> Self {
        Self {
            file: file.into(),
            scopes: vec![Scope::default()],
            this_stack: Vec::new(),
            frames: Vec::new(),
            out,
        }
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The print sink shared with the `system.io` binding.
    #[must_use]
    pub fn out(&self) -> Rc<RefCell<dyn PrintWriter>> {
        Rc::clone(&self.out)
    }

    // --- scopes ----------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// # Panics
    /// Panics when asked to pop the global scope; that is an interpreter
    /// bug, not a user error.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "attempted to pop the global scope");
        self.scopes.pop();
    }

    /// Runs `f` inside a fresh scope, popping it on every exit path.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Binds `name` as a variable in the innermost scope.
    ///
    /// Shadowing a variable from an outer scope is permitted; colliding with
    /// a constant anywhere in the chain is `Redeclaration`.
    pub fn define_variable(&mut self, name: &str, value: Value) -> RunResult<()> {
        self.check_constant_collision(name)?;
        self.insert(name, value, BindingKind::Variable);
        Ok(())
    }

    /// Binds `name` as a constant in the innermost scope, with the identical
    /// duplicate check.
    pub fn define_constant(&mut self, name: &str, value: Value) -> RunResult<()> {
        self.check_constant_collision(name)?;
        self.insert(name, value, BindingKind::Constant);
        Ok(())
    }

    /// Reassigns an existing variable, innermost binding wins.
    ///
    /// Fails `Immutability` when the target is a constant and `Unresolved`
    /// when the name is nowhere bound.
    pub fn reassign_variable(&mut self, name: &str, value: Value) -> RunResult<()> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.bindings.get_mut(name) {
                if binding.kind == BindingKind::Constant {
                    return Err(Exception::new(
                        ErrorKind::Immutability,
                        format!("Cannot reassign constant '{name}'"),
                    ));
                }
                binding.value = value;
                return Ok(());
            }
        }
        Err(Exception::new(
            ErrorKind::Unresolved,
            format!("Cannot assign to undefined variable '{name}'"),
        ))
    }

    /// Innermost-match lookup.
    pub fn get_variable(&self, name: &str) -> RunResult<Value> {
        self.lookup(name).cloned().ok_or_else(|| {
            Exception::new(
                ErrorKind::Unresolved,
                format!("Undefined variable '{name}'"),
            )
        })
    }

    /// Non-throwing existence check.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// The visible bindings, innermost scope winning for shadowed names, in
    /// a stable outer-to-inner order. Used to close object methods over the
    /// declaring module's top-level imports.
    #[must_use]
    pub fn snapshot_bindings(&self) -> Vec<(String, Value)> {
        let mut visible: IndexMap<String, Value> = IndexMap::new();
        for scope in &self.scopes {
            for (name, binding) in &scope.bindings {
                visible.insert(name.clone(), binding.value.clone());
            }
        }
        visible.into_iter().collect()
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
            .map(|binding| &binding.value)
    }

    fn check_constant_collision(&self, name: &str) -> RunResult<()> {
        for scope in &self.scopes {
            if let Some(existing) = scope.bindings.get(name)
                && existing.kind == BindingKind::Constant
            {
                return Err(Exception::new(
                    ErrorKind::Redeclaration,
                    format!(
                        "'{name}' is already declared as a constant (declaration #{})",
                        existing.ordinal
                    ),
                ));
            }
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, value: Value, kind: BindingKind) {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        let ordinal = scope.next_ordinal;
        scope.next_ordinal += 1;
        scope.bindings.insert(
            name.to_owned(),
            Binding {
                value,
                kind,
                ordinal,
            },
        );
    }

    // --- `this` ----------------------------------------------------------

    pub fn push_this(&mut self, object: Rc<ObjectInstance>) {
        self.this_stack.push(object);
    }

    pub fn pop_this(&mut self) {
        self.this_stack.pop();
    }

    /// The receiver of the innermost method body.
    pub fn current_this(&self) -> RunResult<Rc<ObjectInstance>> {
        self.this_stack.last().cloned().ok_or_else(|| {
            Exception::new(
                ErrorKind::ThisOutOfContext,
                "'this' can only be used inside object methods",
            )
        })
    }

    #[must_use]
    pub fn has_this(&self) -> bool {
        !self.this_stack.is_empty()
    }

    /// Runs `f` with `object` as the current receiver, popping on every
    /// exit path.
    pub fn with_this<T>(
        &mut self,
        object: Rc<ObjectInstance>,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.push_this(object);
        let result = f(self);
        self.pop_this();
        result
    }

    // --- call frames -----------------------------------------------------

    pub fn push_frame(&mut self, function: impl Into<String>, node_kind: &'static str, loc: Loc) {
        self.frames.push(StackFrame {
            function: function.into(),
            node_kind,
            file: self.file.clone(),
            loc,
        });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// The current frame vector, innermost first, for error payloads.
    #[must_use]
    pub fn capture_frames(&self) -> Vec<StackFrame> {
        self.frames.iter().rev().cloned().collect()
    }

    /// Runs `f` under a named call frame.
    ///
    /// The frame is popped on every exit path; an error propagating out that
    /// does not yet carry a trace captures the frame vector here, while the
    /// raising frame is still on the stack.
    pub fn framed<T>(
        &mut self,
        function: impl Into<String>,
        node_kind: &'static str,
        loc: Loc,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.push_frame(function, node_kind, loc);
        let result = match f(self) {
            Err(Flow::Raise(mut exc)) => {
                exc.freeze_frames(|| self.capture_frames());
                Err(Flow::Raise(exc))
            }
            other => other,
        };
        self.pop_frame();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;

    fn ctx() -> Context {
        Context::new("test.obq", Rc::new(RefCell::new(NoPrint)))
    }

    #[test]
    fn shadowing_a_variable_is_permitted() {
        let mut ctx = ctx();
        ctx.define_variable("x", Value::Int(1)).unwrap();
        ctx.push_scope();
        ctx.define_variable("x", Value::Int(2)).unwrap();
        assert!(Value::Int(2).equals(&ctx.get_variable("x").unwrap()));
        ctx.pop_scope();
        assert!(Value::Int(1).equals(&ctx.get_variable("x").unwrap()));
    }

    #[test]
    fn constant_blocks_redeclaration_in_inner_scopes() {
        let mut ctx = ctx();
        ctx.define_constant("k", Value::Int(1)).unwrap();
        ctx.push_scope();
        let err = ctx.define_variable("k", Value::Int(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Redeclaration);
        let err = ctx.define_constant("k", Value::Int(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Redeclaration);
    }

    #[test]
    fn reassign_walks_to_the_innermost_binding() {
        let mut ctx = ctx();
        ctx.define_variable("x", Value::Int(1)).unwrap();
        ctx.push_scope();
        ctx.define_variable("x", Value::Int(2)).unwrap();
        ctx.reassign_variable("x", Value::Int(3)).unwrap();
        assert!(Value::Int(3).equals(&ctx.get_variable("x").unwrap()));
        ctx.pop_scope();
        assert!(Value::Int(1).equals(&ctx.get_variable("x").unwrap()));
    }

    #[test]
    fn reassigning_a_constant_fails_immutability() {
        let mut ctx = ctx();
        ctx.define_constant("k", Value::Int(1)).unwrap();
        let err = ctx.reassign_variable("k", Value::Int(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Immutability);
    }

    #[test]
    fn reassigning_an_unbound_name_fails_unresolved() {
        let mut ctx = ctx();
        let err = ctx.reassign_variable("ghost", Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unresolved);
    }

    #[test]
    fn scoped_pops_on_error_paths() {
        let mut ctx = ctx();
        let result: EvalResult<()> = ctx.scoped(|ctx| {
            ctx.define_variable("tmp", Value::Int(1))?;
            Err(Flow::Break)
        });
        assert!(matches!(result, Err(Flow::Break)));
        assert!(!ctx.has_variable("tmp"));
    }

    #[test]
    fn this_outside_method_fails() {
        let ctx = ctx();
        let err = ctx.current_this().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ThisOutOfContext);
    }

    #[test]
    fn framed_freezes_trace_innermost_first() {
        let mut ctx = ctx();
        let result: EvalResult<()> = ctx.framed("outer", "MethodCall", Loc::new(1, 1), |ctx| {
            ctx.framed("inner", "MethodCall", Loc::new(2, 5), |_| {
                Err(Exception::new(ErrorKind::TypeMismatch, "boom").into())
            })
        });
        let Err(Flow::Raise(exc)) = result else {
            panic!("expected raise");
        };
        assert_eq!(exc.frames().len(), 2);
        assert_eq!(exc.frames()[0].function, "inner");
        assert_eq!(exc.frames()[1].function, "outer");
        assert!(ctx.capture_frames().is_empty());
    }
}
