use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    context::Context,
    eval::eval_block,
    exception::{ErrorKind, EvalResult, Exception, Flow, RunResult},
    expressions::{Block, Loc, Param},
    value::Value,
};

/// A natively-implemented method, used by the built-in bindings the module
/// loader exposes (e.g. `system.io`). Receives the receiver, the evaluated
/// arguments, and the context; responsible for its own arity checking.
pub type NativeFn = fn(&Rc<ObjectInstance>, &[Value], &mut Context) -> EvalResult<Value>;

/// Signature metadata recorded for declared methods and consumed by the
/// protocol conformance check. Methods registered without it (the built-in
/// binding path) are visibility-checked but signature-unchecked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub params: Vec<Param>,
    pub return_type: String,
}

/// The implementation of one method.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// A method declared in source. The block is shared with the AST; the
    /// captures are the declaring module's top-level bindings, injected into
    /// the call scope when absent so imported objects keep seeing their own
    /// module's imports.
    Declared {
        params: Vec<Param>,
        block: Rc<Block>,
        captures: Rc<Vec<(String, Value)>>,
        loc: Loc,
    },
    Native(NativeFn),
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub body: MethodBody,
    /// Only methods marked `@external` may be invoked across object
    /// boundaries.
    pub external: bool,
    pub signature: Option<MethodSignature>,
}

/// A constructed instance of a declared `Object`, or the class template it
/// is cloned from. Method tables are fixed once the declaration has been
/// evaluated; properties are private per-instance storage reached only
/// through `this.<name>` inside method bodies.
#[derive(Debug)]
pub struct ObjectInstance {
    name: String,
    methods: IndexMap<String, MethodDef>,
    properties: RefCell<AHashMap<String, Value>>,
}

impl ObjectInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
            properties: RefCell::new(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a method on a template under construction.
    ///
    /// Method names are unique per object; a duplicate is a load-time
    /// `Redeclaration` error.
    pub fn add_method(&mut self, name: &str, def: MethodDef) -> RunResult<()> {
        if self.methods.contains_key(name) {
            return Err(Exception::new(
                ErrorKind::Redeclaration,
                format!("Object '{}' declares method '{name}' twice", self.name),
            ));
        }
        self.methods.insert(name.to_owned(), def);
        Ok(())
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.get(name)
    }

    /// Declared method names in declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// The first declared method, used by the imported-object-as-function
    /// convenience call.
    #[must_use]
    pub fn first_method_name(&self) -> Option<&str> {
        self.methods.keys().next().map(String::as_str)
    }

    /// Clones this class template into a fresh instance: same method table,
    /// independent property storage.
    #[must_use]
    pub fn instantiate(&self) -> Rc<Self> {
        Rc::new(Self {
            name: self.name.clone(),
            methods: self.methods.clone(),
            properties: RefCell::new(self.properties.borrow().clone()),
        })
    }

    // --- properties ------------------------------------------------------

    pub fn get_property(&self, name: &str) -> RunResult<Value> {
        self.properties.borrow().get(name).cloned().ok_or_else(|| {
            Exception::new(
                ErrorKind::UnknownProperty,
                format!("Object '{}' has no property '{name}'", self.name),
            )
        })
    }

    /// Creates or updates a property without arity or type checks.
    pub fn set_property(&self, name: &str, value: Value) {
        self.properties.borrow_mut().insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    // --- dispatch --------------------------------------------------------

    /// The only dispatch entry point.
    ///
    /// Checks existence, visibility (when `external_call` is set), and
    /// arity; then runs the body in a fresh scope with `this` bound to the
    /// receiver, under a `{Object}.{method}` call frame. Scope, receiver
    /// and frame are released on every exit path. A `Return` signal raised
    /// in the body terminates it and becomes the call's result.
    pub fn call_method(
        self: &Rc<Self>,
        name: &str,
        args: &[Value],
        ctx: &mut Context,
        external_call: bool,
    ) -> EvalResult<Value> {
        let Some(method) = self.methods.get(name) else {
            return Err(Exception::new(
                ErrorKind::UnknownMethod,
                format!("Object '{}' has no method '{name}'", self.name),
            )
            .into());
        };
        if external_call && !method.external {
            return Err(Exception::new(
                ErrorKind::Visibility,
                format!(
                    "Method '{name}' on object '{}' is not marked @external and cannot be \
                     called from outside the object",
                    self.name
                ),
            )
            .into());
        }
        match &method.body {
            MethodBody::Native(native) => {
                let native = *native;
                native(self, args, ctx)
            }
            MethodBody::Declared {
                params,
                block,
                captures,
                loc,
            } => {
                if args.len() != params.len() {
                    return Err(Exception::new(
                        ErrorKind::Arity,
                        format!(
                            "Method '{name}' expects {} arguments, got {}",
                            params.len(),
                            args.len()
                        ),
                    )
                    .into());
                }
                let params = params.clone();
                let block = Rc::clone(block);
                let captures = Rc::clone(captures);
                let frame_name = format!("{}.{name}", self.name);
                ctx.framed(frame_name, "MethodCall", *loc, |ctx| {
                    ctx.scoped(|ctx| {
                        for (capture_name, capture_value) in captures.iter() {
                            if !ctx.has_variable(capture_name) {
                                ctx.define_variable(capture_name, capture_value.clone())?;
                            }
                        }
                        for (param, arg) in params.iter().zip(args) {
                            ctx.define_variable(&param.name, arg.clone())?;
                        }
                        ctx.with_this(Rc::clone(self), |ctx| match eval_block(&block, ctx) {
                            Err(Flow::Return(value)) => Ok(value),
                            Err(Flow::Break) => Err(Exception::new(
                                ErrorKind::Syntax,
                                "'break' outside of a loop",
                            )
                            .into()),
                            other => other,
                        })
                    })
                })
            }
        }
    }
}
