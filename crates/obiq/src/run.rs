//! Public interface for running obiq programs.

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use crate::{
    context::Context,
    eval::{declaration_value, register_namespace},
    exception::{ErrorKind, Exception, Flow, RunResult},
    expressions::{Decl, ImportDecl, ImportSelector, Program},
    io::{PrintWriter, StdPrint},
    modules::ModuleLoader,
    parse::parse_program,
    types::ListInstance,
    value::Value,
};

/// Name under which host-supplied program arguments are bound, as a
/// `List<Text>`, before the execute pass.
pub const PROGRAM_ARGS_NAME: &str = "__program_args__";

/// Filesystem roots and program arguments for one execution.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root for `import` (system) resolution.
    pub system_root: PathBuf,
    /// Root for `@import` (user-project) resolution.
    pub project_root: PathBuf,
    /// Program arguments; bound as `__program_args__` when present.
    pub args: Option<Vec<String>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            system_root: PathBuf::from("."),
            project_root: PathBuf::from("."),
            args: None,
        }
    }
}

/// Primary interface for running obiq code.
///
/// Parsing happens once in [`Runner::new`]; each [`Runner::run`] call
/// executes the parsed module from a fresh context, in two passes: register
/// all top-level declarations, then invoke `Main.main()`.
///
/// # Example
/// ```
/// use obiq::{RunOptions, Runner, Value};
///
/// let runner = Runner::new(
///     "Object Main { method main(): Int { return 3 + 4 * 2 } }",
///     "example.obq",
/// )
/// .unwrap();
/// let result = runner.run(&RunOptions::default()).unwrap();
/// assert!(matches!(result, Value::Int(11)));
/// ```
#[derive(Debug)]
pub struct Runner {
    source: String,
    script_name: String,
    program: Program,
}

impl Runner {
    /// Parses `code`; `script_name` appears in stack traces.
    pub fn new(code: impl Into<String>, script_name: &str) -> RunResult<Self> {
        let source = code.into();
        let program = parse_program(&source)?;
        Ok(Self {
            source,
            script_name: script_name.to_owned(),
            program,
        })
    }

    /// The source text this runner was created from.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the program, printing through stdout.
    pub fn run(&self, options: &RunOptions) -> RunResult<Value> {
        self.run_with_print(options, Rc::new(RefCell::new(StdPrint)))
    }

    /// Runs the program with a caller-supplied print sink.
    pub fn run_with_print(
        &self,
        options: &RunOptions,
        print: Rc<RefCell<dyn PrintWriter>>,
    ) -> RunResult<Value> {
        let mut ctx = Context::new(&self.script_name, print);
        let mut loader =
            ModuleLoader::new(options.system_root.clone(), options.project_root.clone());

        // Register pass: every top-level declaration binds into the global
        // context; namespaces first, everything else in source order.
        register_program(&self.program, &mut ctx, &mut loader)?;

        let has_main = self
            .program
            .decls
            .iter()
            .any(|decl| matches!(decl, Decl::Object(object) if object.name == "Main"));
        if !has_main {
            return Err(Exception::new(
                ErrorKind::Unresolved,
                "Program must contain a 'Main' object as entry point",
            ));
        }

        if let Some(args) = &options.args {
            let list = ListInstance::from_values(
                "Text",
                args.iter().map(|arg| Value::Text(arg.clone())).collect(),
            );
            ctx.define_variable(PROGRAM_ARGS_NAME, Value::List(Rc::new(list)))?;
        }

        // Execute pass: Main.main() with no arguments.
        let Value::Object(main) = ctx.get_variable("Main")? else {
            return Err(Exception::new(
                ErrorKind::TypeMismatch,
                "Main is not an object instance",
            ));
        };
        if !main.has_method("main") {
            return Err(Exception::new(
                ErrorKind::Unresolved,
                "Main object must have a 'main()' method",
            ));
        }
        match main.call_method("main", &[], &mut ctx, false) {
            Ok(value) | Err(Flow::Return(value)) => Ok(value),
            Err(Flow::Break) => Err(Exception::new(
                ErrorKind::Syntax,
                "'break' outside of a loop",
            )),
            Err(Flow::Raise(mut exc)) => {
                exc.freeze_frames(|| ctx.capture_frames());
                Err(exc)
            }
        }
    }
}

/// Registers a module's top-level declarations into `ctx`: namespace
/// declarations first, then objects, enums, records, protocols and imports
/// interleaved in source order. Shared between the driver and the module
/// loader, which runs it for every imported unit.
pub fn register_program(
    program: &Program,
    ctx: &mut Context,
    loader: &mut ModuleLoader,
) -> RunResult<()> {
    for decl in &program.decls {
        if let Decl::Namespace(namespace) = decl {
            register_namespace(namespace, ctx)?;
        }
    }
    for decl in &program.decls {
        match decl {
            Decl::Namespace(_) => {}
            Decl::Import(import) => register_import(import, ctx, loader)?,
            decl => {
                let (name, value) = declaration_value(decl, ctx)?;
                ctx.define_variable(&name, value)?;
            }
        }
    }
    Ok(())
}

fn register_import(
    import: &ImportDecl,
    ctx: &mut Context,
    loader: &mut ModuleLoader,
) -> RunResult<()> {
    match &import.path.selector {
        ImportSelector::Wildcard => {
            for (name, value) in loader.load_all_methods(&import.path, ctx)? {
                ctx.define_variable(&name, value)?;
            }
        }
        ImportSelector::Object | ImportSelector::Method(_) => {
            let resolved = loader.load_method(&import.path, ctx)?;
            ctx.define_variable(&resolved.object_name, resolved.value.clone())?;
            if let Some(method) = &resolved.method {
                let alias = format!("{}_{method}", resolved.object_name);
                ctx.define_variable(&alias, resolved.value.clone())?;
            }
        }
    }
    Ok(())
}

/// Conventional process exit status for a program result: the `Int`
/// variant's value, anything else is 0.
#[must_use]
pub fn exit_status(value: &Value) -> i32 {
    match value {
        Value::Int(code) => i32::try_from(*code).unwrap_or(i32::MAX),
        _ => 0,
    }
}
