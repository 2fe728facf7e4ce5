//! Module loader: import path to parsed, evaluated unit.
//!
//! `import a.b.c.Obj` searches `<root>/a/b/c/Obj.obq`, then
//! `<root>/a/b/c.obq`, then `<root>/a/b/Obj.obq` under the system root;
//! `@import` follows the same cascade under the project root, with a
//! leading `src` segment standing for the project root itself. Loaded units
//! are cached by canonical path, and a unit re-entering itself while not
//! fully loaded is a `CircularImport`.

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    builtins,
    context::Context,
    exception::{ErrorKind, Exception, RunResult},
    expressions::{Decl, ImportPath},
    parse::parse_program,
    run::register_program,
    value::Value,
};

/// A fully loaded and evaluated source unit.
#[derive(Debug)]
pub struct LoadedModule {
    /// Top-level declared names in declaration order; namespace members
    /// appear under both their qualified and short names.
    bindings: IndexMap<String, Value>,
    /// File stem, used to recognise `Object.method` imports resolved via
    /// the package-path-as-file cascade entry.
    file_stem: String,
}

/// The value an import statement resolved to, plus how to bind it.
#[derive(Debug)]
pub struct ResolvedImport {
    pub value: Value,
    /// The real top-level object name to bind.
    pub object_name: String,
    /// For `Object.method` imports: the selected method, bound additionally
    /// under the `Object_method` alias.
    pub method: Option<String>,
}

pub struct ModuleLoader {
    system_root: PathBuf,
    project_root: PathBuf,
    cache: AHashMap<PathBuf, Rc<LoadedModule>>,
    /// Canonical paths of units currently being loaded, for cycle
    /// detection.
    loading: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(system_root: PathBuf, project_root: PathBuf) -> Self {
        Self {
            system_root,
            project_root,
            cache: AHashMap::new(),
            loading: Vec::new(),
        }
    }

    fn is_builtin(path: &ImportPath) -> bool {
        !path.user_import
            && path.package_path.len() == 1
            && path.package_path[0] == "system"
            && path.object_name == "io"
    }

    /// Resolves, loads and returns the object an import names.
    ///
    /// If the path turns out to select a method of an object (`a.b.Obj.m`),
    /// the object itself is returned with `method` set so the caller can
    /// bind the convenience alias.
    pub fn load_method(
        &mut self,
        path: &ImportPath,
        ctx: &mut Context,
    ) -> RunResult<ResolvedImport> {
        if Self::is_builtin(path) {
            return Ok(ResolvedImport {
                value: Value::Object(builtins::system_io()),
                object_name: "io".to_owned(),
                method: None,
            });
        }

        let module = self.load_unit(path, ctx)?;
        if let Some(value) = module.bindings.get(&path.object_name) {
            return Ok(ResolvedImport {
                value: value.clone(),
                object_name: path.object_name.clone(),
                method: None,
            });
        }
        // `import a.b.Obj.method`: the cascade resolved `a/b/Obj.obq`; the
        // requested name is a method of the unit's namesake object.
        if let Some(Value::Object(object)) = module.bindings.get(&module.file_stem)
            && object.has_method(&path.object_name)
        {
            return Ok(ResolvedImport {
                value: Value::Object(Rc::clone(object)),
                object_name: module.file_stem.clone(),
                method: Some(path.object_name.clone()),
            });
        }
        Err(Exception::new(
            ErrorKind::Unresolved,
            format!(
                "Symbol '{}' not found in module '{}'",
                path.object_name,
                path.full_path()
            ),
        ))
    }

    /// Resolves the unit and returns every top-level declared name, for
    /// wildcard imports.
    pub fn load_all_methods(
        &mut self,
        path: &ImportPath,
        ctx: &mut Context,
    ) -> RunResult<IndexMap<String, Value>> {
        if Self::is_builtin(path) {
            let mut bindings = IndexMap::new();
            bindings.insert("io".to_owned(), Value::Object(builtins::system_io()));
            return Ok(bindings);
        }
        let module = self.load_unit(path, ctx)?;
        Ok(module.bindings.clone())
    }

    fn load_unit(&mut self, path: &ImportPath, ctx: &mut Context) -> RunResult<Rc<LoadedModule>> {
        let file = self.resolve_file(path)?;
        let canonical = file.canonicalize().unwrap_or_else(|_| file.clone());

        if self.loading.contains(&canonical) {
            return Err(Exception::new(
                ErrorKind::CircularImport,
                format!(
                    "Circular import detected while loading '{}'",
                    path.full_path()
                ),
            ));
        }
        if let Some(module) = self.cache.get(&canonical) {
            return Ok(Rc::clone(module));
        }

        let source = fs::read_to_string(&file).map_err(|err| {
            Exception::new(
                ErrorKind::ModuleNotFound,
                format!("Cannot read module file '{}': {err}", file.display()),
            )
        })?;
        let program = parse_program(&source)
            .map_err(|exc| exc.prefixed(ErrorKind::SyntaxInImport, &path.full_path()))?;

        self.loading.push(canonical.clone());
        let mut module_ctx = Context::new(file.display().to_string(), ctx.out());
        let registered = register_program(&program, &mut module_ctx, self);
        self.loading.pop();
        registered?;

        let mut bindings = IndexMap::new();
        for decl in &program.decls {
            match decl {
                Decl::Namespace(namespace) => {
                    let prefix = namespace.path.join(".");
                    for member in &namespace.body {
                        if let Some(name) = member.name() {
                            let value = module_ctx.get_variable(name)?;
                            bindings.insert(format!("{prefix}.{name}"), value.clone());
                            bindings.insert(name.to_owned(), value);
                        }
                    }
                }
                decl => {
                    if let Some(name) = decl.name() {
                        bindings.insert(name.to_owned(), module_ctx.get_variable(name)?);
                    }
                }
            }
        }

        let file_stem = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_owned();
        let module = Rc::new(LoadedModule {
            bindings,
            file_stem,
        });
        self.cache.insert(canonical, Rc::clone(&module));
        Ok(module)
    }

    /// Applies the search cascade and returns the first existing file.
    fn resolve_file(&self, path: &ImportPath) -> RunResult<PathBuf> {
        let root: &Path = if path.user_import {
            &self.project_root
        } else {
            &self.system_root
        };
        // For user imports a leading `src` segment maps to the project root.
        let package: &[String] = if path.user_import
            && path.package_path.first().is_some_and(|part| part == "src")
        {
            &path.package_path[1..]
        } else {
            &path.package_path
        };

        let mut candidates = Vec::new();
        let mut package_dir = root.to_path_buf();
        for part in package {
            package_dir.push(part);
        }
        candidates.push(package_dir.join(format!("{}.obq", path.object_name)));
        if let Some((last, init)) = package.split_last() {
            let mut parent = root.to_path_buf();
            for part in init {
                parent.push(part);
            }
            candidates.push(parent.join(format!("{last}.obq")));
            candidates.push(parent.join(format!("{}.obq", path.object_name)));
        }

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                Exception::new(
                    ErrorKind::ModuleNotFound,
                    format!("Module '{}' not found", path.full_path()),
                )
            })
    }
}
