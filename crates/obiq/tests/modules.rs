use std::{cell::RefCell, fs, path::Path, rc::Rc};

use obiq::{
    CollectStringPrint, ErrorKind, Exception, NoPrint, PrintWriter, RunOptions, Runner, Value,
};
use tempfile::TempDir;

fn write_module(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("module path has a parent")).unwrap();
    fs::write(path, content).unwrap();
}

fn options_for(root: &Path) -> RunOptions {
    RunOptions {
        system_root: root.to_path_buf(),
        project_root: root.to_path_buf(),
        args: None,
    }
}

fn run_in(root: &Path, source: &str) -> Result<Value, Exception> {
    let runner = Runner::new(source, "main.obq")?;
    runner.run_with_print(&options_for(root), Rc::new(RefCell::new(NoPrint)))
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected Int, got {other:?}"),
    }
}

#[test]
fn project_import_with_src_prefix() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "util/Helpers.obq",
        "Object Helpers {\n    @external method double(x: Int): Int {\n        return x * 2\n    \
         }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "@import src.util.Helpers\nObject Main {\n    method main(): Int {\n        return \
         Helpers.double(21)\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 42);
}

#[test]
fn system_import_resolves_package_directories() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "mathlib/Calc.obq",
        "Object Calc {\n    @external method square(x: Int): Int {\n        return x * x\n    \
         }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "import mathlib.Calc\nObject Main {\n    method main(): Int {\n        return \
         Calc.square(6)\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 36);
}

/// Second cascade entry: the package path itself names the file.
#[test]
fn import_finds_objects_declared_in_a_package_file() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "geo/Shapes.obq",
        "Object Square {\n    @external method area(side: Int): Int {\n        return side * \
         side\n    }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "import geo.Shapes.Square\nObject Main {\n    method main(): Int {\n        return \
         Square.area(5)\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 25);
}

/// `import pkg.Object.method` binds the object plus an `Object_method`
/// alias.
#[test]
fn method_imports_bind_the_alias() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "calc/Adder.obq",
        "Object Adder {\n    @external method add(a: Int, b: Int): Int {\n        return a + \
         b\n    }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "import calc.Adder.add\nObject Main {\n    method main(): Int {\n        return \
         Adder.add(40, 2) + Adder_add(0, 0)\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 42);
}

#[test]
fn wildcard_import_surfaces_every_top_level_name() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "shapes.obq",
        "Object Circle {\n    @external method tag(): Int {\n        return 1\n    }\n}\nObject \
         Square {\n    @external method tag(): Int {\n        return 2\n    }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "import shapes.*\nObject Main {\n    method main(): Int {\n        return new \
         Circle().tag() + new Square().tag()\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 3);
}

/// An imported single-method object may be called as if it were a
/// function.
#[test]
fn imported_object_is_callable_as_a_function() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "fx/Double.obq",
        "Object Double {\n    method apply(x: Int): Int {\n        return x * 2\n    }\n}\n",
    );
    let result = run_in(
        dir.path(),
        "import fx.Double\nObject Main {\n    method main(): Int {\n        return Double(21)\n    \
         }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 42);
}

/// Imported objects keep seeing their own module's imports: the logger
/// module imports `system.io` and its methods print from the importing
/// program's call sites.
#[test]
fn module_level_imports_travel_with_the_object() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "util/Logger.obq",
        "import system.io\nObject Logger {\n    @external method log(msg: Text): Int {\n        \
         io.println(msg)\n        return 0\n    }\n}\n",
    );
    let runner = Runner::new(
        "import util.Logger\nObject Main {\n    method main(): Int {\n        return \
         Logger.log(\"hello from module\")\n    }\n}",
        "main.obq",
    )
    .unwrap();
    let sink = Rc::new(RefCell::new(CollectStringPrint::new()));
    let dyn_sink: Rc<RefCell<dyn PrintWriter>> = sink.clone();
    runner
        .run_with_print(&options_for(dir.path()), dyn_sink)
        .unwrap();
    assert_eq!(sink.borrow().output(), "hello from module\n");
}

#[test]
fn missing_module_fails() {
    let dir = TempDir::new().unwrap();
    let err = run_in(
        dir.path(),
        "import nope.Missing\nObject Main {\n    method main(): Int {\n        return 0\n    \
         }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleNotFound);
    assert!(err.message().contains("nope.Missing"));
}

#[test]
fn missing_symbol_in_a_found_module_fails() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "geo/Shapes.obq",
        "Object Square {\n    @external method area(side: Int): Int {\n        return side * \
         side\n    }\n}\n",
    );
    let err = run_in(
        dir.path(),
        "import geo.Shapes.Triangle\nObject Main {\n    method main(): Int {\n        return \
         0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unresolved);
    assert!(err.message().contains("Symbol 'Triangle' not found"));
}

#[test]
fn syntax_errors_in_imports_carry_the_import_path() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "bad/Broken.obq", "this is not a module\n");
    let err = run_in(
        dir.path(),
        "import bad.Broken\nObject Main {\n    method main(): Int {\n        return 0\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxInImport);
    assert!(err.message().starts_with("bad.Broken: "));
}

#[test]
fn mutually_recursive_imports_are_detected() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "a/A.obq",
        "import b.B\nObject A {\n    @external method ping(): Int {\n        return 1\n    }\n}\n",
    );
    write_module(
        dir.path(),
        "b/B.obq",
        "import a.A\nObject B {\n    @external method pong(): Int {\n        return 2\n    }\n}\n",
    );
    let err = run_in(
        dir.path(),
        "import a.A\nObject Main {\n    method main(): Int {\n        return A.ping()\n    }\n}",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularImport);
}

#[test]
fn loaded_modules_are_cached_per_run() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "fx/Double.obq",
        "Object Double {\n    method apply(x: Int): Int {\n        return x * 2\n    }\n}\n",
    );
    // Importing the same unit under two forms must not error; both names
    // resolve to the cached unit's object.
    let result = run_in(
        dir.path(),
        "import fx.Double\nimport fx.Double.apply\nObject Main {\n    method main(): Int {\n        \
         return Double(4) + Double_apply(5)\n    }\n}",
    )
    .unwrap();
    assert_eq!(as_int(&result), 18);
}

#[test]
fn builtin_system_io_prints_through_the_sink() {
    let runner = Runner::new(
        "import system.io\nObject Main {\n    method main(): Int {\n        io.print(\"a\")\n        \
         io.println(\"b\")\n        return 0\n    }\n}",
        "main.obq",
    )
    .unwrap();
    let sink = Rc::new(RefCell::new(CollectStringPrint::new()));
    let dyn_sink: Rc<RefCell<dyn PrintWriter>> = sink.clone();
    runner
        .run_with_print(&RunOptions::default(), dyn_sink)
        .unwrap();
    assert_eq!(sink.borrow().output(), "ab\n");
}
