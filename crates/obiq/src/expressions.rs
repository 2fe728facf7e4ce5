//! AST produced by the parser and consumed by the evaluator.
//!
//! Nodes are plain data: a tagged sum per syntactic category with a single
//! evaluator function over each sum (see `eval.rs`). Every node carries the
//! source location of the token that introduced it. The `Display` impls
//! render canonical source that re-parses to an identical tree, which the
//! test suite relies on.

use std::fmt::{self, Write};
use std::rc::Rc;

/// A source position, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A literal value as written in source.
///
/// Numeric variants are fixed at lex/parse time by suffix and shape:
/// unsuffixed integers are `Int`, unsuffixed decimals are `Double`,
/// `f`/`d`/`l` suffixes force `Float`/`Double`/`Long`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Long(i128),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Text(String),
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-",
        }
    }
}

/// An expression paired with its source location.
#[derive(Debug, Clone)]
pub struct ExprLoc {
    pub expr: Expr,
    pub loc: Loc,
}

impl ExprLoc {
    pub fn new(expr: Expr, loc: Loc) -> Self {
        Self { expr, loc }
    }
}

/// An expression in the AST.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    /// A plain identifier reference, including `$`-sigil names.
    Identifier(String),
    This,
    /// `new Type(args)`; the type name may be dotted (`ns.Type`).
    New {
        type_name: String,
        args: Vec<ExprLoc>,
    },
    /// `expr.name(args)`, dispatched with `external_call_site = true`.
    MethodCall {
        object: Box<ExprLoc>,
        method: String,
        args: Vec<ExprLoc>,
    },
    /// `expr.name`: object property, record field, or enum member.
    MemberAccess {
        object: Box<ExprLoc>,
        member: String,
    },
    /// `name(args)`, including the distinguished `Result.success` /
    /// `Result.error` forms which keep the dotted name.
    FunctionCall {
        name: String,
        args: Vec<ExprLoc>,
    },
    /// `Type(field=expr, ...)`, distinguished from a function call by the
    /// `ident '='` lookahead at the first argument.
    RecordInit {
        type_name: String,
        fields: Vec<(String, ExprLoc)>,
    },
    ListLit(Vec<ExprLoc>),
    MapLit(Vec<(ExprLoc, ExprLoc)>),
    /// `( ... )` elements, produced only in `Set<T>` declaration context.
    SetLit(Vec<ExprLoc>),
    Binary {
        left: Box<ExprLoc>,
        op: BinaryOp,
        right: Box<ExprLoc>,
    },
    Comparison {
        left: Box<ExprLoc>,
        op: CmpOp,
        right: Box<ExprLoc>,
    },
    Logical {
        left: Box<ExprLoc>,
        op: LogicalOp,
        right: Box<ExprLoc>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExprLoc>,
    },
}

impl Expr {
    /// If this expression is a pure identifier-dot chain (`a.b.c`), returns
    /// its parts in source order. Used for qualified-name fallback lookup
    /// and for the static-call guidance diagnostic.
    pub fn qualified_parts(&self) -> Option<Vec<&str>> {
        match self {
            Self::Identifier(name) => Some(vec![name.as_str()]),
            Self::MemberAccess { object, member } => {
                let mut parts = object.expr.qualified_parts()?;
                parts.push(member.as_str());
                Some(parts)
            }
            _ => None,
        }
    }
}

/// A sequence of statements; the block's value is the last statement's value,
/// or `Int(0)` when empty.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// An `if` statement with optional `else` / `else if` arm.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: ExprLoc,
    pub then_block: Block,
    pub else_arm: Option<Box<ElseArm>>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum ElseArm {
    ElseIf(IfStmt),
    Else(Block),
}

/// A statement inside a method or constructor body.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `name: Type = expr`
    VarDecl {
        name: String,
        type_name: String,
        init: ExprLoc,
        loc: Loc,
    },
    /// `const name: Type = expr`
    ConstDecl {
        name: String,
        type_name: String,
        init: ExprLoc,
        loc: Loc,
    },
    /// `name = expr` on an existing variable.
    Assign {
        name: String,
        value: ExprLoc,
        loc: Loc,
    },
    /// `this.name = expr`, legal only while a method body is on the stack.
    PropertyAssign {
        name: String,
        value: ExprLoc,
        loc: Loc,
    },
    If(IfStmt),
    While {
        cond: ExprLoc,
        body: Block,
        loc: Loc,
    },
    Break {
        loc: Loc,
    },
    Return {
        value: Option<ExprLoc>,
        loc: Loc,
    },
    /// `throw(expr)`
    Throw {
        value: ExprLoc,
        loc: Loc,
    },
    Try {
        body: Block,
        catch: Option<(String, Block)>,
        finally: Option<Block>,
        loc: Loc,
    },
    Expr(ExprLoc),
}

/// A named, typed parameter of a method, constructor, or protocol signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

/// One signature inside a `Protocol` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSignature {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub loc: Loc,
}

/// A method declaration. The body is shared (`Rc`) with the runtime method
/// table built at object-declaration evaluation.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    pub body: Rc<Block>,
    pub external: bool,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: Rc<Block>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub name: String,
    /// Declared protocol, validated when the template is built.
    pub protocol: Option<String>,
    pub properties: Vec<PropertyDecl>,
    pub constructor: Option<ConstructorDecl>,
    pub methods: Vec<MethodDecl>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct ProtocolDecl {
    pub name: String,
    pub signatures: Vec<ProtocolSignature>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: String,
    /// Ordered `(field, type)` pairs.
    pub fields: Vec<(String, String)>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    /// Members in source order; `Some(n)` resets the running counter.
    pub members: Vec<(String, Option<i64>)>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub path: Vec<String>,
    /// Restricted by the parser to Object/Protocol/Record/Enum.
    pub body: Vec<Decl>,
    pub loc: Loc,
}

/// What an import statement selects from the target unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSelector {
    /// The named top-level object itself.
    Object,
    /// A specific method; the object is bound plus an `Object_method` alias.
    Method(String),
    /// `.*`: every externally-visible top-level name in the unit.
    Wildcard,
}

/// A structured import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub package_path: Vec<String>,
    pub object_name: String,
    pub selector: ImportSelector,
    /// `@import` (project-rooted) vs `import` (system-rooted).
    pub user_import: bool,
}

impl ImportPath {
    /// Dotted rendering of the path without the wildcard suffix.
    pub fn full_path(&self) -> String {
        let mut out = String::new();
        for part in &self.package_path {
            out.push_str(part);
            out.push('.');
        }
        out.push_str(&self.object_name);
        if let ImportSelector::Method(name) = &self.selector {
            out.push('.');
            out.push_str(name);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: ImportPath,
    pub loc: Loc,
}

/// A top-level form of a module.
#[derive(Debug, Clone)]
pub enum Decl {
    Object(ObjectDecl),
    Protocol(ProtocolDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Namespace(NamespaceDecl),
    Import(ImportDecl),
}

impl Decl {
    /// The name this declaration binds, if any (imports bind separately).
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Object(d) => Some(&d.name),
            Self::Protocol(d) => Some(&d.name),
            Self::Record(d) => Some(&d.name),
            Self::Enum(d) => Some(&d.name),
            Self::Namespace(_) | Self::Import(_) => None,
        }
    }
}

/// A parsed module: the ordered list of top-level declarations.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}

// --- canonical rendering -------------------------------------------------
//
// The renderers emit source the parser accepts back into an identical tree:
// newline-separated statements, explicit parentheses around every compound
// expression, and set literals only inside their `Set<T>` declaration form.

fn escape_text(out: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\u{8}' => out.write_str("\\b")?,
            '\u{c}' => out.write_str("\\f")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{}f", ryu::Buffer::new().format(*v)),
            Self::Double(v) => write!(f, "{}", ryu::Buffer::new().format(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(c) => match c {
                '\'' => f.write_str("'\\''"),
                '\\' => f.write_str("'\\\\'"),
                '\n' => f.write_str("'\\n'"),
                '\t' => f.write_str("'\\t'"),
                c => write!(f, "'{c}'"),
            },
            Self::Text(s) => escape_text(f, s),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[ExprLoc]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg.expr)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Identifier(name) => f.write_str(name),
            Self::This => f.write_str("this"),
            Self::New { type_name, args } => {
                write!(f, "new {type_name}(")?;
                write_args(f, args)?;
                f.write_char(')')
            }
            Self::MethodCall {
                object,
                method,
                args,
            } => {
                write!(f, "{}.{method}(", object.expr)?;
                write_args(f, args)?;
                f.write_char(')')
            }
            Self::MemberAccess { object, member } => {
                write!(f, "{}.{member}", object.expr)
            }
            Self::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_char(')')
            }
            Self::RecordInit { type_name, fields } => {
                write!(f, "{type_name}(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={}", value.expr)?;
                }
                f.write_char(')')
            }
            Self::ListLit(elements) => {
                f.write_char('[')?;
                write_args(f, elements)?;
                f.write_char(']')
            }
            Self::MapLit(entries) => {
                f.write_char('{')?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k.expr, v.expr)?;
                }
                f.write_char('}')
            }
            Self::SetLit(elements) => {
                f.write_char('(')?;
                write_args(f, elements)?;
                f.write_char(')')
            }
            Self::Binary { left, op, right } => {
                write!(f, "({} {} {})", left.expr, op.symbol(), right.expr)
            }
            Self::Comparison { left, op, right } => {
                write!(f, "({} {} {})", left.expr, op.symbol(), right.expr)
            }
            Self::Logical { left, op, right } => {
                write!(f, "({} {} {})", left.expr, op.symbol(), right.expr)
            }
            Self::Unary { op, operand } => {
                write!(f, "({}{})", op.symbol(), operand.expr)
            }
        }
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str("    ")?;
    }
    Ok(())
}

impl Block {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        for stmt in &self.statements {
            write_indent(f, level)?;
            stmt.fmt_indented(f, level)?;
            f.write_char('\n')?;
        }
        Ok(())
    }
}

impl IfStmt {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        writeln!(f, "if ({}) {{", self.cond.expr)?;
        self.then_block.fmt_indented(f, level + 1)?;
        write_indent(f, level)?;
        f.write_char('}')?;
        if let Some(arm) = &self.else_arm {
            match arm.as_ref() {
                ElseArm::ElseIf(nested) => {
                    f.write_str(" else ")?;
                    nested.fmt_indented(f, level)?;
                }
                ElseArm::Else(block) => {
                    f.write_str(" else {\n")?;
                    block.fmt_indented(f, level + 1)?;
                    write_indent(f, level)?;
                    f.write_char('}')?;
                }
            }
        }
        Ok(())
    }
}

impl Stmt {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        match self {
            Self::VarDecl {
                name,
                type_name,
                init,
                ..
            } => write!(f, "{name}: {type_name} = {}", init.expr),
            Self::ConstDecl {
                name,
                type_name,
                init,
                ..
            } => write!(f, "const {name}: {type_name} = {}", init.expr),
            Self::Assign { name, value, .. } => write!(f, "{name} = {}", value.expr),
            Self::PropertyAssign { name, value, .. } => {
                write!(f, "this.{name} = {}", value.expr)
            }
            Self::If(stmt) => stmt.fmt_indented(f, level),
            Self::While { cond, body, .. } => {
                writeln!(f, "while ({}) {{", cond.expr)?;
                body.fmt_indented(f, level + 1)?;
                write_indent(f, level)?;
                f.write_char('}')
            }
            Self::Break { .. } => f.write_str("break"),
            Self::Return { value, .. } => match value {
                Some(expr) => write!(f, "return {}", expr.expr),
                None => f.write_str("return"),
            },
            Self::Throw { value, .. } => write!(f, "throw({})", value.expr),
            Self::Try {
                body,
                catch,
                finally,
                ..
            } => {
                f.write_str("try {\n")?;
                body.fmt_indented(f, level + 1)?;
                write_indent(f, level)?;
                f.write_char('}')?;
                if let Some((var, block)) = catch {
                    writeln!(f, " catch ({var}) {{")?;
                    block.fmt_indented(f, level + 1)?;
                    write_indent(f, level)?;
                    f.write_char('}')?;
                }
                if let Some(block) = finally {
                    f.write_str(" finally {\n")?;
                    block.fmt_indented(f, level + 1)?;
                    write_indent(f, level)?;
                    f.write_char('}')?;
                }
                Ok(())
            }
            Self::Expr(expr) => write!(f, "{}", expr.expr),
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", param.name, param.type_name)?;
    }
    Ok(())
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(decl) => {
                write!(f, "Object {}", decl.name)?;
                if let Some(protocol) = &decl.protocol {
                    write!(f, ": {protocol}")?;
                }
                f.write_str(" {\n")?;
                for property in &decl.properties {
                    writeln!(f, "    property {}: {}", property.name, property.type_name)?;
                }
                if let Some(ctor) = &decl.constructor {
                    f.write_str("    constructor(")?;
                    write_params(f, &ctor.params)?;
                    f.write_str(") {\n")?;
                    ctor.body.fmt_indented(f, 2)?;
                    f.write_str("    }\n")?;
                }
                for method in &decl.methods {
                    f.write_str("    ")?;
                    if method.external {
                        f.write_str("@external ")?;
                    }
                    write!(f, "method {}(", method.name)?;
                    write_params(f, &method.params)?;
                    writeln!(f, "): {} {{", method.return_type)?;
                    method.body.fmt_indented(f, 2)?;
                    f.write_str("    }\n")?;
                }
                f.write_char('}')
            }
            Self::Protocol(decl) => {
                writeln!(f, "Protocol {} {{", decl.name)?;
                for sig in &decl.signatures {
                    write!(f, "    method {}(", sig.name)?;
                    write_params(f, &sig.params)?;
                    writeln!(f, "): {}", sig.return_type)?;
                }
                f.write_char('}')
            }
            Self::Record(decl) => {
                writeln!(f, "Record {} {{", decl.name)?;
                for (name, type_name) in &decl.fields {
                    writeln!(f, "    {name}: {type_name}")?;
                }
                f.write_char('}')
            }
            Self::Enum(decl) => {
                writeln!(f, "Enum {} {{", decl.name)?;
                for (name, value) in &decl.members {
                    match value {
                        Some(v) => writeln!(f, "    {name} = {v}")?,
                        None => writeln!(f, "    {name}")?,
                    }
                }
                f.write_char('}')
            }
            Self::Namespace(decl) => {
                writeln!(f, "namespace {} {{", decl.path.join("."))?;
                for member in &decl.body {
                    writeln!(f, "{member}")?;
                }
                f.write_char('}')
            }
            Self::Import(decl) => {
                if decl.path.user_import {
                    f.write_str("@import ")?;
                } else {
                    f.write_str("import ")?;
                }
                f.write_str(&decl.path.full_path())?;
                if decl.path.selector == ImportSelector::Wildcard {
                    f.write_str(".*")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.decls {
            writeln!(f, "{decl}")?;
        }
        Ok(())
    }
}
