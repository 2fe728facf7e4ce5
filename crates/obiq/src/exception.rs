use std::fmt::{self, Write};

use strum::{Display, EnumString, IntoStaticStr};

use crate::{expressions::Loc, value::Value};

/// Result type alias for operations that can fail with a runtime error.
pub type RunResult<T> = Result<T, Exception>;

/// Result type alias for the evaluator: a value, or a non-local signal.
pub type EvalResult<T> = Result<T, Flow>;

/// Error taxonomy of the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `TypeMismatch` -> "TypeMismatch").
///
/// Only `UserThrow` is catchable by `try`/`catch` in the language; every other
/// kind is fatal and surfaces at the driver as message plus stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// Lexer or parser refusal at a specific location.
    Syntax,
    /// Identifier, function, module, or symbol lookup failed.
    Unresolved,
    /// A value's variant is incompatible with the operation.
    TypeMismatch,
    /// Wrong argument count at a call site.
    Arity,
    /// External call to a method not marked `@external`.
    Visibility,
    /// Assignment to a constant binding.
    Immutability,
    /// Duplicate binding conflicting with an existing constant, or a
    /// duplicate method name inside one object declaration.
    Redeclaration,
    UnknownMethod,
    UnknownProperty,
    UnknownField,
    UnknownMember,
    /// A declared record field was not supplied at instantiation.
    MissingField,
    /// Constructor invocation on an object that declares none.
    MissingConstructor,
    /// Object declared to implement a protocol fails the structural check.
    /// Carries the accumulated per-method diagnostics in its message.
    ProtocolConformance,
    DivisionByZero,
    /// Collection access outside the valid index range.
    IndexOutOfBounds,
    /// `this` read outside a method body.
    ThisOutOfContext,
    ModuleNotFound,
    /// A parse error inside an imported unit, with the import path prepended.
    SyntaxInImport,
    /// A unit re-entered itself while not fully loaded.
    CircularImport,
    /// The language-level throw/catch vehicle carrying an arbitrary value.
    UserThrow,
}

impl ErrorKind {
    /// Whether `try`/`catch` may intercept this kind.
    #[must_use]
    pub fn is_catchable(self) -> bool {
        matches!(self, Self::UserThrow)
    }
}

/// One call frame captured for error reporting, innermost first in a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Logical name, e.g. `Counter.increment`, `logical_&&`, `throw`.
    pub function: String,
    /// The node kind that pushed the frame, e.g. `MethodCall`.
    pub node_kind: &'static str,
    /// Source file the frame points into.
    pub file: String,
    pub loc: Loc,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {} ({}:{}:{})",
            self.function, self.file, self.loc.line, self.loc.column
        )
    }
}

/// A runtime error (or user throw) travelling up the evaluator.
///
/// The frame vector is frozen into the exception the first time it crosses a
/// frame guard while still empty, so the trace reflects the state at the
/// raise site rather than at the point the driver finally observes it.
#[derive(Debug, Clone)]
pub struct Exception {
    kind: ErrorKind,
    message: String,
    /// The thrown language value; populated for `UserThrow` only.
    payload: Option<Value>,
    /// Captured call frames, innermost first. Empty until frozen.
    frames: Vec<StackFrame>,
}

impl Exception {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: None,
            frames: Vec::new(),
        }
    }

    /// Creates the user-catchable throw carrying `value`.
    pub fn user_throw(value: Value, frames: Vec<StackFrame>) -> Self {
        Self {
            kind: ErrorKind::UserThrow,
            message: value.stringify(),
            payload: Some(value),
            frames,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The thrown value, present for `UserThrow`.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Prepends `prefix: ` to the message, used when re-raising an imported
    /// unit's parse error under `SyntaxInImport`.
    #[must_use]
    pub fn prefixed(self, kind: ErrorKind, prefix: &str) -> Self {
        Self {
            kind,
            message: format!("{prefix}: {}", self.message),
            payload: self.payload,
            frames: self.frames,
        }
    }

    /// Stores `frames` if the exception does not already carry a trace.
    pub fn freeze_frames(&mut self, frames: impl FnOnce() -> Vec<StackFrame>) {
        if self.frames.is_empty() {
            self.frames = frames();
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for frame in &self.frames {
            f.write_char('\n')?;
            write!(f, "    {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}

/// Non-local outcome of evaluating a node.
///
/// `Return` and `Break` are control-flow signals consumed by their enclosing
/// construct (method call and `while` respectively); they are not errors and
/// cannot be caught by `try`/`catch`. `Raise` carries an [`Exception`].
#[derive(Debug)]
pub enum Flow {
    Return(Value),
    Break,
    Raise(Exception),
}

impl From<Exception> for Flow {
    fn from(exc: Exception) -> Self {
        Self::Raise(exc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_user_throw_is_catchable() {
        assert!(ErrorKind::UserThrow.is_catchable());
        assert!(!ErrorKind::TypeMismatch.is_catchable());
        assert!(!ErrorKind::DivisionByZero.is_catchable());
        assert!(!ErrorKind::Syntax.is_catchable());
    }

    #[test]
    fn display_renders_message_and_trace() {
        let mut exc = Exception::new(ErrorKind::Unresolved, "Undefined variable 'x'");
        exc.freeze_frames(|| {
            vec![StackFrame {
                function: "Main.main".to_owned(),
                node_kind: "MethodCall",
                file: "test.obq".to_owned(),
                loc: Loc { line: 3, column: 9 },
            }]
        });
        let rendered = exc.to_string();
        assert!(rendered.starts_with("Unresolved: Undefined variable 'x'"));
        assert!(rendered.contains("at Main.main (test.obq:3:9)"));
    }

    #[test]
    fn freeze_frames_keeps_existing_trace() {
        let frame = |name: &str| StackFrame {
            function: name.to_owned(),
            node_kind: "MethodCall",
            file: "a.obq".to_owned(),
            loc: Loc { line: 1, column: 1 },
        };
        let mut exc = Exception::new(ErrorKind::TypeMismatch, "boom");
        exc.freeze_frames(|| vec![frame("inner")]);
        exc.freeze_frames(|| vec![frame("outer")]);
        assert_eq!(exc.frames().len(), 1);
        assert_eq!(exc.frames()[0].function, "inner");
    }
}
