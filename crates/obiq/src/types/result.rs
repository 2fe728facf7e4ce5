use crate::{
    exception::{ErrorKind, EvalResult, Exception},
    value::Value,
};

/// Outcome carried by a `Result` value.
#[derive(Debug, Clone)]
enum Outcome {
    Success(Value),
    Error(Value),
}

/// A success-or-error pair created by the static `Result.success(v)` /
/// `Result.error(v)` forms.
#[derive(Debug, Clone)]
pub struct ResultInstance {
    outcome: Outcome,
    value_type: String,
    error_type: String,
}

impl ResultInstance {
    pub fn success(value: Value) -> Self {
        Self {
            outcome: Outcome::Success(value),
            value_type: "T".to_owned(),
            error_type: "E".to_owned(),
        }
    }

    pub fn error(value: Value) -> Self {
        Self {
            outcome: Outcome::Error(value),
            value_type: "T".to_owned(),
            error_type: "E".to_owned(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    #[must_use]
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    #[must_use]
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (&self.outcome, &other.outcome) {
            (Outcome::Success(a), Outcome::Success(b)) => a.equals(b),
            (Outcome::Error(a), Outcome::Error(b)) => a.equals(b),
            _ => false,
        }
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        match &self.outcome {
            Outcome::Success(value) => format!("Result.success({})", value.stringify()),
            Outcome::Error(value) => format!("Result.error({})", value.stringify()),
        }
    }

    pub fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        if !args.is_empty() {
            return Err(Exception::new(
                ErrorKind::Arity,
                format!("Result.{method} expects 0 arguments, got {}", args.len()),
            )
            .into());
        }
        match (method, &self.outcome) {
            ("isSuccess", _) => Ok(Value::Bool(self.is_success())),
            ("isError", _) => Ok(Value::Bool(!self.is_success())),
            ("getResult", Outcome::Success(value)) => Ok(value.clone()),
            ("getResult", Outcome::Error(_)) => Err(Exception::new(
                ErrorKind::TypeMismatch,
                "Cannot get the success value of an error Result",
            )
            .into()),
            ("getError", Outcome::Error(value)) => Ok(value.clone()),
            ("getError", Outcome::Success(_)) => Err(Exception::new(
                ErrorKind::TypeMismatch,
                "Cannot get the error value of a success Result",
            )
            .into()),
            _ => Err(Exception::new(
                ErrorKind::UnknownMethod,
                format!("Result has no method '{method}'"),
            )
            .into()),
        }
    }
}

/// The value produced by `new Error(message)`.
#[derive(Debug, Clone)]
pub struct ErrorInstance {
    message: String,
    code: Option<String>,
}

impl ErrorInstance {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        if !args.is_empty() {
            return Err(Exception::new(
                ErrorKind::Arity,
                format!("Error.{method} expects 0 arguments, got {}", args.len()),
            )
            .into());
        }
        match method {
            "getMessage" => Ok(Value::Text(self.message.clone())),
            "getCode" => Ok(Value::Text(self.code.clone().unwrap_or_default())),
            _ => Err(Exception::new(
                ErrorKind::UnknownMethod,
                format!("Error has no method '{method}'"),
            )
            .into()),
        }
    }
}
