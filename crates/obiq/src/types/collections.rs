use std::{cell::RefCell, fmt::Write, rc::Rc};

use crate::{
    exception::{ErrorKind, EvalResult, Exception},
    value::Value,
};

fn check_arity(receiver: &str, method: &str, expected: usize, got: usize) -> EvalResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(Exception::new(
            ErrorKind::Arity,
            format!("{receiver}.{method} expects {expected} arguments, got {got}"),
        )
        .into())
    }
}

fn unknown_method(receiver: &str, method: &str) -> crate::exception::Flow {
    Exception::new(
        ErrorKind::UnknownMethod,
        format!("{receiver} has no method '{method}'"),
    )
    .into()
}

fn join_stringified(values: &[Value], out: &mut String) {
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&value.stringify());
    }
}

/// A growable ordered collection. The element type name is fixed at
/// construction, inferred from the first element of a literal.
#[derive(Debug)]
pub struct ListInstance {
    element_type: String,
    items: RefCell<Vec<Value>>,
}

impl ListInstance {
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            items: RefCell::new(Vec::new()),
        }
    }

    pub fn from_values(element_type: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            element_type: element_type.into(),
            items: RefCell::new(values),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn add(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.items.borrow().iter().any(|item| item.equals(value))
    }

    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        let ours = self.items.borrow();
        let theirs = other.items.borrow();
        ours.len() == theirs.len()
            && ours.iter().zip(theirs.iter()).all(|(a, b)| a.equals(b))
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = String::from("[");
        join_stringified(&self.items.borrow(), &mut out);
        out.push(']');
        out
    }

    /// Built-in method dispatch for `MethodCall` on a list receiver.
    pub fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "add" => {
                check_arity("List", "add", 1, args.len())?;
                self.add(args[0].clone());
                Ok(Value::Int(0))
            }
            "get" => {
                check_arity("List", "get", 1, args.len())?;
                let Value::Int(index) = &args[0] else {
                    return Err(Exception::new(
                        ErrorKind::TypeMismatch,
                        format!("List.get expects an Int index, got {}", args[0].type_name()),
                    )
                    .into());
                };
                let items = self.items.borrow();
                usize::try_from(*index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        Exception::new(
                            ErrorKind::IndexOutOfBounds,
                            format!("List index {index} out of bounds (size {})", items.len()),
                        )
                        .into()
                    })
            }
            "size" => {
                check_arity("List", "size", 0, args.len())?;
                Ok(Value::Int(self.len() as i64))
            }
            "contains" => {
                check_arity("List", "contains", 1, args.len())?;
                Ok(Value::Bool(self.contains(&args[0])))
            }
            _ => Err(unknown_method("List", method)),
        }
    }
}

/// An insertion-ordered key/value mapping. Key lookup uses value equality.
#[derive(Debug)]
pub struct MapInstance {
    key_type: String,
    value_type: String,
    entries: RefCell<Vec<(Value, Value)>>,
}

impl MapInstance {
    pub fn new(key_type: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            value_type: value_type.into(),
            entries: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    #[must_use]
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Inserts or replaces the entry for `key`.
    pub fn put(&self, key: Value, value: Value) {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|(existing, _)| existing.equals(&key)) {
            entry.1 = value;
        } else {
            entries.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| existing.equals(key))
            .map(|(_, value)| value.clone())
    }

    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        let ours = self.entries.borrow();
        if ours.len() != other.entries.borrow().len() {
            return false;
        }
        ours.iter().all(|(key, value)| {
            other
                .get(key)
                .is_some_and(|other_value| value.equals(&other_value))
        })
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = String::from("{");
        for (index, (key, value)) in self.entries.borrow().iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}: {}", key.stringify(), value.stringify());
        }
        out.push('}');
        out
    }

    pub fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "put" => {
                check_arity("Map", "put", 2, args.len())?;
                self.put(args[0].clone(), args[1].clone());
                Ok(Value::Int(0))
            }
            "get" => {
                check_arity("Map", "get", 1, args.len())?;
                self.get(&args[0]).ok_or_else(|| {
                    Exception::new(
                        ErrorKind::UnknownMember,
                        format!("Map has no entry for key '{}'", args[0].stringify()),
                    )
                    .into()
                })
            }
            "contains" => {
                check_arity("Map", "contains", 1, args.len())?;
                Ok(Value::Bool(self.contains(&args[0])))
            }
            "size" => {
                check_arity("Map", "size", 0, args.len())?;
                Ok(Value::Int(self.len() as i64))
            }
            "keys" => {
                check_arity("Map", "keys", 0, args.len())?;
                let keys = self
                    .entries
                    .borrow()
                    .iter()
                    .map(|(key, _)| key.clone())
                    .collect();
                Ok(Value::List(Rc::new(ListInstance::from_values(
                    self.key_type.clone(),
                    keys,
                ))))
            }
            _ => Err(unknown_method("Map", method)),
        }
    }
}

/// An insertion-ordered collection of unique elements, uniqueness by value
/// equality.
#[derive(Debug)]
pub struct SetInstance {
    element_type: String,
    items: RefCell<Vec<Value>>,
}

impl SetInstance {
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            items: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Adds `value` unless an equal element is already present.
    pub fn add(&self, value: Value) {
        let mut items = self.items.borrow_mut();
        if !items.iter().any(|item| item.equals(&value)) {
            items.push(value);
        }
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.items.borrow().iter().any(|item| item.equals(value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .items
                .borrow()
                .iter()
                .all(|item| other.contains(item))
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = String::from("Set(");
        join_stringified(&self.items.borrow(), &mut out);
        out.push(')');
        out
    }

    pub fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "add" => {
                check_arity("Set", "add", 1, args.len())?;
                self.add(args[0].clone());
                Ok(Value::Int(0))
            }
            "contains" => {
                check_arity("Set", "contains", 1, args.len())?;
                Ok(Value::Bool(self.contains(&args[0])))
            }
            "size" => {
                check_arity("Set", "size", 0, args.len())?;
                Ok(Value::Int(self.len() as i64))
            }
            _ => Err(unknown_method("Set", method)),
        }
    }
}
