use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
    exception::{ErrorKind, Exception, RunResult},
    value::Value,
};

/// A first-class value representing a record declaration: its name and
/// ordered field list.
#[derive(Debug, Clone)]
pub struct RecordType {
    name: String,
    /// Ordered `(field, type)` pairs. Field type names are carried for
    /// diagnostics and protocol metadata but not enforced at instantiation.
    fields: Vec<(String, String)>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Constructs an instance with every declared field assigned exactly
    /// once, in declaration order.
    ///
    /// Fails `MissingField` for an absent declared field and `UnknownField`
    /// for an extra key. Value variants are not checked against the declared
    /// field type names.
    pub fn create_instance(
        &self,
        mut field_values: IndexMap<String, Value>,
    ) -> RunResult<RecordInstance> {
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, _) in &self.fields {
            let Some(value) = field_values.shift_remove(name) else {
                return Err(Exception::new(
                    ErrorKind::MissingField,
                    format!(
                        "Missing required field '{name}' for record type '{}'",
                        self.name
                    ),
                ));
            };
            fields.insert(name.clone(), value);
        }
        if let Some(extra) = field_values.keys().next() {
            return Err(Exception::new(
                ErrorKind::UnknownField,
                format!("Unknown field '{extra}' for record type '{}'", self.name),
            ));
        }
        Ok(RecordInstance {
            type_name: self.name.clone(),
            fields,
        })
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = format!("record {} {{ ", self.name);
        for (index, (name, type_name)) in self.fields.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{name}: {type_name}");
        }
        out.push_str(" }");
        out
    }
}

/// A constructed record value: named fields, immutable after construction,
/// compared structurally.
#[derive(Debug, Clone)]
pub struct RecordInstance {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl RecordInstance {
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_field(&self, name: &str) -> RunResult<Value> {
        self.fields.get(name).cloned().ok_or_else(|| {
            Exception::new(
                ErrorKind::UnknownField,
                format!(
                    "Record instance of type '{}' has no field '{name}'",
                    self.type_name
                ),
            )
        })
    }

    /// Structural equality: type names match and every field compares equal.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        if self.type_name != other.type_name || self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields.iter().all(|(name, value)| {
            other
                .fields
                .get(name)
                .is_some_and(|other_value| value.equals(other_value))
        })
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut out = format!("{} {{ ", self.type_name);
        for (index, (name, value)) in self.fields.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{name} = {}", value.stringify());
        }
        out.push_str(" }");
        out
    }
}
