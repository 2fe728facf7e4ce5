use std::rc::Rc;

use crate::types::{
    EnumInstance, ErrorInstance, ListInstance, MapInstance, ObjectInstance, ProtocolInstance,
    RecordInstance, RecordType, ResultInstance, SetInstance,
};

/// A runtime value.
///
/// Primitive variants are stored inline and copied on assignment; composite
/// variants are reference-counted handles, so many bindings may observe the
/// same instance and mutation through one handle is visible through all.
/// There is no implicit coercion between the numeric variants: `Int`, `Long`,
/// `Float` and `Double` are four distinct families.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Long(i128),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Text(String),
    Object(Rc<ObjectInstance>),
    Protocol(Rc<ProtocolInstance>),
    Record(Rc<RecordInstance>),
    RecordType(Rc<RecordType>),
    Enum(Rc<EnumInstance>),
    List(Rc<ListInstance>),
    Map(Rc<MapInstance>),
    Set(Rc<SetInstance>),
    Result(Rc<ResultInstance>),
    Error(Rc<ErrorInstance>),
}

impl Value {
    /// Canonical type tag used for generic instantiation inference and for
    /// diagnostics: `"Int"`, `"Text"`, `"List<Int>"`, a declared object or
    /// record name, and so on.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Int(_) => "Int".to_owned(),
            Self::Long(_) => "Long".to_owned(),
            Self::Float(_) => "Float".to_owned(),
            Self::Double(_) => "Double".to_owned(),
            Self::Bool(_) => "Bool".to_owned(),
            Self::Char(_) => "Char".to_owned(),
            Self::Text(_) => "Text".to_owned(),
            Self::Object(obj) => obj.name().to_owned(),
            Self::Protocol(protocol) => protocol.name().to_owned(),
            Self::Record(record) => record.type_name().to_owned(),
            Self::RecordType(record_type) => record_type.name().to_owned(),
            Self::Enum(enumeration) => enumeration.name().to_owned(),
            Self::List(list) => format!("List<{}>", list.element_type()),
            Self::Map(map) => format!("Map<{}, {}>", map.key_type(), map.value_type()),
            Self::Set(set) => format!("Set<{}>", set.element_type()),
            Self::Result(result) => {
                format!("Result<{}, {}>", result.value_type(), result.error_type())
            }
            Self::Error(_) => "Error".to_owned(),
        }
    }

    /// Structural equality for primitives within their own variant,
    /// cross-variant comparison is false (no implicit numeric coercion).
    /// Composites delegate: records are structural, objects compare by
    /// identity, collections element-wise.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Protocol(a), Self::Protocol(b)) => Rc::ptr_eq(a, b),
            (Self::Record(a), Self::Record(b)) => a.equals(b),
            (Self::RecordType(a), Self::RecordType(b)) => Rc::ptr_eq(a, b),
            (Self::Enum(a), Self::Enum(b)) => Rc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => a.equals(b),
            (Self::Map(a), Self::Map(b)) => a.equals(b),
            (Self::Set(a), Self::Set(b)) => a.equals(b),
            (Self::Result(a), Self::Result(b)) => a.equals(b),
            (Self::Error(a), Self::Error(b)) => a.message() == b.message(),
            _ => false,
        }
    }

    /// Human-readable rendering used by diagnostics and the `system.io`
    /// binding. This is not a user-visible `toString()` protocol.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => ryu::Buffer::new().format(*v).to_owned(),
            Self::Double(v) => ryu::Buffer::new().format(*v).to_owned(),
            Self::Bool(v) => v.to_string(),
            Self::Char(c) => c.to_string(),
            Self::Text(s) => s.clone(),
            Self::Object(obj) => format!("Object<{}>", obj.name()),
            Self::Protocol(protocol) => format!("Protocol<{}>", protocol.name()),
            Self::Record(record) => record.stringify(),
            Self::RecordType(record_type) => record_type.stringify(),
            Self::Enum(enumeration) => format!("Enum<{}>", enumeration.name()),
            Self::List(list) => list.stringify(),
            Self::Map(map) => map.stringify(),
            Self::Set(set) => set.stringify(),
            Self::Result(result) => result.stringify(),
            Self::Error(error) => format!("Error({})", error.message()),
        }
    }

    /// Truthiness, applied only where the language implicitly tests a branch
    /// condition (`if` and `while`): `Bool` maps to itself, `Int` is true iff
    /// non-zero, `Text` is true iff non-empty, every other variant is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_variant_comparison_is_false() {
        assert!(!Value::Int(1).equals(&Value::Long(1)));
        assert!(!Value::Int(1).equals(&Value::Double(1.0)));
        assert!(!Value::Float(1.0).equals(&Value::Double(1.0)));
        assert!(!Value::Text("1".to_owned()).equals(&Value::Int(1)));
        assert!(!Value::Bool(true).equals(&Value::Int(1)));
    }

    #[test]
    fn primitive_equality_is_structural() {
        assert!(Value::Int(42).equals(&Value::Int(42)));
        assert!(Value::Char('x').equals(&Value::Char('x')));
        assert!(Value::Text("ab".to_owned()).equals(&Value::Text("ab".to_owned())));
        assert!(!Value::Int(42).equals(&Value::Int(43)));
    }

    #[test]
    fn truthiness_table() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Text("x".to_owned()).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        // Every other variant is unconditionally true, including zero values
        // of the non-Int numeric families.
        assert!(Value::Long(0).is_truthy());
        assert!(Value::Double(0.0).is_truthy());
        assert!(Value::Char('\0').is_truthy());
    }

    #[test]
    fn type_names_are_canonical() {
        assert_eq!(Value::Int(0).type_name(), "Int");
        assert_eq!(Value::Long(0).type_name(), "Long");
        assert_eq!(Value::Float(0.0).type_name(), "Float");
        assert_eq!(Value::Double(0.0).type_name(), "Double");
        assert_eq!(Value::Text(String::new()).type_name(), "Text");
    }

    #[test]
    fn stringify_numeric_forms() {
        assert_eq!(Value::Int(11).stringify(), "11");
        assert_eq!(Value::Double(2.5).stringify(), "2.5");
        assert_eq!(Value::Bool(false).stringify(), "false");
        assert_eq!(Value::Text("boom".to_owned()).stringify(), "boom");
    }
}
