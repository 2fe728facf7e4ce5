use crate::{expressions::ProtocolSignature, types::ObjectInstance};

/// A named, ordered set of method signatures with no bodies, used for
/// structural conformance checks against objects.
///
/// The check degrades gracefully: an object method registered without
/// signature metadata (the built-in binding path) satisfies the protocol by
/// presence alone. External visibility is never part of conformance.
#[derive(Debug, Clone)]
pub struct ProtocolInstance {
    name: String,
    signatures: Vec<ProtocolSignature>,
}

impl ProtocolInstance {
    pub fn new(name: impl Into<String>, signatures: Vec<ProtocolSignature>) -> Self {
        Self {
            name: name.into(),
            signatures,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signatures(&self) -> &[ProtocolSignature] {
        &self.signatures
    }

    /// Whether `object` structurally satisfies every signature, in
    /// declaration order.
    #[must_use]
    pub fn is_implemented_by(&self, object: &ObjectInstance) -> bool {
        self.validation_errors(object).is_empty()
    }

    /// The same check as [`Self::is_implemented_by`], accumulating
    /// human-readable diagnostics instead of returning a boolean. Used when
    /// reporting a failed protocol attachment.
    #[must_use]
    pub fn validation_errors(&self, object: &ObjectInstance) -> Vec<String> {
        let mut errors = Vec::new();
        for required in &self.signatures {
            let Some(method) = object.method(&required.name) else {
                errors.push(format!("Missing method: {}", required.name));
                continue;
            };
            // Methods without signature metadata satisfy the protocol by
            // presence (built-in binding compatibility path).
            let Some(signature) = &method.signature else {
                continue;
            };
            if signature.params.len() != required.params.len() {
                errors.push(format!(
                    "Method '{}': parameter count mismatch (expected {}, got {})",
                    required.name,
                    required.params.len(),
                    signature.params.len()
                ));
                continue;
            }
            for (index, (required_param, actual_param)) in
                required.params.iter().zip(&signature.params).enumerate()
            {
                // Parameter names are irrelevant, only type names must match.
                if required_param.type_name != actual_param.type_name {
                    errors.push(format!(
                        "Method '{}': parameter {index} type mismatch (expected '{}', got '{}')",
                        required.name, required_param.type_name, actual_param.type_name
                    ));
                }
            }
            if signature.return_type != required.return_type {
                errors.push(format!(
                    "Method '{}': return type mismatch (expected '{}', got '{}')",
                    required.name, required.return_type, signature.return_type
                ));
            }
        }
        errors
    }
}
