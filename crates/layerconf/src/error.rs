//! Error types for configuration tree operations.
//!
//! Every variant that refers to a location in the tree carries the fully
//! qualified key of that location (`a.b[2].c`), so failures can be located
//! without a backtrace.

use thiserror::Error;

/// Result type alias for layerconf operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// How an undeclared key was reached when struct mode rejected it.
///
/// Dynamic maps report key-style failures, schema-typed maps report
/// attribute-style failures. Both are the same condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Keyed access on a dynamic map.
    Key,
    /// Field access on a schema-typed map.
    Attribute,
}

/// Errors that can occur while reading, writing or merging a config tree.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The key is not addressable on this container variant.
    #[error("{container} keys must be {expected}, got {key_type} '{key}' at '{full_key}'")]
    UnsupportedKeyType {
        key: String,
        key_type: &'static str,
        container: &'static str,
        expected: &'static str,
        full_key: String,
    },

    /// The value kind cannot be stored at this location.
    #[error("Unsupported value type '{value_type}' at '{full_key}'")]
    UnsupportedValueType { value_type: String, full_key: String },

    /// Type mismatch against a declared type, or a failed coercion.
    #[error("Value '{value}' of type '{value_type}' could not be converted to '{expected}' at '{full_key}'")]
    Validation {
        value: String,
        value_type: String,
        expected: String,
        full_key: String,
    },

    /// Mutation of a node whose effective `readonly` flag is set.
    #[error("Cannot change read-only config node '{full_key}'")]
    Readonly { full_key: String },

    /// Read of a leaf holding the mandatory-missing marker.
    #[error("Missing mandatory value: '{full_key}'")]
    MissingMandatoryValue { full_key: String },

    /// The interpolation tag has no registered resolver.
    #[error("Unsupported interpolation type '{tag}' at '{full_key}'")]
    UnsupportedInterpolationType { tag: String, full_key: String },

    /// Access to a key absent from a struct-mode map.
    #[error("{}", struct_violation_message(*access, key, full_key))]
    StructViolation {
        access: AccessKind,
        key: String,
        full_key: String,
    },

    /// Deletion from a struct-mode map.
    #[error("Cannot delete '{full_key}': map is in struct mode")]
    StructDeletion { full_key: String },

    /// A self-reference whose target path does not exist.
    #[error("Interpolation '{reference}' at '{full_key}' could not be resolved: key '{missing}' not found")]
    InterpolationKey {
        reference: String,
        missing: String,
        full_key: String,
    },

    /// A chain of self-references that revisits a node.
    #[error("Interpolation cycle detected while resolving '{reference}' at '{full_key}'")]
    InterpolationCycle { reference: String, full_key: String },

    /// Structurally incompatible operation.
    #[error("{message} at '{full_key}'")]
    Type { message: String, full_key: String },

    /// Sequence index outside the current bounds.
    #[error("Index {index} out of range for sequence of length {len} at '{full_key}'")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        full_key: String,
    },

    /// Config nesting exceeds maximum depth.
    #[error("Config nesting too deep (max depth: {max_depth}) at path: {}", path.join("."))]
    NestingTooDeep {
        /// Maximum allowed depth
        max_depth: usize,
        /// Path where the limit was exceeded
        path: Vec<String>,
    },

    /// Resolver registration or invocation failure.
    #[error("Resolver '{name}': {message}")]
    Resolver { name: String, message: String },

    /// Conversion to or from a typed Rust value failed.
    #[error("Conversion failed: {message}")]
    Conversion { message: String },
}

fn struct_violation_message(access: AccessKind, key: &str, full_key: &str) -> String {
    match access {
        AccessKind::Key => format!("Key '{key}' not in struct: '{full_key}'"),
        AccessKind::Attribute => {
            format!("Attribute '{key}' is not declared in the schema: '{full_key}'")
        }
    }
}

impl ConfigError {
    /// True for the "key error" family: struct violations and unresolvable
    /// self-references.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            ConfigError::StructViolation { .. } | ConfigError::InterpolationKey { .. }
        )
    }

    /// The fully qualified key this error refers to, if it has one.
    pub fn full_key(&self) -> Option<&str> {
        match self {
            ConfigError::UnsupportedKeyType { full_key, .. }
            | ConfigError::UnsupportedValueType { full_key, .. }
            | ConfigError::Validation { full_key, .. }
            | ConfigError::Readonly { full_key }
            | ConfigError::MissingMandatoryValue { full_key }
            | ConfigError::UnsupportedInterpolationType { full_key, .. }
            | ConfigError::StructViolation { full_key, .. }
            | ConfigError::StructDeletion { full_key }
            | ConfigError::InterpolationKey { full_key, .. }
            | ConfigError::InterpolationCycle { full_key, .. }
            | ConfigError::Type { full_key, .. }
            | ConfigError::IndexOutOfRange { full_key, .. } => Some(full_key),
            ConfigError::NestingTooDeep { .. }
            | ConfigError::Resolver { .. }
            | ConfigError::Conversion { .. } => None,
        }
    }
}
