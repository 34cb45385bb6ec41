//! Error types for YAML loading, dumping and dotlist parsing.

use thiserror::Error;

/// Result type alias for layerconf-yaml operations.
pub type Result<T> = std::result::Result<T, YamlError>;

#[derive(Debug, Error)]
pub enum YamlError {
    /// The text is not valid YAML.
    #[error("YAML parse error: {0}")]
    Scan(#[from] yaml_rust2::ScanError),

    /// The tree could not be rendered as YAML text.
    #[error("YAML emit error: {0}")]
    Emit(#[from] yaml_rust2::EmitError),

    /// The text holds more than one YAML document.
    #[error("Expected a single YAML document, found {count}")]
    MultipleDocuments { count: usize },

    /// The YAML uses a construct that has no tree representation.
    #[error("Unsupported YAML construct at '{full_key}': {message}")]
    Unsupported { message: String, full_key: String },

    #[error(transparent)]
    Config(#[from] layerconf::ConfigError),
}
