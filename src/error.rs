//! Error types for the Boa semantic analyzer

use thiserror::Error;

use crate::ast::NodeId;

/// Result type alias for checker operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// A semantic error raised by the type-checking pass.
///
/// The pass stops at the first violation, so a rejected program carries
/// exactly one of these. Every variant names the node that caused it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("{message}")]
    IncompatibleTypes { node: NodeId, message: String },

    #[error("{message}")]
    InvalidOperator { node: NodeId, message: String },

    #[error("{message}")]
    InvalidIndex { node: NodeId, message: String },

    #[error("{message}")]
    InvalidSelection { node: NodeId, message: String },

    #[error("{message}")]
    UnknownIdentifier { node: NodeId, message: String },

    #[error("{message}")]
    UnknownType { node: NodeId, message: String },

    #[error("{message}")]
    NameConflict { node: NodeId, message: String },

    #[error("{message}")]
    TableContract { node: NodeId, message: String },

    #[error("{message}")]
    Aggregator { node: NodeId, message: String },

    #[error("{message}")]
    Overload { node: NodeId, message: String },

    #[error("{message}")]
    IllegalContext { node: NodeId, message: String },

    #[error("{message}")]
    InvalidSwitch { node: NodeId, message: String },

    /// The tree violates the grammar itself. A parser never produces these.
    #[error("malformed tree: {message}")]
    MalformedTree { node: NodeId, message: String },
}

impl CheckError {
    /// The node the error was raised at
    pub fn node(&self) -> NodeId {
        match self {
            CheckError::IncompatibleTypes { node, .. }
            | CheckError::InvalidOperator { node, .. }
            | CheckError::InvalidIndex { node, .. }
            | CheckError::InvalidSelection { node, .. }
            | CheckError::UnknownIdentifier { node, .. }
            | CheckError::UnknownType { node, .. }
            | CheckError::NameConflict { node, .. }
            | CheckError::TableContract { node, .. }
            | CheckError::Aggregator { node, .. }
            | CheckError::Overload { node, .. }
            | CheckError::IllegalContext { node, .. }
            | CheckError::InvalidSwitch { node, .. }
            | CheckError::MalformedTree { node, .. } => *node,
        }
    }

    /// Short category name, used by the CLI when reporting
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::IncompatibleTypes { .. } => "IncompatibleTypes",
            CheckError::InvalidOperator { .. } => "InvalidOperator",
            CheckError::InvalidIndex { .. } => "InvalidIndex",
            CheckError::InvalidSelection { .. } => "InvalidSelection",
            CheckError::UnknownIdentifier { .. } => "UnknownIdentifier",
            CheckError::UnknownType { .. } => "UnknownType",
            CheckError::NameConflict { .. } => "NameConflict",
            CheckError::TableContract { .. } => "TableContract",
            CheckError::Aggregator { .. } => "Aggregator",
            CheckError::Overload { .. } => "Overload",
            CheckError::IllegalContext { .. } => "IllegalContext",
            CheckError::InvalidSwitch { .. } => "InvalidSwitch",
            CheckError::MalformedTree { .. } => "MalformedTree",
        }
    }
}

/// Errors raised while building an environment or loading configuration
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown type name '{0}'")]
    UnknownType(String),

    #[error("global '{0}' is already defined")]
    DuplicateGlobal(String),

    #[error("aggregator '{name}' is already registered for '{value_type}'")]
    DuplicateAggregator { name: String, value_type: String },
}
