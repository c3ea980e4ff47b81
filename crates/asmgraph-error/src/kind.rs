//! Error kinds for asmgraph operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// Catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed to function
    InvalidArgument,

    /// Invalid configuration or options
    ConfigInvalid,

    // =========================================================================
    // Identifier errors
    // =========================================================================
    /// Unrecognized tag, wrong field count, empty or illegal name, zero token
    InvalidNodeId,

    // =========================================================================
    // Graph construction errors
    // =========================================================================
    /// The same leaf name was supplied twice to the hierarchy builder
    DuplicateLeafName,

    /// Lookup by id failed
    NotFound,

    /// Duplicate id in a tree or a parent pointer that disagrees with the tree
    StructuralInvariantViolation,

    /// An edge would terminate on a cluster while compound edges are disabled
    UnexpectedClusterEdge,

    /// Data inconsistency, e.g. a child label that lacks its parent's prefix
    InvariantViolation,

    // =========================================================================
    // External collaborators
    // =========================================================================
    /// The diagram renderer reported a failure
    RenderFailed,

    // =========================================================================
    // Serialization errors
    // =========================================================================
    SerializationFailed,

    DeserializationFailed,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    FileNotFound,

    PermissionDenied,

    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RenderFailed | ErrorKind::IoFailed)
    }

    /// Errors that indicate a defect in the builder or upstream data rather
    /// than a user-facing condition.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorKind::StructuralInvariantViolation
                | ErrorKind::UnexpectedClusterEdge
                | ErrorKind::InvariantViolation
        )
    }
}
