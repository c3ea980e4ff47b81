//! Whether an error may go away on its own.

use strum_macros::{Display, IntoStaticStr};

use crate::ErrorKind;

/// The pipeline never retries; the status is advice for the host shell,
/// e.g. whether to offer a "render again" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorStatus {
    /// Same input, same failure (bad ids, broken trees, duplicate names).
    #[default]
    Permanent,
    /// The renderer or the file system may recover.
    Temporary,
    /// Was temporary, kept failing.
    Persistent,
}

impl ErrorStatus {
    /// Initial status for a freshly raised error of `kind`.
    pub fn for_kind(kind: ErrorKind) -> Self {
        if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        }
    }

    pub fn is_retryable(&self) -> bool {
        *self == ErrorStatus::Temporary
    }

    pub fn persist(self) -> Self {
        if self == ErrorStatus::Temporary {
            ErrorStatus::Persistent
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_kind() {
        assert_eq!(ErrorStatus::for_kind(ErrorKind::RenderFailed), ErrorStatus::Temporary);
        assert_eq!(ErrorStatus::for_kind(ErrorKind::InvalidNodeId), ErrorStatus::Permanent);
        assert_eq!(ErrorStatus::default(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_persist_only_moves_temporary() {
        assert_eq!(ErrorStatus::Temporary.persist(), ErrorStatus::Persistent);
        assert_eq!(ErrorStatus::Permanent.persist(), ErrorStatus::Permanent);
        assert!(!ErrorStatus::Persistent.is_retryable());
        assert_eq!(ErrorStatus::Persistent.to_string(), "persistent");
    }
}
