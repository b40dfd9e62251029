//! Guard error types.

use crate::registry::{AccessKind, Operation};
use policy::{Origin, Permission, Resource};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Details of a denied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: AccessKind,
    pub operation: Operation,
    pub resource: Resource,
    /// The first required permission the origin lacked.
    pub permission: Permission,
    /// The first origin in the chain, innermost first, that lacked it.
    pub origin: Origin,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "denied {} access to {} (operation: {}, permission: {}, origin: {})",
            self.kind, self.resource, self.operation, self.permission, self.origin
        )
    }
}

/// Guard errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The policy denied the operation; it was not performed.
    #[error("{0}")]
    AccessDenied(Violation),

    /// A relative path could not be made absolute.
    #[error("cannot make {} absolute: {source}", .path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The guarded operation was allowed but failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AccessDenied(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::AccessDenied(v) => Some(v),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
