use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;

/// Errors produced while writing or reading an archive, or while filling a
/// [`Registry`](crate::registry::Registry).
///
/// Every error is returned to the immediate caller. An archive that returned
/// an error is closed, and later operations fail with [`Error::Closed`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("the archive is closed")]
    Closed,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("value {value} does not fit in `{target}`")]
    OutOfRange { target: &'static str, value: String },

    #[error("no node named `{0}` in the current scope")]
    MissingNode(String),

    #[error("no unread node left in the current scope")]
    EndOfNode,

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("reference id {0} was never materialized")]
    UnknownReference(u32),

    #[error("reference id {id} does not hold a `{expected}`")]
    ReferenceMismatch { id: u32, expected: &'static str },

    #[error("deferred entries were already resolved in this archive")]
    DeferredAlreadyResolved,

    #[error("{0} deferred entries were never resolved")]
    UnresolvedDeferred(usize),

    #[error("`{0}` needs a registry but none is attached to the archive")]
    NoRegistry(&'static str),

    #[error("`{0}` is not registered for polymorphic use")]
    UnregisteredType(String),

    #[error("no relation from `{derived}` to `{base}` is registered")]
    UnregisteredRelation { base: &'static str, derived: String },

    #[error("conflicting registration: {0}")]
    ConflictingRegistration(String),

    #[error("unknown polymorphic type id {0}")]
    UnknownTypeId(u32),

    #[error("construct proxy for `{0}` was invoked more than once")]
    ConstructInvokedTwice(&'static str),

    #[error("construct proxy for `{0}` was never invoked")]
    ConstructNotInvoked(&'static str),

    #[error("`{found}` is not a variant of `{ty}`")]
    UnknownVariant { ty: &'static str, found: String },

    #[error("invalid node name `{0}`")]
    InvalidName(String),

    #[cfg(feature = "json")]
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(String),

    #[error("{source} (at `{path}`)")]
    Context { path: String, source: Box<Error> },
}

impl Error {
    /// Builds [`Error::TypeMismatch`] from anything printable.
    #[inline]
    pub fn mismatch(expected: &'static str, found: impl core::fmt::Display) -> Self {
        Self::TypeMismatch {
            expected,
            found: alloc::format!("{found}"),
        }
    }

    #[inline]
    pub fn out_of_range(target: &'static str, value: impl core::fmt::Display) -> Self {
        Self::OutOfRange {
            target,
            value: alloc::format!("{value}"),
        }
    }

    #[inline]
    pub fn malformed(message: impl core::fmt::Display) -> Self {
        Self::Malformed(alloc::format!("{message}"))
    }

    #[cfg(feature = "xml")]
    #[inline]
    pub(crate) fn xml(error: impl core::fmt::Display) -> Self {
        Self::Xml(alloc::format!("{error}"))
    }

    /// The error without any [`Error::Context`] wrapping.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// `Result` with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
