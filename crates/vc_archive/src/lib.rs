#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Generated code names this crate as `vc_archive`, which must also resolve
// inside the crate itself.
extern crate self as vc_archive;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod archive;
mod binding;
mod codec;
mod construct;
mod deferred;
mod error;
mod nvp;
mod refs;

pub mod format;
pub mod poly;
pub mod registry;

// -----------------------------------------------------------------------------
// Top-level exports

pub use archive::{ArchiveState, InputArchive, OutputArchive};
pub use binding::{Load, LoadMinimal, Primitive, Save, SaveMinimal};
pub use codec::NamedMap;
pub use construct::{Construct, LoadAndConstruct, load_and_construct};
pub use deferred::Deferred;
pub use error::{Error, Result};
pub use nvp::{NameValue, make_nvp};
pub use refs::{LoadPointee, NEW_FLAG, NULL_ID, SavePointee};
pub use registry::{Registry, SharedRegistry, Upcast};

/// Derives [`Save`] and [`Load`] from one field list.
///
/// Named fields are written under their names, tuple fields unnamed. Enum
/// values write a `variant` tag followed by the fields of that variant.
///
/// - `#[archive(versioned)]` on the type reads and writes its class version.
/// - `#[archive(rename = "name")]` on a field or variant changes its name.
/// - `#[archive(skip)]` on a field leaves it out. It loads as `Default`.
/// - `#[archive(since = N)]` on a field of a versioned type skips it for
///   streams older than version `N`. It loads as `Default` from those.
pub use vc_archive_derive::Archive;

pub mod prelude {
    //! The usual imports for writing bindings.

    pub use crate::{
        Archive, Deferred, InputArchive, Load, OutputArchive, Registry, Result, Save,
    };
}

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}
