//! The archive sessions.
//!
//! An [`OutputArchive`] or [`InputArchive`] owns one format, the reference
//! table, the deferred queue and the versions seen so far. It is driven by
//! one thread at a time and closes exactly once, either through `finish` or
//! when dropped.

// -----------------------------------------------------------------------------
// Modules

mod input;
mod output;
mod state;
mod trace;

// -----------------------------------------------------------------------------
// Exports

pub use input::InputArchive;
pub use output::OutputArchive;
pub use state::ArchiveState;

/// Child holding the class version, written once per type and session.
pub(crate) const VERSION_NAME: &str = "class_version";

/// Child holding an enum's variant tag.
pub(crate) const VARIANT_NAME: &str = "variant";
