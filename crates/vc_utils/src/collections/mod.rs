//! Containers the standard library does not provide.

// -----------------------------------------------------------------------------
// Modules

mod multi;

// -----------------------------------------------------------------------------
// Exports

pub use multi::{MultiMap, MultiSet};
