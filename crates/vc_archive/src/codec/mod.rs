//! Bindings for primitives and standard containers.
//!
//! - Scalars and strings are leaves.
//! - Growable sequences are arrays preceded by a size. Tree formats infer the
//!   size from the children, so extra elements may be added by hand.
//! - Fixed-size arrays and tuples are arrays without a size.
//! - Maps are arrays of `{key, value}` entries and sets are arrays of keys.
//!   Loading does not depend on entry order. Multi-key containers write one
//!   entry per occurrence.
//! - [`NamedMap`] writes its keys as node names in text archives.
//! - `BinaryHeap` is written in its iteration order and rebuilt by pushing
//!   every element again.

mod adapter;
mod map;
mod named;
mod option;
mod scalar;
mod seq;
mod tuple;

pub use named::NamedMap;
