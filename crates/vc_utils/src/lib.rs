#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod addr_map;
mod typeid_map;

pub mod collections;
pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use addr_map::AddrMap;
pub use typeid_map::TypeIdMap;
