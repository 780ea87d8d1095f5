#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_archive as archive;
pub use vc_utils as utils;

/// The items most programs need to write and read archives.
pub mod prelude {
    pub use vc_archive::prelude::*;
}
