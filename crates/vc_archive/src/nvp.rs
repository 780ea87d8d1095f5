//! Name-value pairs.
//!
//! A name tags a value for tree formats. Binary formats drop it, which makes
//! call order the only thing tying a binary stream to its reader.

use crate::binding::Save;

/// A value travelling with the name of its node.
#[derive(Debug)]
pub struct NameValue<'a, T: ?Sized> {
    pub name: &'a str,
    pub value: &'a T,
}

/// Pairs `value` with `name`.
///
/// ```
/// use vc_archive::{OutputArchive, make_nvp};
///
/// let mut text = Vec::new();
/// OutputArchive::json(&mut text).save_pair(make_nvp("hp", &100_u16)).unwrap();
/// assert!(String::from_utf8(text).unwrap().contains(r#""hp": 100"#));
/// ```
#[inline]
pub fn make_nvp<'a, T: Save + ?Sized>(name: &'a str, value: &'a T) -> NameValue<'a, T> {
    NameValue { name, value }
}

/// Writes a field under the name of its last path segment.
///
/// `nvp!(ar, self.position)` is `ar.nvp("position", &self.position)`.
///
/// ```
/// use vc_archive::{OutputArchive, nvp};
///
/// struct Player {
///     level: u8,
/// }
///
/// let player = Player { level: 9 };
/// let mut text = Vec::new();
/// let mut ar = OutputArchive::json(&mut text);
/// nvp!(ar, player.level).unwrap();
/// ar.finish().unwrap();
/// assert!(String::from_utf8(text).unwrap().contains(r#""level": 9"#));
/// ```
#[macro_export]
macro_rules! nvp {
    ($ar:expr, $($path:ident).+) => {
        $ar.nvp($crate::__last_ident!($($path)+), &$($path).+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __last_ident {
    ($last:ident) => {
        ::core::stringify!($last)
    };
    ($first:ident $($rest:ident)+) => {
        $crate::__last_ident!($($rest)+)
    };
}
