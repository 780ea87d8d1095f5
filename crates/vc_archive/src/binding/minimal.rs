use alloc::string::String;

use super::{Load, Save};
use crate::error::Result;

mod sealed {
    pub trait Sealed {}
}

/// A representation allowed for minimal bindings: one scalar or a string.
///
/// Sealed. Containers and composite values are not accepted.
pub trait Primitive: Save + Load + sealed::Sealed {}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}
        impl Primitive for $ty {}
    )*};
}

impl_primitive!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
);

/// Reduces a value to a single [`Primitive`] on save.
///
/// Connect the pair to the archive with [`impl_minimal!`](crate::impl_minimal).
pub trait SaveMinimal {
    type Repr: Primitive;

    fn save_minimal(&self) -> Self::Repr;
}

/// Rebuilds a value from its [`Primitive`] representation.
///
/// The conversion may fail, for instance when a stored string does not parse.
pub trait LoadMinimal: Sized {
    type Repr: Primitive;

    fn load_minimal(repr: Self::Repr) -> Result<Self>;
}

/// Implements [`Save`] and [`Load`] for a type with a minimal pair.
///
/// The value takes the place of a scalar, so in tree formats it is a leaf
/// rather than a node.
///
/// ```
/// use vc_archive::{InputArchive, LoadMinimal, OutputArchive, Result, SaveMinimal};
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f32);
///
/// impl SaveMinimal for Celsius {
///     type Repr = f32;
///     fn save_minimal(&self) -> f32 {
///         self.0
///     }
/// }
///
/// impl LoadMinimal for Celsius {
///     type Repr = f32;
///     fn load_minimal(repr: f32) -> Result<Self> {
///         Ok(Celsius(repr))
///     }
/// }
///
/// vc_archive::impl_minimal!(Celsius);
///
/// let mut text = Vec::new();
/// OutputArchive::json(&mut text).nvp("temp", &Celsius(21.5)).unwrap();
/// assert!(String::from_utf8_lossy(&text).contains(r#""temp": 21.5"#));
///
/// let mut ar = InputArchive::json(text.as_slice()).unwrap();
/// assert_eq!(ar.nvp::<Celsius>("temp").unwrap(), Celsius(21.5));
/// ```
#[macro_export]
macro_rules! impl_minimal {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Save for $ty {
            const NODE: $crate::format::NodeKind = $crate::format::NodeKind::Value;

            #[inline]
            fn save(&self, ar: &mut $crate::OutputArchive<'_>) -> $crate::Result<()> {
                let repr = <$ty as $crate::SaveMinimal>::save_minimal(self);
                $crate::Save::save(&repr, ar)
            }
        }

        impl $crate::Load for $ty {
            const NODE: $crate::format::NodeKind = $crate::format::NodeKind::Value;

            #[inline]
            fn load(ar: &mut $crate::InputArchive<'_>) -> $crate::Result<Self> {
                let repr = <<$ty as $crate::LoadMinimal>::Repr as $crate::Load>::load(ar)?;
                <$ty as $crate::LoadMinimal>::load_minimal(repr)
            }
        }
    )+};
}
