//! The per-type contract.
//!
//! A type becomes archivable through exactly one binding category:
//!
//! - the combined routine, `#[derive(Archive)]`, which writes [`Save`] and
//!   [`Load`] from one field list;
//! - a split pair, hand-written [`Save`] and [`Load`] impls;
//! - a minimal pair, [`SaveMinimal`] and [`LoadMinimal`] plus
//!   [`impl_minimal!`](crate::impl_minimal), reducing the type to one scalar
//!   or string;
//! - a reconstruction callback, [`LoadAndConstruct`](crate::LoadAndConstruct),
//!   for types without a plain construction path.
//!
//! Every category ends in `Save` and `Load` impls, so combining two of them
//! for the same type is a conflicting-implementation error and a missing
//! binding is an unsatisfied trait bound. Both are reported at build time.

// -----------------------------------------------------------------------------
// Modules

mod minimal;

// -----------------------------------------------------------------------------
// Exports

pub use minimal::{LoadMinimal, Primitive, SaveMinimal};

use crate::archive::{InputArchive, OutputArchive};
use crate::error::Result;
use crate::format::NodeKind;

// -----------------------------------------------------------------------------
// Save / Load

/// Writes a value into an [`OutputArchive`].
///
/// The archive opens a node of shape [`NODE`](Save::NODE) before calling
/// [`save`](Save::save) and closes it afterwards. Inside, the binding issues
/// its children through [`OutputArchive::nvp`] or [`OutputArchive::save`].
///
/// # Examples
///
/// ```
/// use vc_archive::{InputArchive, Load, OutputArchive, Result, Save};
///
/// struct Rgb(u8, u8, u8);
///
/// impl Save for Rgb {
///     fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
///         ar.nvp("r", &self.0)?;
///         ar.nvp("g", &self.1)?;
///         ar.nvp("b", &self.2)
///     }
/// }
///
/// impl Load for Rgb {
///     fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
///         Ok(Rgb(ar.nvp("r")?, ar.nvp("g")?, ar.nvp("b")?))
///     }
/// }
///
/// let mut text = Vec::new();
/// OutputArchive::json(&mut text).save(&Rgb(255, 128, 0)).unwrap();
/// let Rgb(r, g, b) = InputArchive::json(text.as_slice()).unwrap().load().unwrap();
/// assert_eq!((r, g, b), (255, 128, 0));
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` has no save binding",
    note = "derive `Archive`, implement `Save`, or implement `SaveMinimal` with `impl_minimal!`"
)]
pub trait Save {
    const NODE: NodeKind = NodeKind::Object;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()>;
}

/// Reads a value from an [`InputArchive`]. The mirror of [`Save`].
///
/// `NODE` must match the [`Save::NODE`] of the same type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` has no load binding",
    note = "derive `Archive`, implement `Load`, or implement `LoadMinimal` with `impl_minimal!`"
)]
pub trait Load: Sized {
    const NODE: NodeKind = NodeKind::Object;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self>;
}

impl<T: Save + ?Sized> Save for &T {
    const NODE: NodeKind = T::NODE;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        (**self).save(ar)
    }
}

impl<T: Save + ?Sized> Save for &mut T {
    const NODE: NodeKind = T::NODE;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        (**self).save(ar)
    }
}
