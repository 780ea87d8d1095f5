use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};

use super::DATA_NAME;
use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;

// -----------------------------------------------------------------------------
// SavePointee

/// A type that can sit behind `Box`, `Rc` or `Arc` in an archive.
///
/// Every sized [`Save`] type is a pointee. Trait objects become pointees
/// through [`polymorphic_base!`](crate::polymorphic_base), which writes the
/// concrete type key before the payload.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be saved behind a pointer",
    label = "missing `SavePointee`",
    note = "trait objects need `polymorphic_base!(dyn Trait)`"
)]
pub trait SavePointee: 'static {
    /// Writes the payload children of a pointer node.
    fn save_payload(&self, ar: &mut OutputArchive<'_>) -> Result<()>;
}

impl<T: Save + 'static> SavePointee for T {
    #[inline]
    fn save_payload(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp(DATA_NAME, self)
    }
}

impl SavePointee for str {
    #[inline]
    fn save_payload(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp(DATA_NAME, self)
    }
}

impl<T: Save + 'static> SavePointee for [T] {
    #[inline]
    fn save_payload(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp(DATA_NAME, self)
    }
}

// -----------------------------------------------------------------------------
// LoadPointee

/// The load side of [`SavePointee`].
///
/// `load_rc` and `load_arc` read the payload of a freshly materialized id and
/// store the new handle in the archive's reference table. The `*_from_slot`
/// functions turn a handle already in that table back into `Rc<Self>` or
/// `Arc<Self>`, returning `None` when it holds an unrelated type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be loaded behind a pointer",
    label = "missing `LoadPointee`",
    note = "trait objects need `polymorphic_base!(dyn Trait)`"
)]
pub trait LoadPointee: 'static {
    fn load_box(ar: &mut InputArchive<'_>) -> Result<Box<Self>>;

    fn load_rc(ar: &mut InputArchive<'_>, id: u32) -> Result<Rc<Self>>;

    fn load_arc(ar: &mut InputArchive<'_>, id: u32) -> Result<Arc<Self>>;

    fn rc_from_slot(ar: &InputArchive<'_>, slot: &dyn Any) -> Option<Rc<Self>>;

    fn arc_from_slot(ar: &InputArchive<'_>, slot: &dyn Any) -> Option<Arc<Self>>;
}

impl<T: Load + 'static> LoadPointee for T {
    fn load_box(ar: &mut InputArchive<'_>) -> Result<Box<Self>> {
        ar.nvp::<T>(DATA_NAME).map(Box::new)
    }

    fn load_rc(ar: &mut InputArchive<'_>, id: u32) -> Result<Rc<Self>> {
        let handle = Rc::new(ar.nvp::<T>(DATA_NAME)?);
        ar.refs.insert(id, Box::new(Rc::clone(&handle)))?;
        Ok(handle)
    }

    fn load_arc(ar: &mut InputArchive<'_>, id: u32) -> Result<Arc<Self>> {
        let handle = Arc::new(ar.nvp::<T>(DATA_NAME)?);
        ar.refs.insert(id, Box::new(Arc::clone(&handle)))?;
        Ok(handle)
    }

    #[inline]
    fn rc_from_slot(_: &InputArchive<'_>, slot: &dyn Any) -> Option<Rc<Self>> {
        slot.downcast_ref::<Rc<T>>().cloned()
    }

    #[inline]
    fn arc_from_slot(_: &InputArchive<'_>, slot: &dyn Any) -> Option<Arc<Self>> {
        slot.downcast_ref::<Arc<T>>().cloned()
    }
}

// Unsized pointees load through their owned form and are stored as the
// unsized handle.
macro_rules! impl_unsized_pointee {
    ([$($generics:tt)*] $pointee:ty => $owned:ty) => {
        impl<$($generics)*> LoadPointee for $pointee {
            fn load_box(ar: &mut InputArchive<'_>) -> Result<Box<Self>> {
                ar.nvp::<$owned>(DATA_NAME).map(<$owned>::into_boxed)
            }

            fn load_rc(ar: &mut InputArchive<'_>, id: u32) -> Result<Rc<Self>> {
                let handle: Rc<Self> = Rc::from(ar.nvp::<$owned>(DATA_NAME)?);
                ar.refs.insert(id, Box::new(Rc::clone(&handle)))?;
                Ok(handle)
            }

            fn load_arc(ar: &mut InputArchive<'_>, id: u32) -> Result<Arc<Self>> {
                let handle: Arc<Self> = Arc::from(ar.nvp::<$owned>(DATA_NAME)?);
                ar.refs.insert(id, Box::new(Arc::clone(&handle)))?;
                Ok(handle)
            }

            #[inline]
            fn rc_from_slot(_: &InputArchive<'_>, slot: &dyn Any) -> Option<Rc<Self>> {
                slot.downcast_ref::<Rc<Self>>().cloned()
            }

            #[inline]
            fn arc_from_slot(_: &InputArchive<'_>, slot: &dyn Any) -> Option<Arc<Self>> {
                slot.downcast_ref::<Arc<Self>>().cloned()
            }
        }
    };
}

trait IntoBoxed<T: ?Sized> {
    fn into_boxed(self) -> Box<T>;
}

impl IntoBoxed<str> for String {
    #[inline]
    fn into_boxed(self) -> Box<str> {
        self.into_boxed_str()
    }
}

impl<T> IntoBoxed<[T]> for Vec<T> {
    #[inline]
    fn into_boxed(self) -> Box<[T]> {
        self.into_boxed_slice()
    }
}

impl_unsized_pointee!([] str => String);
impl_unsized_pointee!([T: Load + 'static] [T] => Vec<T>);

/// The name used in reference errors for `Rc<T>`.
#[inline]
pub(crate) fn rc_name<T: ?Sized>() -> &'static str {
    type_name::<Rc<T>>()
}

#[inline]
pub(crate) fn arc_name<T: ?Sized>() -> &'static str {
    type_name::<Arc<T>>()
}
