use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::any::{Any, TypeId, type_name};

use vc_utils::TypeIdMap;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::{Error, Result};
use crate::refs::DATA_NAME;

// -----------------------------------------------------------------------------
// Upcast

/// Converts owned handles of a concrete type into handles of the trait
/// object `B`.
///
/// Usually implemented with [`impl_upcast!`](crate::impl_upcast).
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be upcast to `{B}`",
    note = "add `impl_upcast!({B} => {Self})`"
)]
pub trait Upcast<B: ?Sized + 'static>: Sized + 'static {
    fn upcast_box(self: Box<Self>) -> Box<B>;

    fn upcast_rc(self: Rc<Self>) -> Rc<B>;

    fn upcast_arc(self: Arc<Self>) -> Arc<B>;
}

impl<T: Any> Upcast<dyn Any> for T {
    #[inline]
    fn upcast_box(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn upcast_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    #[inline]
    fn upcast_arc(self: Arc<Self>) -> Arc<dyn Any> {
        self
    }
}

/// Implements [`Upcast`] from each listed type to a trait object.
///
/// ```
/// use std::any::Any;
/// use vc_archive::impl_upcast;
///
/// trait Animal: Any {}
/// struct Cat;
/// struct Dog;
/// impl Animal for Cat {}
/// impl Animal for Dog {}
///
/// impl_upcast!(dyn Animal => Cat, Dog);
/// ```
#[macro_export]
macro_rules! impl_upcast {
    ($base:ty => $($derived:ty),+ $(,)?) => {
        $(
            impl $crate::Upcast<$base> for $derived {
                #[inline]
                fn upcast_box(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<$base> {
                    self
                }

                #[inline]
                fn upcast_rc(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$base> {
                    self
                }

                #[inline]
                fn upcast_arc(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$base> {
                    self
                }
            }
        )+
    };
}

// -----------------------------------------------------------------------------
// Caster

/// Turns erased handles of one registered type into handles of `B`.
///
/// Each function returns `None` when its input holds another type.
pub struct Caster<B: ?Sized> {
    pub boxed: fn(Box<dyn Any>) -> Option<Box<B>>,
    pub rc: fn(&dyn Any) -> Option<Rc<B>>,
    pub arc: fn(&dyn Any) -> Option<Arc<B>>,
}

impl<B: ?Sized + 'static> Caster<B> {
    fn of<D: Upcast<B>>() -> Self {
        Self {
            boxed: |any| any.downcast::<D>().ok().map(<D as Upcast<B>>::upcast_box),
            rc: |any| any.downcast_ref::<Rc<D>>().cloned().map(<D as Upcast<B>>::upcast_rc),
            arc: |any| any.downcast_ref::<Arc<D>>().cloned().map(<D as Upcast<B>>::upcast_arc),
        }
    }
}

// -----------------------------------------------------------------------------
// PolymorphicEntry

type SaveFn = fn(&dyn Any, &mut OutputArchive<'_>) -> Result<()>;
type LoadFn = fn(&mut InputArchive<'_>) -> Result<Box<dyn Any>>;

/// Everything an archive needs to write or rebuild one registered type
/// behind a trait object.
pub struct PolymorphicEntry {
    key: &'static str,
    display_name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    pub(super) rc_type: TypeId,
    pub(super) arc_type: TypeId,
    save: SaveFn,
    load_box: LoadFn,
    load_rc: LoadFn,
    load_arc: LoadFn,
    bases: TypeIdMap<Box<dyn Any + Send + Sync>>,
}

impl PolymorphicEntry {
    pub(super) fn of<D: Save + Load + 'static>(key: &'static str, display_name: &'static str) -> Self {
        Self {
            key,
            display_name,
            type_id: TypeId::of::<D>(),
            type_name: type_name::<D>(),
            rc_type: TypeId::of::<Rc<D>>(),
            arc_type: TypeId::of::<Arc<D>>(),
            save: |value, ar| {
                let value = value
                    .downcast_ref::<D>()
                    .ok_or_else(|| Error::mismatch(type_name::<D>(), "another type"))?;
                ar.nvp(DATA_NAME, value)
            },
            load_box: |ar| Ok(Box::new(ar.nvp::<D>(DATA_NAME)?)),
            load_rc: |ar| Ok(Box::new(Rc::new(ar.nvp::<D>(DATA_NAME)?))),
            load_arc: |ar| Ok(Box::new(Arc::new(ar.nvp::<D>(DATA_NAME)?))),
            bases: TypeIdMap::new(),
        }
    }

    /// Returns `true` if the relation is new.
    pub(super) fn insert_base<B: ?Sized + 'static, D: Upcast<B>>(&mut self) -> bool {
        self.bases
            .try_insert(TypeId::of::<B>(), || Box::new(Caster::<B>::of::<D>()))
    }

    /// The key written into archives.
    #[inline]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[inline]
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The conversions into `B`, if the relation is registered.
    pub fn caster<B: ?Sized + 'static>(&self) -> Option<&Caster<B>> {
        self.bases.get_type::<B>()?.downcast_ref()
    }

    /// Like [`caster`](Self::caster), failing with
    /// [`Error::UnregisteredRelation`].
    pub(crate) fn require<B: ?Sized + 'static>(&self) -> Result<&Caster<B>> {
        self.caster::<B>().ok_or_else(|| Error::UnregisteredRelation {
            base: type_name::<B>(),
            derived: alloc::string::String::from(self.display_name),
        })
    }

    /// Writes the `data` child of a value of this type.
    #[inline]
    pub(crate) fn save(&self, value: &dyn Any, ar: &mut OutputArchive<'_>) -> Result<()> {
        (self.save)(value, ar)
    }

    /// Reads the `data` child into a `Box<D>`.
    #[inline]
    pub(crate) fn load_box(&self, ar: &mut InputArchive<'_>) -> Result<Box<dyn Any>> {
        (self.load_box)(ar)
    }

    /// Reads the `data` child into an `Rc<D>`, returned erased.
    #[inline]
    pub(crate) fn load_rc(&self, ar: &mut InputArchive<'_>) -> Result<Box<dyn Any>> {
        (self.load_rc)(ar)
    }

    #[inline]
    pub(crate) fn load_arc(&self, ar: &mut InputArchive<'_>) -> Result<Box<dyn Any>> {
        (self.load_arc)(ar)
    }
}

impl core::fmt::Debug for PolymorphicEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PolymorphicEntry")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("bases", &self.bases.len())
            .finish_non_exhaustive()
    }
}
