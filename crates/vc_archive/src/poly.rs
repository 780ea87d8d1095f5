//! Trait objects behind pointers.
//!
//! A polymorphic payload is the registered type key followed by the `data`
//! child of the concrete type. The key is written in full the first time it
//! appears in a session and as a numeric id afterwards.
//!
//! The functions here back the pointee impls generated by
//! [`polymorphic_base!`](crate::polymorphic_base). Every one of them needs a
//! [`Registry`](crate::Registry) attached to the archive.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::any::{Any, type_name};

use crate::archive::{InputArchive, OutputArchive};
use crate::error::{Error, Result};
use crate::registry::PolymorphicEntry;

/// Writes `value` as a `B` trait object.
///
/// Fails before writing anything if the concrete type, or its relation to
/// `B`, is not registered.
pub fn save_polymorphic<B: ?Sized + 'static>(
    ar: &mut OutputArchive<'_>,
    value: &dyn Any,
) -> Result<()> {
    let base = type_name::<B>();
    let registry = ar.registry().ok_or(Error::NoRegistry(base))?;
    let type_id = Any::type_id(value);
    let entry = registry.entry_by_type(type_id).ok_or_else(|| {
        Error::UnregisteredType(format!("{type_id:?} stored as `{base}`"))
    })?;
    entry.require::<B>()?;
    ar.save_type_key(entry.key())?;
    entry.save(value, ar)
}

fn cast_failed(entry: &PolymorphicEntry, base: &'static str) -> Error {
    Error::mismatch(base, entry.type_name())
}

pub fn load_box<B: ?Sized + 'static>(ar: &mut InputArchive<'_>) -> Result<Box<B>> {
    let base = type_name::<B>();
    let entry = ar.load_type_key(base)?;
    let caster = entry.require::<B>()?;
    let value = entry.load_box(ar)?;
    (caster.boxed)(value).ok_or_else(|| cast_failed(entry, base))
}

/// Reads a freshly materialized shared payload and stores it under `id`.
pub fn load_rc<B: ?Sized + 'static>(ar: &mut InputArchive<'_>, id: u32) -> Result<Rc<B>> {
    let base = type_name::<B>();
    let entry = ar.load_type_key(base)?;
    let caster = entry.require::<B>()?;
    let handle = entry.load_rc(ar)?;
    let value = (caster.rc)(&*handle).ok_or_else(|| cast_failed(entry, base))?;
    ar.refs.insert(id, handle)?;
    Ok(value)
}

pub fn load_arc<B: ?Sized + 'static>(ar: &mut InputArchive<'_>, id: u32) -> Result<Arc<B>> {
    let base = type_name::<B>();
    let entry = ar.load_type_key(base)?;
    let caster = entry.require::<B>()?;
    let handle = entry.load_arc(ar)?;
    let value = (caster.arc)(&*handle).ok_or_else(|| cast_failed(entry, base))?;
    ar.refs.insert(id, handle)?;
    Ok(value)
}

/// Views a loaded shared handle as `Rc<B>`.
pub fn rc_from_slot<B: ?Sized + 'static>(ar: &InputArchive<'_>, slot: &dyn Any) -> Option<Rc<B>> {
    let entry = ar.registry()?.entry_by_handle(Any::type_id(slot))?;
    (entry.caster::<B>()?.rc)(slot)
}

pub fn arc_from_slot<B: ?Sized + 'static>(
    ar: &InputArchive<'_>,
    slot: &dyn Any,
) -> Option<Arc<B>> {
    let entry = ar.registry()?.entry_by_handle(Any::type_id(slot))?;
    (entry.caster::<B>()?.arc)(slot)
}

/// Makes a trait object usable behind `Box`, `Rc` and `Arc` in archives.
///
/// The trait must have [`Any`] as a supertrait.
///
/// ```
/// use std::any::Any;
/// use vc_archive::polymorphic_base;
///
/// trait Component: Any {
///     fn name(&self) -> &str;
/// }
///
/// polymorphic_base!(dyn Component);
/// ```
#[macro_export]
macro_rules! polymorphic_base {
    ($($base:ty),+ $(,)?) => {
        $(
            impl $crate::SavePointee for $base {
                #[inline]
                fn save_payload(&self, ar: &mut $crate::OutputArchive<'_>) -> $crate::Result<()> {
                    $crate::poly::save_polymorphic::<$base>(ar, self)
                }
            }

            impl $crate::LoadPointee for $base {
                #[inline]
                fn load_box(
                    ar: &mut $crate::InputArchive<'_>,
                ) -> $crate::Result<::std::boxed::Box<Self>> {
                    $crate::poly::load_box::<$base>(ar)
                }

                #[inline]
                fn load_rc(
                    ar: &mut $crate::InputArchive<'_>,
                    id: u32,
                ) -> $crate::Result<::std::rc::Rc<Self>> {
                    $crate::poly::load_rc::<$base>(ar, id)
                }

                #[inline]
                fn load_arc(
                    ar: &mut $crate::InputArchive<'_>,
                    id: u32,
                ) -> $crate::Result<::std::sync::Arc<Self>> {
                    $crate::poly::load_arc::<$base>(ar, id)
                }

                #[inline]
                fn rc_from_slot(
                    ar: &$crate::InputArchive<'_>,
                    slot: &dyn ::core::any::Any,
                ) -> ::core::option::Option<::std::rc::Rc<Self>> {
                    $crate::poly::rc_from_slot::<$base>(ar, slot)
                }

                #[inline]
                fn arc_from_slot(
                    ar: &$crate::InputArchive<'_>,
                    slot: &dyn ::core::any::Any,
                ) -> ::core::option::Option<::std::sync::Arc<Self>> {
                    $crate::poly::arc_from_slot::<$base>(ar, slot)
                }
            }
        )+
    };
}

polymorphic_base!(dyn Any);

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::any::Any;

    use crate::{Error, InputArchive, OutputArchive, Registry};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_polymorphic::<u32>("u32").unwrap();
        registry.register_polymorphic::<i8>("i8").unwrap();
        registry
    }

    #[test]
    fn any_boxes_round_trip() {
        let registry = registry();
        let values: Vec<Box<dyn Any>> = alloc::vec![Box::new(7_u32), Box::new(-1_i8), Box::new(9_u32)];
        let mut text = Vec::new();
        let mut ar = OutputArchive::json(&mut text).with_registry(&registry);
        ar.nvp("values", &values).unwrap();
        ar.finish().unwrap();

        let json = alloc::string::String::from_utf8(text.clone()).unwrap();
        assert_eq!(json.matches("\"type_name\"").count(), 2);

        let mut ar = InputArchive::json(text.as_slice()).unwrap().with_registry(&registry);
        let values: Vec<Box<dyn Any>> = ar.nvp("values").unwrap();
        assert_eq!(values[0].downcast_ref::<u32>(), Some(&7));
        assert_eq!(values[1].downcast_ref::<i8>(), Some(&-1));
        assert_eq!(values[2].downcast_ref::<u32>(), Some(&9));
    }

    #[test]
    fn shared_any_handles_keep_identity() {
        let registry = registry();
        let shared: Rc<dyn Any> = Rc::new(5_u32);
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes).with_registry(&registry);
        ar.save(&(Rc::clone(&shared), shared)).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice()).with_registry(&registry);
        let (a, b): (Rc<dyn Any>, Rc<dyn Any>) = ar.load().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
    }

    #[test]
    fn unregistered_types_fail_at_save() {
        let registry = registry();
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes).with_registry(&registry);
        let value: Box<dyn Any> = Box::new(1_u64);
        let error = ar.save(&value).unwrap_err();
        assert!(matches!(error.root_cause(), Error::UnregisteredType(_)));
        assert!(matches!(ar.save(&1_u8), Err(Error::Closed)));
    }

    #[test]
    fn missing_registry() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        let value: Box<dyn Any> = Box::new(1_u32);
        let error = ar.save(&value).unwrap_err();
        assert!(matches!(error.root_cause(), Error::NoRegistry(_)));
    }
}
