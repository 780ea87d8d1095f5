use super::Registry;
use crate::error::Result;

/// A startup registration submitted by [`register_polymorphic!`] or
/// [`register_version!`].
///
/// [`register_polymorphic!`]: crate::register_polymorphic
/// [`register_version!`]: crate::register_version
pub struct AutoRegistration(pub fn(&mut Registry) -> Result<()>);

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

// Only seen by `auto_register` where startup collection works.
#[cfg(feature = "auto_register")]
struct Available;

#[cfg(feature = "auto_register")]
inventory::collect!(Available);

#[cfg(feature = "auto_register")]
inventory::submit! {
    Available
}

// The registry is marked only once every registration succeeded, so a failed
// pass is retried by the next call.
#[cfg(feature = "auto_register")]
pub(super) fn apply(registry: &mut Registry) -> Result<bool> {
    if registry.auto_registered {
        return Ok(true);
    }
    let mut count = 0_usize;
    for registration in inventory::iter::<AutoRegistration> {
        (registration.0)(registry)?;
        count += 1;
    }
    log::debug!("applied {count} startup registrations");
    registry.auto_registered = inventory::iter::<Available>.into_iter().next().is_some();
    Ok(registry.auto_registered)
}

#[cfg(feature = "auto_register")]
#[doc(hidden)]
#[macro_export]
macro_rules! __auto_submit {
    ($register:ident) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::AutoRegistration($register)
        }
    };
}

#[cfg(not(feature = "auto_register"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __auto_submit {
    ($register:ident) => {
        const _: fn(&mut $crate::Registry) -> $crate::Result<()> = $register;
    };
}

/// Registers a concrete type for polymorphic use at startup, with the trait
/// objects it is stored as.
///
/// The registration is applied by [`Registry::auto_register`].
///
/// ```
/// use std::any::Any;
/// use vc_archive::{Archive, Registry, impl_upcast, polymorphic_base, register_polymorphic};
///
/// trait Tool: Any {}
/// polymorphic_base!(dyn Tool);
///
/// #[derive(Archive)]
/// struct Hammer;
/// impl Tool for Hammer {}
/// impl_upcast!(dyn Tool => Hammer);
///
/// register_polymorphic!(Hammer as "Hammer" => dyn Tool);
///
/// let mut registry = Registry::new();
/// if registry.auto_register().unwrap() {
///     assert!(registry.entry_by_key("Hammer").is_some());
/// }
/// ```
#[macro_export]
macro_rules! register_polymorphic {
    ($derived:ty as $key:literal $(=> $($base:ty),+)? $(,)?) => {
        const _: () = {
            fn __register(registry: &mut $crate::Registry) -> $crate::Result<()> {
                registry.register_polymorphic::<$derived>($key)?;
                $($(registry.register_relation::<$base, $derived>()?;)+)?
                ::core::result::Result::Ok(())
            }
            $crate::__auto_submit!(__register);
        };
    };
}

/// Sets the class version of a type at startup.
///
/// The registration is applied by [`Registry::auto_register`].
#[macro_export]
macro_rules! register_version {
    ($ty:ty, $version:expr $(,)?) => {
        const _: () = {
            fn __register(registry: &mut $crate::Registry) -> $crate::Result<()> {
                registry.set_version::<$ty>($version)
            }
            $crate::__auto_submit!(__register);
        };
    };
}

#[cfg(all(test, feature = "auto_register"))]
mod tests {
    use crate::{Error, Registry};

    enum Pinned {}

    crate::register_version!(Pinned, 3);

    #[test]
    fn startup_registrations_apply_once() {
        let mut registry = Registry::new();
        assert!(registry.auto_register().unwrap());
        assert_eq!(registry.version_of(core::any::TypeId::of::<Pinned>()), 3);
        assert!(registry.auto_register().unwrap());
    }

    #[test]
    fn failed_pass_is_retried() {
        let mut registry = Registry::new();
        registry.set_version::<Pinned>(1).unwrap();

        let first = registry.auto_register().unwrap_err();
        assert!(matches!(first, Error::ConflictingRegistration(_)), "{first}");
        let second = registry.auto_register().unwrap_err();
        assert!(matches!(second, Error::ConflictingRegistration(_)), "{second}");
    }
}
