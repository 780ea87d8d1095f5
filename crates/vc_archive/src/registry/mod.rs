//! Polymorphic type registry.
//!
//! A [`Registry`] answers three questions for an archive:
//!
//! - which stable key names a concrete type inside a trait object;
//! - how a concrete type converts into each trait object it is saved as;
//! - which class version a type is currently written with.
//!
//! Registries are plain values. Build one at startup, then hand it to
//! archives by reference with `with_registry`. [`SharedRegistry`] wraps one
//! for use across threads.
//!
//! ## Trait objects
//!
//! A base trait declares [`Any`] as a supertrait and opts in with
//! [`polymorphic_base!`](crate::polymorphic_base). Each concrete type
//! implements [`Upcast`] for the bases it is stored as, usually through
//! [`impl_upcast!`](crate::impl_upcast), and is registered under a key.
//!
//! ```
//! use std::any::Any;
//! use vc_archive::{Archive, Registry, impl_upcast, polymorphic_base};
//!
//! trait Shape: Any {
//!     fn area(&self) -> f64;
//! }
//! polymorphic_base!(dyn Shape);
//!
//! #[derive(Archive)]
//! struct Square {
//!     side: f64,
//! }
//!
//! impl Shape for Square {
//!     fn area(&self) -> f64 {
//!         self.side * self.side
//!     }
//! }
//! impl_upcast!(dyn Shape => Square);
//!
//! let mut registry = Registry::new();
//! registry.register_polymorphic::<Square>("Square").unwrap();
//! registry.register_relation::<dyn Shape, Square>().unwrap();
//! assert!(registry.entry_by_key("Square").is_some());
//! ```
//!
//! ## auto_register
//!
//! With the `auto_register` feature, [`register_polymorphic!`](crate::register_polymorphic)
//! and [`register_version!`](crate::register_version) collect registrations
//! at startup through [`inventory`], and [`Registry::auto_register`] applies
//! them. Not every platform supports this. When it is unsupported or the
//! feature is off, `auto_register` returns `false`.
//!
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod auto;
mod entry;

// -----------------------------------------------------------------------------
// Exports

pub use entry::{Caster, PolymorphicEntry, Upcast};

#[doc(hidden)]
pub use auto::AutoRegistration;

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::{Any, TypeId, type_name};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vc_utils::TypeIdMap;
use vc_utils::hash::HashMap;

use crate::binding::{Load, Save};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Registry

/// Registered polymorphic types and class versions.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<&'static str, PolymorphicEntry>,
    by_type: TypeIdMap<&'static str>,
    by_handle: TypeIdMap<&'static str>,
    versions: TypeIdMap<u32>,
    auto_registered: bool,
}

impl Registry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `D` under `key`, with the type name as display name.
    ///
    /// Registering the same type under the same key again is accepted.
    /// A key already used by another type, or a type already registered
    /// under another key, is a [`Error::ConflictingRegistration`].
    #[inline]
    pub fn register_polymorphic<D: Save + Load + 'static>(&mut self, key: &'static str) -> Result<()> {
        self.register_polymorphic_named::<D>(key, type_name::<D>())
    }

    /// Registers `D` under `key` with a human readable name for messages.
    pub fn register_polymorphic_named<D: Save + Load + 'static>(
        &mut self,
        key: &'static str,
        display_name: &'static str,
    ) -> Result<()> {
        let type_id = TypeId::of::<D>();
        match (self.by_type.get(&type_id), self.entries.get(key)) {
            (Some(existing), _) if *existing == key => return Ok(()),
            (Some(existing), _) => {
                return Err(Error::ConflictingRegistration(format!(
                    "`{}` is already registered as `{existing}`, not `{key}`",
                    type_name::<D>()
                )));
            }
            (None, Some(entry)) => {
                return Err(Error::ConflictingRegistration(format!(
                    "key `{key}` already names `{}`, not `{}`",
                    entry.type_name(),
                    type_name::<D>()
                )));
            }
            (None, None) => {}
        }

        let mut entry = PolymorphicEntry::of::<D>(key, display_name);
        entry.insert_base::<dyn Any, D>();
        self.by_type.insert(type_id, key);
        self.by_handle.insert(entry.rc_type, key);
        self.by_handle.insert(entry.arc_type, key);
        self.entries.insert(key, entry);
        log::debug!("registered polymorphic type `{display_name}` as `{key}`");
        Ok(())
    }

    /// Allows `D` to be saved and loaded as `B`.
    ///
    /// `D` must be registered first. The relation to `dyn Any` is added by
    /// the registration itself.
    pub fn register_relation<B, D>(&mut self) -> Result<()>
    where
        B: ?Sized + 'static,
        D: Upcast<B>,
    {
        let key = self
            .by_type
            .get(&TypeId::of::<D>())
            .copied()
            .ok_or_else(|| Error::UnregisteredType(String::from(type_name::<D>())))?;
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(Error::UnregisteredType(String::from(key)));
        };
        if entry.insert_base::<B, D>() {
            log::debug!(
                "registered relation `{}` -> `{}`",
                entry.display_name(),
                type_name::<B>()
            );
        }
        Ok(())
    }

    /// Sets the version `T` is written with.
    ///
    /// Setting the same version again is accepted.
    pub fn set_version<T: ?Sized + 'static>(&mut self, version: u32) -> Result<()> {
        match self.versions.get_type::<T>() {
            Some(current) if *current == version => Ok(()),
            Some(current) => Err(Error::ConflictingRegistration(format!(
                "`{}` already has version {current}, not {version}",
                type_name::<T>()
            ))),
            None => {
                self.versions.insert_type::<T>(version);
                log::debug!("`{}` is at version {version}", type_name::<T>());
                Ok(())
            }
        }
    }

    /// The version of the type behind `type_id`, `0` if none was set.
    #[inline]
    pub fn version_of(&self, type_id: TypeId) -> u32 {
        self.versions.get(&type_id).copied().unwrap_or(0)
    }

    #[inline]
    pub fn entry_by_key(&self, key: &str) -> Option<&PolymorphicEntry> {
        self.entries.get(key)
    }

    /// The entry of a concrete type.
    #[inline]
    pub fn entry_by_type(&self, type_id: TypeId) -> Option<&PolymorphicEntry> {
        self.by_type
            .get(&type_id)
            .and_then(|key| self.entries.get(key))
    }

    /// The entry whose `Rc` or `Arc` handle has the type `handle`.
    #[inline]
    pub(crate) fn entry_by_handle(&self, handle: TypeId) -> Option<&PolymorphicEntry> {
        self.by_handle
            .get(&handle)
            .and_then(|key| self.entries.get(key))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies every registration collected by [`register_polymorphic!`]
    /// and [`register_version!`].
    ///
    /// Returns `Ok(true)` if startup collection works on this platform.
    /// Repeated calls are cheap.
    ///
    /// [`register_polymorphic!`]: crate::register_polymorphic
    /// [`register_version!`]: crate::register_version
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> Result<bool> {
        #[cfg(feature = "auto_register")]
        {
            auto::apply(self)
        }
        #[cfg(not(feature = "auto_register"))]
        {
            Ok(false)
        }
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// -----------------------------------------------------------------------------
// SharedRegistry

/// A [`Registry`] behind `Arc<RwLock<_>>`.
///
/// Archives borrow the registry, so hand them a read guard:
///
/// ```
/// use vc_archive::{OutputArchive, SharedRegistry};
///
/// let shared = SharedRegistry::default();
/// shared.write().set_version::<u8>(1).unwrap();
///
/// let registry = shared.read();
/// let mut bytes = Vec::new();
/// let mut ar = OutputArchive::binary(&mut bytes).with_registry(&registry);
/// assert_eq!(ar.class_version::<u8>().unwrap(), 1);
/// ```
#[derive(Clone, Default)]
pub struct SharedRegistry {
    pub internal: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    #[inline]
    pub fn new(registry: Registry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// Takes a read lock on the underlying [`Registry`].
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`Registry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.read().fmt(f)
    }
}
