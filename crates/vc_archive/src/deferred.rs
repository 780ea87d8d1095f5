//! Deferred edges.
//!
//! A [`Deferred`] field writes nothing where it sits. Its content is queued
//! and written when [`OutputArchive::resolve_deferred`] runs, which flattens
//! deep or cyclic graphs into a sequence of shallow writes.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::OnceCell;
use core::fmt::Debug;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Type-erased queue items

/// A queued save.
pub(crate) trait ErasedSave {
    fn save_erased(&self, ar: &mut OutputArchive<'_>) -> Result<()>;
}

impl<T: Save> ErasedSave for T {
    #[inline]
    fn save_erased(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.save(self)
    }
}

/// A queued load. Consumed when it runs.
pub(crate) trait ErasedLoad {
    fn load_erased(self: Box<Self>, ar: &mut InputArchive<'_>) -> Result<()>;
}

struct Fill<P> {
    cell: Rc<OnceCell<P>>,
}

impl<P: Load> ErasedLoad for Fill<P> {
    fn load_erased(self: Box<Self>, ar: &mut InputArchive<'_>) -> Result<()> {
        let Some(value) = ar.load::<Option<P>>()? else {
            return Ok(());
        };
        self.cell
            .set(value)
            .map_err(|_| Error::malformed("deferred value filled twice"))
    }
}

// -----------------------------------------------------------------------------
// Deferred

/// A handle whose serialization is postponed until the archive resolves its
/// deferred queue.
///
/// Clones share one cell, so a loaded `Deferred` can be kept anywhere in the
/// graph and observes the value once [`InputArchive::resolve_deferred`] has
/// filled it. Until then [`get`](Self::get) returns `None`.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use vc_archive::{Deferred, InputArchive, OutputArchive};
///
/// let edge = Deferred::new(Rc::new(5_u32));
/// let mut bytes = Vec::new();
/// let mut ar = OutputArchive::binary(&mut bytes);
/// ar.nvp("edge", &edge).unwrap();
/// ar.resolve_deferred().unwrap();
/// ar.finish().unwrap();
///
/// let mut ar = InputArchive::binary(bytes.as_slice());
/// let edge: Deferred<Rc<u32>> = ar.nvp("edge").unwrap();
/// assert!(edge.get().is_none());
/// ar.resolve_deferred().unwrap();
/// assert_eq!(edge.get().map(|n| **n), Some(5));
/// ```
pub struct Deferred<P> {
    cell: Rc<OnceCell<P>>,
}

impl<P> Deferred<P> {
    pub fn new(value: P) -> Self {
        Self {
            cell: Rc::new(OnceCell::from(value)),
        }
    }

    /// A handle with no value, written as absent.
    pub fn empty() -> Self {
        Self {
            cell: Rc::new(OnceCell::new()),
        }
    }

    /// Fills an empty handle. Returns the value back if it was already set.
    ///
    /// Cycles are closed by creating a handle empty and setting it once its
    /// target exists.
    #[inline]
    pub fn set(&self, value: P) -> Result<(), P> {
        self.cell.set(value)
    }

    #[inline]
    pub fn get(&self) -> Option<&P> {
        self.cell.get()
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<P: Clone> Deferred<P> {
    /// Takes the value out, cloning it if other handles share the cell.
    pub fn into_inner(self) -> Option<P> {
        match Rc::try_unwrap(self.cell) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.get().cloned(),
        }
    }
}

impl<P> Clone for Deferred<P> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<P> Default for Deferred<P> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<P: Debug> Debug for Deferred<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Deferred").field(value).finish(),
            None => f.write_str("Deferred(<unresolved>)"),
        }
    }
}

impl<P: Save + Clone + 'static> Save for Deferred<P> {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.defer(self.cell.get().cloned())
    }
}

impl<P: Load + 'static> Load for Deferred<P> {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let handle = Self::empty();
        ar.defer(Box::new(Fill {
            cell: Rc::clone(&handle.cell),
        }))?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::Deferred;
    use crate::{Error, InputArchive, OutputArchive};

    #[test]
    fn payload_lands_at_the_resolve_point() {
        let mut text = Vec::new();
        let mut ar = OutputArchive::json(&mut text);
        ar.nvp("edge", &Deferred::new(String::from("late"))).unwrap();
        ar.nvp("marker", &1_u8).unwrap();
        ar.resolve_deferred().unwrap();
        ar.finish().unwrap();

        let text = String::from_utf8(text).unwrap();
        let marker = text.find("marker").unwrap();
        let late = text.find("late").unwrap();
        assert!(marker < late);
    }

    #[test]
    fn nested_deferrals_drain_in_one_call() {
        let inner = Deferred::new(3_u8);
        let outer = Deferred::new(inner);
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&outer).unwrap();
        ar.resolve_deferred().unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let outer: Deferred<Deferred<u8>> = ar.load().unwrap();
        ar.resolve_deferred().unwrap();
        ar.finish().unwrap();
        assert_eq!(outer.get().and_then(Deferred::get), Some(&3));
    }

    #[test]
    fn empty_handles_stay_empty() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&Deferred::<Rc<u8>>::empty()).unwrap();
        ar.resolve_deferred().unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let edge: Deferred<Rc<u8>> = ar.load().unwrap();
        ar.resolve_deferred().unwrap();
        assert!(!edge.is_resolved());
    }

    #[test]
    fn resolving_twice_fails() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.resolve_deferred().unwrap();
        assert!(matches!(
            ar.resolve_deferred(),
            Err(Error::DeferredAlreadyResolved)
        ));
        assert!(matches!(ar.save(&1_u8), Err(Error::Closed)));
    }

    #[test]
    fn unresolved_entries_fail_the_finish() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&Deferred::new(1_u8)).unwrap();
        assert!(matches!(ar.finish(), Err(Error::UnresolvedDeferred(1))));
    }
}
