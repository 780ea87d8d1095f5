use core::fmt::Debug;

use crate::hash::FixedHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// AddrMap

/// A map keyed by the address of an allocation.
///
/// Addresses are aligned, so their low bits carry little entropy. The map
/// hashes them with [`FixedHashState`] instead of passing them through.
///
/// An address only identifies an object while that object is alive. Callers
/// that outlive the object must keep it alive themselves, or the address may
/// be reused by an unrelated allocation.
///
/// # Examples
///
/// ```
/// use vc_utils::AddrMap;
///
/// let value = 5_u32;
/// let mut map = AddrMap::new();
/// map.insert(AddrMap::<()>::addr_of(&value), "five");
///
/// assert_eq!(map.get(AddrMap::<()>::addr_of(&value)), Some(&"five"));
/// ```
#[derive(Clone)]
pub struct AddrMap<V>(HashMap<usize, V, FixedHashState>);

impl<V> AddrMap<V> {
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(FixedHashState))
    }

    /// The address of `value`, ignoring any pointer metadata.
    #[inline]
    pub fn addr_of<T: ?Sized>(value: &T) -> usize {
        (value as *const T).cast::<()>() as usize
    }

    #[inline]
    pub fn get(&self, addr: usize) -> Option<&V> {
        self.0.get(&addr)
    }

    #[inline]
    pub fn get_mut(&mut self, addr: usize) -> Option<&mut V> {
        self.0.get_mut(&addr)
    }

    /// Returns the value at `addr` and whether it was just inserted.
    ///
    /// `f` is only called when `addr` is absent.
    #[inline]
    pub fn get_or_insert(&mut self, addr: usize, f: impl FnOnce() -> V) -> (&mut V, bool) {
        match self.0.entry(addr) {
            Entry::Vacant(entry) => (entry.insert(f()), true),
            Entry::Occupied(entry) => (entry.into_mut(), false),
        }
    }

    #[inline]
    pub fn insert(&mut self, addr: usize, value: V) -> Option<V> {
        self.0.insert(addr, value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<V> Default for AddrMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for AddrMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(addr, v)| (*addr as *const (), v)))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
