use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;

// -----------------------------------------------------------------------------
// MultiMap

/// An ordered map that keeps every value inserted under a key.
///
/// Keys iterate in order, values of one key in insertion order.
///
/// # Examples
///
/// ```
/// use vc_utils::collections::MultiMap;
///
/// let mut map = MultiMap::new();
/// map.insert("b", 2);
/// map.insert("a", 1);
/// map.insert("b", 3);
///
/// assert_eq!(map.len(), 3);
/// assert_eq!(map.get("b"), [2, 3]);
/// assert_eq!(map.iter().collect::<Vec<_>>(), [(&"a", &1), (&"b", &2), (&"b", &3)]);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MultiMap<K, V> {
    inner: BTreeMap<K, Vec<V>>,
    len: usize,
}

impl<K, V> MultiMap<K, V> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of entries, counting every value of a repeated key.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    #[inline]
    pub fn key_len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value)))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.len = 0;
    }
}

impl<K: Ord, V> MultiMap<K, V> {
    /// Adds `value` after any values already stored under `key`.
    pub fn insert(&mut self, key: K, value: V) {
        self.inner.entry(key).or_default().push(value);
        self.len += 1;
    }

    /// Every value stored under `key`, in insertion order.
    pub fn get<Q: ?Sized + Ord>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
    {
        self.inner.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    #[inline]
    pub fn count<Q: ?Sized + Ord>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
    {
        self.get(key).len()
    }

    /// Removes and returns every value stored under `key`.
    pub fn remove<Q: ?Sized + Ord>(&mut self, key: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
    {
        let values = self.inner.remove(key).unwrap_or_default();
        self.len -= values.len();
        values
    }
}

impl<K, V> Default for MultiMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Extend<(K, V)> for MultiMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(|(key, value)| self.insert(key, value));
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for MultiMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MultiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// -----------------------------------------------------------------------------
// MultiSet

/// An ordered set that counts repeated items.
///
/// # Examples
///
/// ```
/// use vc_utils::collections::MultiSet;
///
/// let set: MultiSet<char> = "banana".chars().collect();
///
/// assert_eq!(set.len(), 6);
/// assert_eq!(set.count(&'a'), 3);
/// assert_eq!(set.iter().collect::<String>(), "aaabnn");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MultiSet<T> {
    counts: BTreeMap<T, usize>,
    len: usize,
}

impl<T> MultiSet<T> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of items, counting every repetition.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items in order, each repeated as often as it was inserted.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.counts
            .iter()
            .flat_map(|(item, &count)| core::iter::repeat_n(item, count))
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.len = 0;
    }
}

impl<T: Ord> MultiSet<T> {
    pub fn insert(&mut self, item: T) {
        *self.counts.entry(item).or_default() += 1;
        self.len += 1;
    }

    #[inline]
    pub fn count<Q: ?Sized + Ord>(&self, item: &Q) -> usize
    where
        T: Borrow<Q>,
    {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Removes one occurrence of `item`, returning whether there was one.
    pub fn remove<Q: ?Sized + Ord>(&mut self, item: &Q) -> bool
    where
        T: Borrow<Q>,
    {
        let Some(count) = self.counts.get_mut(item) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(item);
        }
        self.len -= 1;
        true
    }
}

impl<T> Default for MultiSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Extend<T> for MultiSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        iter.into_iter().for_each(|item| self.insert(item));
    }
}

impl<T: Ord> FromIterator<T> for MultiSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: fmt::Debug> fmt::Debug for MultiSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{MultiMap, MultiSet};

    #[test]
    fn map_keeps_values_per_key() {
        let mut map: MultiMap<u8, &str> = [(2, "b"), (1, "a"), (2, "c")].into_iter().collect();
        assert_eq!(map.len(), 3);
        assert_eq!(map.key_len(), 2);
        assert_eq!(map.count(&2), 2);
        assert_eq!(map.get(&7), [] as [&str; 0]);

        assert_eq!(map.remove(&2), ["b", "c"]);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
    }

    #[test]
    fn set_counts_repeats() {
        let mut set: MultiSet<u8> = [3, 1, 3, 3].into_iter().collect();
        assert_eq!(set.len(), 4);
        assert!(set.remove(&3));
        assert_eq!(set.count(&3), 2);
        assert!(!set.remove(&9));
        assert!(set.remove(&1));
        assert_eq!(set.iter().copied().collect::<alloc::vec::Vec<_>>(), [3, 3]);
    }
}
