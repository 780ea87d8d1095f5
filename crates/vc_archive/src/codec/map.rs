use alloc::collections::{BTreeMap, BTreeSet};
use core::hash::{BuildHasher, Hash};
use std::collections::HashMap as StdHashMap;
use std::collections::HashSet as StdHashSet;

use vc_utils::collections::{MultiMap, MultiSet};
use vc_utils::hash::hashbrown::HashMap as HashbrownMap;
use vc_utils::hash::hashbrown::HashSet as HashbrownSet;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;
use crate::format::NodeKind;

use super::seq::{load_seq, save_seq};

// -----------------------------------------------------------------------------
// Entries

struct EntryRef<'a, K, V>(&'a K, &'a V);

impl<K: Save, V: Save> Save for EntryRef<'_, K, V> {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp("key", self.0)?;
        ar.nvp("value", self.1)
    }
}

struct Entry<K, V>(K, V);

impl<K: Load, V: Load> Load for Entry<K, V> {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let key = ar.nvp("key")?;
        let value = ar.nvp("value")?;
        Ok(Entry(key, value))
    }
}

pub(super) fn save_entries<'m, K, V, I>(
    ar: &mut OutputArchive<'_>,
    len: usize,
    entries: I,
) -> Result<()>
where
    K: Save + 'm,
    V: Save + 'm,
    I: IntoIterator<Item = (&'m K, &'m V)>,
{
    ar.save_size(len)?;
    entries
        .into_iter()
        .try_for_each(|(key, value)| ar.save(&EntryRef(key, value)))
}

pub(super) fn load_entries<K: Load, V: Load>(
    ar: &mut InputArchive<'_>,
    mut insert: impl FnMut(K, V),
) -> Result<()> {
    load_seq(ar, |Entry(key, value): Entry<K, V>| insert(key, value)).map(drop)
}

// -----------------------------------------------------------------------------
// Maps

macro_rules! impl_map {
    ($map:ident<K, V $(, $s:ident)?> where K: $($bound:path),+) => {
        impl<K: Save, V: Save $(, $s)?> Save for $map<K, V $(, $s)?> {
            const NODE: NodeKind = NodeKind::Array;

            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                save_entries(ar, self.len(), self)
            }
        }

        impl<K, V $(, $s)?> Load for $map<K, V $(, $s)?>
        where
            K: Load $(+ $bound)+,
            V: Load,
            $($s: BuildHasher + Default,)?
        {
            const NODE: NodeKind = NodeKind::Array;

            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                let mut map = Self::default();
                load_entries(ar, |key, value| {
                    map.insert(key, value);
                })?;
                Ok(map)
            }
        }
    };
}

impl_map!(BTreeMap<K, V> where K: Ord);
impl_map!(StdHashMap<K, V, S> where K: Eq, Hash);
impl_map!(HashbrownMap<K, V, S> where K: Eq, Hash);

// -----------------------------------------------------------------------------
// Sets

macro_rules! impl_set {
    ($set:ident<T $(, $s:ident)?> where T: $($bound:path),+) => {
        impl<T: Save $(, $s)?> Save for $set<T $(, $s)?> {
            const NODE: NodeKind = NodeKind::Array;

            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                save_seq(ar, self.len(), self)
            }
        }

        impl<T $(, $s)?> Load for $set<T $(, $s)?>
        where
            T: Load $(+ $bound)+,
            $($s: BuildHasher + Default,)?
        {
            const NODE: NodeKind = NodeKind::Array;

            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                let mut set = Self::default();
                load_seq(ar, |item| {
                    set.insert(item);
                })?;
                Ok(set)
            }
        }
    };
}

impl_set!(BTreeSet<T> where T: Ord);
impl_set!(StdHashSet<T, S> where T: Eq, Hash);
impl_set!(HashbrownSet<T, S> where T: Eq, Hash);

// -----------------------------------------------------------------------------
// Multi-key containers

// One entry per occurrence, rebuilt by repeated insertion.

impl<K: Save, V: Save> Save for MultiMap<K, V> {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_entries(ar, self.len(), self.iter())
    }
}

impl<K: Load + Ord, V: Load> Load for MultiMap<K, V> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut map = Self::new();
        load_entries(ar, |key, value| map.insert(key, value))?;
        Ok(map)
    }
}

impl<T: Save> Save for MultiSet<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_seq(ar, self.len(), self.iter())
    }
}

impl<T: Load + Ord> Load for MultiSet<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut set = Self::new();
        load_seq(ar, |item| set.insert(item))?;
        Ok(set)
    }
}
