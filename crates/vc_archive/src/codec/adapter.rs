use alloc::collections::BinaryHeap;
use core::cmp::Reverse;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;
use crate::format::NodeKind;

use super::seq::{load_seq, save_seq};

/// Written in the heap's internal order, rebuilt by pushing each element.
impl<T: Save> Save for BinaryHeap<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_seq(ar, self.len(), self)
    }
}

impl<T: Load + Ord> Load for BinaryHeap<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut heap = BinaryHeap::new();
        load_seq(ar, |item| heap.push(item))?;
        Ok(heap)
    }
}

impl<T: Save> Save for Reverse<T> {
    const NODE: NodeKind = T::NODE;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        self.0.save(ar)
    }
}

impl<T: Load> Load for Reverse<T> {
    const NODE: NodeKind = T::NODE;

    #[inline]
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        T::load(ar).map(Reverse)
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BinaryHeap;
    use alloc::vec::Vec;
    use core::cmp::Reverse;

    use crate::{InputArchive, OutputArchive};

    #[test]
    fn heaps_pop_in_the_same_order() {
        let heap: BinaryHeap<Reverse<u32>> = [5, 1, 4, 2, 3].into_iter().map(Reverse).collect();

        let mut bytes = Vec::new();
        OutputArchive::binary(&mut bytes).save(&heap).unwrap();
        let loaded: BinaryHeap<Reverse<u32>> = InputArchive::binary(bytes.as_slice()).load().unwrap();

        assert_eq!(loaded.into_sorted_vec(), heap.into_sorted_vec());
    }
}
