use alloc::collections::{LinkedList, VecDeque};
use alloc::vec::Vec;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::{Error, Result};
use crate::format::NodeKind;

// Upper bound for capacity reserved from a stored size.
const MAX_PREALLOC: usize = 1024;

/// Writes a size followed by every element.
pub(crate) fn save_seq<'t, T, I>(ar: &mut OutputArchive<'_>, len: usize, items: I) -> Result<()>
where
    T: Save + 't,
    I: IntoIterator<Item = &'t T>,
{
    ar.save_size(len)?;
    items.into_iter().try_for_each(|item| ar.save(item))
}

/// Reads a size and then that many elements into `push`.
pub(crate) fn load_seq<T: Load>(
    ar: &mut InputArchive<'_>,
    mut push: impl FnMut(T),
) -> Result<usize> {
    let len = ar.load_size()?;
    for _ in 0..len {
        push(ar.load()?);
    }
    Ok(len)
}

impl<T: Save> Save for [T] {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_seq(ar, self.len(), self)
    }
}

impl<T: Save> Save for Vec<T> {
    const NODE: NodeKind = NodeKind::Array;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        self.as_slice().save(ar)
    }
}

impl<T: Load> Load for Vec<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut items = Vec::new();
        let len = ar.load_size()?;
        items.reserve(len.min(MAX_PREALLOC));
        for _ in 0..len {
            items.push(ar.load()?);
        }
        Ok(items)
    }
}

impl<T: Save> Save for VecDeque<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_seq(ar, self.len(), self)
    }
}

impl<T: Load> Load for VecDeque<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut items = VecDeque::new();
        load_seq(ar, |item| items.push_back(item))?;
        Ok(items)
    }
}

impl<T: Save> Save for LinkedList<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        save_seq(ar, self.len(), self)
    }
}

impl<T: Load> Load for LinkedList<T> {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut items = LinkedList::new();
        load_seq(ar, |item| items.push_back(item))?;
        Ok(items)
    }
}

/// Fixed-size arrays carry no size.
impl<T: Save, const N: usize> Save for [T; N] {
    const NODE: NodeKind = NodeKind::Array;

    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        self.iter().try_for_each(|item| ar.save(item))
    }
}

impl<T: Load, const N: usize> Load for [T; N] {
    const NODE: NodeKind = NodeKind::Array;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(ar.load()?);
        }
        <[T; N]>::try_from(items)
            .map_err(|items| Error::malformed(format_args!("expected {N} items, got {}", items.len())))
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::{LinkedList, VecDeque};
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::{InputArchive, OutputArchive};

    #[test]
    fn sequences_round_trip_in_binary() {
        let list: LinkedList<i8> = [-1, 0, 1].into_iter().collect();
        let deque: VecDeque<String> = ["a", "b"].into_iter().map(String::from).collect();

        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&vec![vec![1_u16], vec![], vec![2, 3]]).unwrap();
        ar.save(&list).unwrap();
        ar.save(&deque).unwrap();
        ar.save(&[1.5_f64, 2.5]).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        assert_eq!(ar.load::<Vec<Vec<u16>>>().unwrap(), vec![vec![1], vec![], vec![2, 3]]);
        assert_eq!(ar.load::<LinkedList<i8>>().unwrap(), list);
        assert_eq!(ar.load::<VecDeque<String>>().unwrap(), deque);
        assert_eq!(ar.load::<[f64; 2]>().unwrap(), [1.5, 2.5]);
    }

    #[test]
    fn fixed_arrays_have_no_size() {
        let mut sized = Vec::new();
        OutputArchive::binary(&mut sized).save(&vec![7_u8; 4]).unwrap();
        let mut fixed = Vec::new();
        OutputArchive::binary(&mut fixed).save(&[7_u8; 4]).unwrap();
        assert_eq!(sized.len(), fixed.len() + 8);
    }
}
