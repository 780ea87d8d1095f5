use alloc::boxed::Box;
use alloc::rc::{self, Rc};
use alloc::sync::{self, Arc};
use core::any::Any;

use vc_utils::AddrMap;

use super::pointee::{arc_name, rc_name};
use super::{ID_NAME, LoadPointee, NEW_FLAG, NULL_ID, SavePointee};
use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Box

impl<T: ?Sized + SavePointee> Save for Box<T> {
    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        (**self).save_payload(ar)
    }
}

impl<T: ?Sized + LoadPointee> Load for Box<T> {
    #[inline]
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        T::load_box(ar)
    }
}

// -----------------------------------------------------------------------------
// Shared handles

fn save_strong(
    ar: &mut OutputArchive<'_>,
    addr: usize,
    keep: impl FnOnce() -> Box<dyn Any>,
    payload: impl FnOnce(&mut OutputArchive<'_>) -> Result<()>,
) -> Result<()> {
    let (id, first) = ar.refs.record_strong(addr, keep)?;
    if first {
        ar.nvp(ID_NAME, &(id | NEW_FLAG))?;
        payload(ar)
    } else {
        ar.nvp(ID_NAME, &id)
    }
}

// Splits a strong id into the id and whether its payload follows.
fn read_strong(ar: &mut InputArchive<'_>) -> Result<(u32, bool)> {
    let raw: u32 = ar.nvp(ID_NAME)?;
    let id = raw & !NEW_FLAG;
    if id == NULL_ID {
        return Err(Error::malformed("null id on a strong handle"));
    }
    Ok((id, raw != id))
}

fn read_weak(ar: &mut InputArchive<'_>) -> Result<u32> {
    let id: u32 = ar.nvp(ID_NAME)?;
    if id & NEW_FLAG != 0 {
        return Err(Error::malformed("payload flag on a weak handle"));
    }
    Ok(id)
}

macro_rules! impl_shared {
    ($rc:ident, $weak:path, $load:ident, $from_slot:ident, $name:ident) => {
        impl<T: ?Sized + SavePointee> Save for $rc<T> {
            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                save_strong(
                    ar,
                    AddrMap::<()>::addr_of(&**self),
                    || Box::new($rc::clone(self)),
                    |ar| (**self).save_payload(ar),
                )
            }
        }

        impl<T: ?Sized + LoadPointee> Load for $rc<T> {
            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                let (id, first) = read_strong(ar)?;
                if first {
                    return T::$load(ar, id);
                }
                let slot = ar.refs.get(id).ok_or(Error::UnknownReference(id))?;
                T::$from_slot(ar, slot).ok_or(Error::ReferenceMismatch {
                    id,
                    expected: $name::<T>(),
                })
            }
        }

        /// Dangling handles are written as id `0`. A live handle records the
        /// id of its target without writing the payload.
        impl<T: ?Sized + SavePointee> Save for $weak {
            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                let id = match self.upgrade() {
                    None => NULL_ID,
                    Some(strong) => {
                        let addr = AddrMap::<()>::addr_of(&*strong);
                        ar.refs.record_weak(addr, move || Box::new(strong))?
                    }
                };
                ar.nvp(ID_NAME, &id)
            }
        }

        /// Resolves to a dangling handle when the target has not been loaded
        /// yet.
        impl<T: LoadPointee> Load for $weak {
            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                let id = read_weak(ar)?;
                if id == NULL_ID {
                    return Ok(Self::new());
                }
                match ar.refs.get(id) {
                    None => {
                        log::trace!("weak reference {id} is not loaded yet");
                        Ok(Self::new())
                    }
                    Some(slot) => T::$from_slot(ar, slot)
                        .map(|strong| $rc::downgrade(&strong))
                        .ok_or(Error::ReferenceMismatch {
                            id,
                            expected: $name::<T>(),
                        }),
                }
            }
        }
    };
}

impl_shared!(Rc, rc::Weak<T>, load_rc, rc_from_slot, rc_name);
impl_shared!(Arc, sync::Weak<T>, load_arc, arc_from_slot, arc_name);

#[cfg(test)]
mod tests {
    use alloc::rc::{self, Rc};
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::{Error, InputArchive, OutputArchive};

    #[test]
    fn shared_handles_keep_their_identity() {
        let shared = Rc::new(String::from("shared"));
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&vec![Rc::clone(&shared), Rc::clone(&shared)]).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let loaded: Vec<Rc<String>> = ar.load().unwrap();
        ar.finish().unwrap();
        assert_eq!(*loaded[0], "shared");
        assert!(Rc::ptr_eq(&loaded[0], &loaded[1]));
    }

    #[test]
    fn unsized_pointees() {
        let text: Arc<str> = Arc::from("text");
        let items: Box<[u16]> = vec![1, 2, 3].into_boxed_slice();
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&(Arc::clone(&text), text, items)).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let (a, b, items): (Arc<str>, Arc<str>, Box<[u16]>) = ar.load().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, "text");
        assert_eq!(&*items, &[1, 2, 3]);
    }

    #[test]
    fn weak_handles() {
        let strong = Rc::new(7_u8);
        let dangling = Rc::downgrade(&Rc::new(0_u8));
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&(Rc::clone(&strong), Rc::downgrade(&strong), dangling))
            .unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let (strong, weak, dangling): (Rc<u8>, rc::Weak<u8>, rc::Weak<u8>) = ar.load().unwrap();
        assert!(Rc::ptr_eq(&strong, &weak.upgrade().unwrap()));
        assert!(dangling.upgrade().is_none());
    }

    #[test]
    fn back_reference_to_unknown_id_fails() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.nvp("id", &4_u32).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let error = ar.load::<Rc<u8>>().unwrap_err();
        assert!(matches!(error.root_cause(), Error::UnknownReference(4)));
    }

    #[test]
    fn mismatched_handle_types_fail() {
        let shared = Rc::new(1_u32);
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&(Rc::clone(&shared), shared)).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let error = ar.load::<(Rc<u32>, Rc<i32>)>().unwrap_err();
        assert!(matches!(
            error.root_cause(),
            Error::ReferenceMismatch { id: 1, .. }
        ));
    }

}
