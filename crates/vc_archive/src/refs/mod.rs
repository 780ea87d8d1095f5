//! Reference and ownership tracking.
//!
//! Every shared handle (`Rc`, `Arc` and their weak forms) is written as a
//! node with an `id` child. The first strong handle to an allocation sets
//! [`NEW_FLAG`] on its id and is followed by a `data` child holding the
//! payload. Later handles to the same allocation repeat the bare id.
//!
//! Weak handles never carry a payload. On load, a weak id that has not been
//! materialized yet resolves to an empty weak handle.
//!
//! Ids start at 1 and are only meaningful inside one archive session.

// -----------------------------------------------------------------------------
// Modules

mod pointee;
mod pointer;

// -----------------------------------------------------------------------------
// Exports

pub use pointee::{LoadPointee, SavePointee};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use vc_utils::AddrMap;
use vc_utils::hash::HashMap;

use crate::error::{Error, Result};

/// Set on an id that is followed by its payload.
pub const NEW_FLAG: u32 = 0x8000_0000;

/// The id of a dangling weak handle.
pub const NULL_ID: u32 = 0;

pub(crate) const ID_NAME: &str = "id";
pub(crate) const DATA_NAME: &str = "data";

// -----------------------------------------------------------------------------
// Save side

#[derive(Debug, Clone, Copy)]
struct SaveRecord {
    id: u32,
    materialized: bool,
}

/// Maps allocation addresses to stream ids while saving.
///
/// A clone of every recorded handle is kept until the session ends, so an
/// address cannot be freed and reused by another allocation mid-session.
#[derive(Default)]
pub(crate) struct SaveRefs {
    records: AddrMap<SaveRecord>,
    keepalive: Vec<Box<dyn Any>>,
    last: u32,
}

impl SaveRefs {
    fn allocate(&mut self) -> Result<u32> {
        let id = self.last + 1;
        if id >= NEW_FLAG {
            return Err(Error::malformed("reference ids exhausted"));
        }
        self.last = id;
        Ok(id)
    }

    /// Returns the id of `addr` and whether its payload is written now.
    pub fn record_strong(
        &mut self,
        addr: usize,
        keep: impl FnOnce() -> Box<dyn Any>,
    ) -> Result<(u32, bool)> {
        if let Some(record) = self.records.get_mut(addr) {
            let first = !record.materialized;
            record.materialized = true;
            return Ok((record.id, first));
        }
        let id = self.allocate()?;
        self.records.insert(addr, SaveRecord { id, materialized: true });
        self.keepalive.push(keep());
        log::trace!("reference {id} materialized");
        Ok((id, true))
    }

    /// Returns the id of `addr` without claiming its payload.
    pub fn record_weak(&mut self, addr: usize, keep: impl FnOnce() -> Box<dyn Any>) -> Result<u32> {
        if let Some(record) = self.records.get(addr) {
            return Ok(record.id);
        }
        let id = self.allocate()?;
        self.records.insert(addr, SaveRecord { id, materialized: false });
        self.keepalive.push(keep());
        log::trace!("reference {id} recorded by a weak handle");
        Ok(id)
    }
}

// -----------------------------------------------------------------------------
// Load side

/// Maps stream ids to the handles materialized for them while loading.
///
/// A slot holds an `Rc<D>` or `Arc<D>` of the concrete type `D` that was
/// allocated, whatever handle type first asked for it.
#[derive(Default)]
pub(crate) struct LoadRefs {
    slots: HashMap<u32, Box<dyn Any>>,
}

impl LoadRefs {
    pub fn insert(&mut self, id: u32, handle: Box<dyn Any>) -> Result<()> {
        if id == NULL_ID || self.slots.contains_key(&id) {
            return Err(Error::malformed(format_args!(
                "reference {id} materialized twice"
            )));
        }
        self.slots.insert(id, handle);
        log::trace!("reference {id} loaded");
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&dyn Any> {
        self.slots.get(&id).map(|handle| &**handle)
    }
}
