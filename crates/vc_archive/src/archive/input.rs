use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{TypeId, type_name};
use std::io::Read;

use vc_utils::TypeIdMap;
use vc_utils::hash::HashMap;

use super::state::ArchiveState;
use super::trace::Trace;
use super::{VARIANT_NAME, VERSION_NAME};
use crate::binding::Load;
use crate::deferred::ErasedLoad;
use crate::error::{Error, Result};
use crate::format::{ArchiveKind, BinaryDecoder, Decoder, NodeKind, Scalar, ScalarKind};
use crate::refs::LoadRefs;
use crate::registry::{PolymorphicEntry, Registry};

// -----------------------------------------------------------------------------
// InputArchive

/// A load session.
///
/// Reads must mirror the writes that produced the stream. Binary formats
/// read strictly in order. Tree formats resolve named reads by name, so
/// named values may be read in any order.
///
/// # Examples
///
/// ```
/// use vc_archive::{InputArchive, OutputArchive};
///
/// let mut text = Vec::new();
/// let mut ar = OutputArchive::json(&mut text);
/// ar.nvp("first", &1_u8).unwrap();
/// ar.nvp("second", &2_u8).unwrap();
/// ar.finish().unwrap();
///
/// let mut ar = InputArchive::json(text.as_slice()).unwrap();
/// assert_eq!(ar.nvp::<u8>("second").unwrap(), 2);
/// assert_eq!(ar.nvp::<u8>("first").unwrap(), 1);
/// ```
pub struct InputArchive<'a> {
    decoder: Box<dyn Decoder + 'a>,
    registry: Option<&'a Registry>,
    state: ArchiveState,
    pub(crate) refs: LoadRefs,
    versions: TypeIdMap<u32>,
    type_keys: HashMap<u32, &'static str>,
    deferred: VecDeque<Box<dyn ErasedLoad>>,
    deferred_resolved: bool,
    trace: Trace,
}

impl<'a> InputArchive<'a> {
    /// Creates an archive over any [`Decoder`].
    pub fn new(decoder: impl Decoder + 'a) -> Self {
        let kind = decoder.kind();
        log::debug!("opened {kind:?} input archive");
        Self {
            decoder: Box::new(decoder),
            registry: None,
            state: ArchiveState::Open,
            refs: LoadRefs::default(),
            versions: TypeIdMap::new(),
            type_keys: HashMap::default(),
            deferred: VecDeque::new(),
            deferred_resolved: false,
            trace: Trace::default(),
        }
    }

    /// Packed binary in native byte order.
    pub fn binary<R: Read + 'a>(reader: R) -> Self {
        Self::new(BinaryDecoder::new(reader))
    }

    /// Packed binary with a byte order marker, in either order.
    pub fn portable<R: Read + 'a>(reader: R) -> Result<Self> {
        BinaryDecoder::portable(reader).map(Self::new)
    }

    /// Parses the whole JSON document up front.
    #[cfg(feature = "json")]
    pub fn json<R: Read>(reader: R) -> Result<Self> {
        crate::format::tree::json::read_json(reader).map(Self::new)
    }

    /// Parses the whole XML document up front.
    #[cfg(feature = "xml")]
    pub fn xml<R: Read>(reader: R) -> Result<Self> {
        crate::format::tree::xml::read_xml(reader).map(Self::new)
    }

    /// Attaches the registry used for trait objects and class versions.
    pub fn with_registry(mut self, registry: &'a Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[inline]
    pub fn registry(&self) -> Option<&'a Registry> {
        self.registry
    }

    #[inline]
    pub fn kind(&self) -> ArchiveKind {
        self.decoder.kind()
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind() == ArchiveKind::Text
    }

    #[inline]
    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// The name of the next unread value in the current node.
    ///
    /// Lets a binding discover names it did not write itself, such as map
    /// keys stored as node names. Always `None` for binary archives and
    /// after the archive closed.
    pub fn next_name(&self) -> Option<&str> {
        if self.state.is_closed() {
            return None;
        }
        self.decoder.next_name()
    }

    fn guard<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.state.enter(ArchiveState::Reading)?;
        let result = op(self);
        if result.is_err() {
            self.state = ArchiveState::Closed;
        }
        result
    }

    fn process<T: Load>(&mut self, name: Option<&str>) -> Result<T> {
        self.guard(|ar| {
            ar.trace.push(name);
            ar.decoder.set_next_name(name);
            let result = match T::NODE {
                NodeKind::Value => T::load(ar),
                _ => ar.decoder.start_node().and_then(|()| {
                    let value = T::load(ar)?;
                    ar.decoder.finish_node()?;
                    Ok(value)
                }),
            };
            let result = ar.trace.attach(result);
            ar.trace.pop();
            result
        })
    }

    // -------------------------------------------------------------------------
    // Values

    /// Reads the next unnamed value.
    #[inline]
    pub fn load<T: Load>(&mut self) -> Result<T> {
        self.process(None)
    }

    /// Reads a named value. Binary formats ignore the name.
    #[inline]
    pub fn nvp<T: Load>(&mut self, name: &str) -> Result<T> {
        self.process(Some(name))
    }

    /// Reads one scalar in place. Used by bindings with [`NodeKind::Value`].
    pub fn load_scalar(&mut self, kind: ScalarKind) -> Result<Scalar<'static>> {
        self.guard(|ar| ar.decoder.load_scalar(kind))
    }

    /// Reads the length of a growable container.
    ///
    /// Tree formats count the unread children of the current node instead,
    /// so elements added to a saved tree by hand are picked up.
    pub fn load_size(&mut self) -> Result<usize> {
        self.guard(|ar| ar.decoder.load_size())
    }

    pub fn load_bytes(&mut self) -> Result<Vec<u8>> {
        self.guard(|ar| {
            ar.decoder.set_next_name(None);
            ar.decoder.load_bytes()
        })
    }

    pub fn nvp_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        self.guard(|ar| {
            ar.decoder.set_next_name(Some(name));
            ar.decoder.load_bytes()
        })
    }

    /// Reads an enum variant tag and returns its index into `names`.
    pub fn load_variant(&mut self, ty: &'static str, names: &[&str]) -> Result<u32> {
        let index = if self.is_text() {
            let name: String = self.nvp(VARIANT_NAME)?;
            names.iter().position(|n| *n == name).ok_or(Error::UnknownVariant {
                ty,
                found: name,
            })
        } else {
            let index: u32 = self.nvp(VARIANT_NAME)?;
            match names.get(index as usize) {
                Some(_) => Ok(index as usize),
                None => Err(Error::UnknownVariant {
                    ty,
                    found: alloc::format!("#{index}"),
                }),
            }
        };
        match index {
            Ok(index) => Ok(index as u32),
            Err(error) => {
                self.state = ArchiveState::Closed;
                Err(error)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Versions

    /// Returns the version `T` was written with.
    ///
    /// Reads it the first time `T` asks in this session and replays it
    /// afterwards.
    pub fn class_version<T: ?Sized + 'static>(&mut self) -> Result<u32> {
        let type_id = TypeId::of::<T>();
        if let Some(version) = self.versions.get(&type_id) {
            return Ok(*version);
        }
        let version: u32 = self.nvp(VERSION_NAME)?;
        self.versions.insert(type_id, version);
        log::trace!("read version {version} of `{}`", type_name::<T>());
        Ok(version)
    }

    // -------------------------------------------------------------------------
    // Polymorphic type ids

    /// Reads a polymorphic type id and returns the registered entry.
    pub(crate) fn load_type_key(&mut self, base: &'static str) -> Result<&'a PolymorphicEntry> {
        let registry = self.registry.ok_or(Error::NoRegistry(base));
        let result = registry.and_then(|registry| {
            let raw: u32 = self.nvp("type_id")?;
            let id = raw & !crate::refs::NEW_FLAG;
            let key = if raw == id {
                *self.type_keys.get(&id).ok_or(Error::UnknownTypeId(id))?
            } else {
                let name: String = self.nvp("type_name")?;
                let key = registry
                    .entry_by_key(&name)
                    .ok_or(Error::UnregisteredType(name))?
                    .key();
                self.type_keys.insert(id, key);
                key
            };
            registry
                .entry_by_key(key)
                .ok_or_else(|| Error::UnregisteredType(String::from(key)))
        });
        if result.is_err() {
            self.state = ArchiveState::Closed;
        }
        result
    }

    // -------------------------------------------------------------------------
    // Deferred

    pub(crate) fn defer(&mut self, job: Box<dyn ErasedLoad>) -> Result<()> {
        self.state.enter(ArchiveState::Reading)?;
        self.deferred.push_back(job);
        Ok(())
    }

    /// Reads every queued deferred value in queue order, including values
    /// queued while draining.
    ///
    /// May be called once per session.
    pub fn resolve_deferred(&mut self) -> Result<()> {
        self.guard(|ar| {
            if ar.deferred_resolved {
                return Err(Error::DeferredAlreadyResolved);
            }
            ar.deferred_resolved = true;
            while let Some(job) = ar.deferred.pop_front() {
                job.load_erased(ar)?;
            }
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Closing

    fn close(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Err(Error::Closed);
        }
        self.state = ArchiveState::Closed;
        log::debug!("closed {:?} input archive", self.decoder.kind());
        self.decoder.finish()?;
        match self.deferred.len() {
            0 => Ok(()),
            pending => Err(Error::UnresolvedDeferred(pending)),
        }
    }

    /// Closes the archive, failing if deferred values were never resolved.
    pub fn finish(mut self) -> Result<()> {
        self.close()
    }
}

impl Drop for InputArchive<'_> {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if let Err(error) = self.close() {
            log::warn!("input archive failed to close: {error}");
        }
    }
}

impl core::fmt::Debug for InputArchive<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputArchive")
            .field("kind", &self.decoder.kind())
            .field("state", &self.state)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}
