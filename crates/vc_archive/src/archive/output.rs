use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::any::{TypeId, type_name};
use std::io::Write;

use vc_utils::TypeIdMap;
use vc_utils::hash::HashMap;

use super::state::ArchiveState;
use super::trace::Trace;
use super::{VARIANT_NAME, VERSION_NAME};
use crate::binding::Save;
use crate::deferred::ErasedSave;
use crate::error::{Error, Result};
use crate::format::{ArchiveKind, BinaryEncoder, Encoder, NodeKind, PortableOptions, Scalar};
use crate::nvp::NameValue;
use crate::refs::{NEW_FLAG, SaveRefs};
use crate::registry::Registry;

// -----------------------------------------------------------------------------
// OutputArchive

/// A save session.
///
/// Values are written in the order they are passed in. Binary formats write
/// as they go. Tree formats keep everything in memory until the archive is
/// finished or dropped.
///
/// # Examples
///
/// ```
/// use vc_archive::{InputArchive, OutputArchive};
///
/// let mut bytes = Vec::new();
/// let mut ar = OutputArchive::portable(&mut bytes).unwrap();
/// ar.nvp("answer", &42_u32).unwrap();
/// ar.nvp("name", "deep thought").unwrap();
/// ar.finish().unwrap();
///
/// let mut ar = InputArchive::portable(bytes.as_slice()).unwrap();
/// assert_eq!(ar.nvp::<u32>("answer").unwrap(), 42);
/// assert_eq!(ar.nvp::<String>("name").unwrap(), "deep thought");
/// ```
pub struct OutputArchive<'a> {
    encoder: Box<dyn Encoder + 'a>,
    registry: Option<&'a Registry>,
    state: ArchiveState,
    pub(crate) refs: SaveRefs,
    versions: TypeIdMap<u32>,
    type_ids: HashMap<&'static str, u32>,
    deferred: VecDeque<Box<dyn ErasedSave>>,
    deferred_resolved: bool,
    trace: Trace,
}

impl<'a> OutputArchive<'a> {
    /// Creates an archive over any [`Encoder`].
    pub fn new(encoder: impl Encoder + 'a) -> Self {
        let kind = encoder.kind();
        log::debug!("opened {kind:?} output archive");
        Self {
            encoder: Box::new(encoder),
            registry: None,
            state: ArchiveState::Open,
            refs: SaveRefs::default(),
            versions: TypeIdMap::new(),
            type_ids: HashMap::default(),
            deferred: VecDeque::new(),
            deferred_resolved: false,
            trace: Trace::default(),
        }
    }

    /// Packed binary in native byte order.
    pub fn binary<W: Write + 'a>(writer: W) -> Self {
        Self::new(BinaryEncoder::new(writer))
    }

    /// Packed binary, little endian, with a byte order marker.
    pub fn portable<W: Write + 'a>(writer: W) -> Result<Self> {
        Self::portable_with(writer, PortableOptions::default())
    }

    pub fn portable_with<W: Write + 'a>(writer: W, options: PortableOptions) -> Result<Self> {
        BinaryEncoder::portable(writer, options).map(Self::new)
    }

    /// Pretty printed JSON.
    #[cfg(feature = "json")]
    pub fn json<W: Write + 'a>(writer: W) -> Self {
        Self::json_with(writer, crate::format::tree::json::JsonOptions::default())
    }

    #[cfg(feature = "json")]
    pub fn json_with<W: Write + 'a>(
        writer: W,
        options: crate::format::tree::json::JsonOptions,
    ) -> Self {
        use crate::format::tree::{TreeEncoder, json::JsonSink};
        Self::new(TreeEncoder::new(JsonSink::new(writer, options)))
    }

    /// Indented XML under an `<archive>` root.
    #[cfg(feature = "xml")]
    pub fn xml<W: Write + 'a>(writer: W) -> Self {
        Self::xml_with(writer, crate::format::tree::xml::XmlOptions::default())
    }

    #[cfg(feature = "xml")]
    pub fn xml_with<W: Write + 'a>(writer: W, options: crate::format::tree::xml::XmlOptions) -> Self {
        use crate::format::tree::{TreeEncoder, xml::XmlSink};
        Self::new(TreeEncoder::new(XmlSink::new(writer, options)))
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
        self.encoder.kind()
    }

    /// Whether names are kept, for bindings that lay out text differently.
    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind() == ArchiveKind::Text
    }

    #[inline]
    pub fn state(&self) -> ArchiveState {
        self.state
    }

    // Runs one operation, closing the archive if it fails.
    fn guard<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.state.enter(ArchiveState::Writing)?;
        let result = op(self);
        if result.is_err() {
            self.state = ArchiveState::Closed;
        }
        result
    }

    fn process<T: Save + ?Sized>(&mut self, name: Option<&str>, value: &T) -> Result<()> {
        self.guard(|ar| {
            ar.trace.push(name);
            ar.encoder.set_next_name(name);
            let result = match T::NODE {
                NodeKind::Value => value.save(ar),
                node => ar
                    .encoder
                    .start_node(node)
                    .and_then(|()| value.save(ar))
                    .and_then(|()| ar.encoder.finish_node()),
            };
            let result = ar.trace.attach(result);
            ar.trace.pop();
            result
        })
    }

    // -------------------------------------------------------------------------
    // Values

    /// Writes an unnamed value.
    ///
    /// Tree formats name it `value{n}` after its position.
    #[inline]
    pub fn save<T: Save + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.process(None, value)
    }

    /// Writes a named value. Binary formats drop the name.
    #[inline]
    pub fn nvp<T: Save + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        self.process(Some(name), value)
    }

    /// Writes a [`NameValue`] pair.
    #[inline]
    pub fn save_pair<T: Save + ?Sized>(&mut self, pair: NameValue<'_, T>) -> Result<()> {
        self.process(Some(pair.name), pair.value)
    }

    /// Writes one scalar in place. Used by bindings with [`NodeKind::Value`].
    pub fn save_scalar(&mut self, value: Scalar<'_>) -> Result<()> {
        self.guard(|ar| ar.encoder.save_scalar(value))
    }

    /// Records the length of a growable container.
    pub fn save_size(&mut self, len: usize) -> Result<()> {
        self.guard(|ar| ar.encoder.save_size(len))
    }

    /// Writes an unnamed blob, base64 encoded in tree formats.
    pub fn save_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.guard(|ar| {
            ar.encoder.set_next_name(None);
            ar.encoder.save_bytes(bytes)
        })
    }

    pub fn nvp_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.guard(|ar| {
            ar.encoder.set_next_name(Some(name));
            ar.encoder.save_bytes(bytes)
        })
    }

    /// Writes an enum variant tag: the index in binary formats, the name in
    /// text formats.
    pub fn save_variant(&mut self, index: u32, name: &str) -> Result<()> {
        if self.is_text() {
            self.nvp(VARIANT_NAME, name)
        } else {
            self.nvp(VARIANT_NAME, &index)
        }
    }

    // -------------------------------------------------------------------------
    // Versions

    /// Returns the version of `T`, writing it the first time `T` asks in
    /// this session.
    ///
    /// The version comes from the attached registry and defaults to `0`.
    /// Call it at the start of `T`'s own binding.
    pub fn class_version<T: ?Sized + 'static>(&mut self) -> Result<u32> {
        let type_id = TypeId::of::<T>();
        if let Some(version) = self.versions.get(&type_id) {
            return Ok(*version);
        }
        let version = self.registry.map_or(0, |r| r.version_of(type_id));
        self.nvp(VERSION_NAME, &version)?;
        self.versions.insert(type_id, version);
        log::trace!("wrote version {version} of `{}`", type_name::<T>());
        Ok(version)
    }

    // -------------------------------------------------------------------------
    // Polymorphic type ids

    /// Writes the stream id of a registered type key, followed by the key
    /// itself the first time it appears.
    pub(crate) fn save_type_key(&mut self, key: &'static str) -> Result<()> {
        let next = self.type_ids.len() as u32 + 1;
        let mut fresh = false;
        let id = *self.type_ids.entry(key).or_insert_with(|| {
            fresh = true;
            next
        });
        if fresh {
            log::trace!("polymorphic type `{key}` gets id {id}");
            self.nvp("type_id", &(id | NEW_FLAG))?;
            self.nvp("type_name", key)
        } else {
            self.nvp("type_id", &id)
        }
    }

    // -------------------------------------------------------------------------
    // Deferred

    /// Queues `value` to be written by [`resolve_deferred`](Self::resolve_deferred).
    pub fn defer<P: Save + 'static>(&mut self, value: P) -> Result<()> {
        self.state.enter(ArchiveState::Writing)?;
        self.deferred.push_back(Box::new(value));
        Ok(())
    }

    /// Writes every queued value in queue order, including values queued
    /// while draining.
    ///
    /// May be called once per session.
    pub fn resolve_deferred(&mut self) -> Result<()> {
        self.guard(|ar| {
            if ar.deferred_resolved {
                return Err(Error::DeferredAlreadyResolved);
            }
            ar.deferred_resolved = true;
            let mut count = 0_usize;
            while let Some(item) = ar.deferred.pop_front() {
                item.save_erased(ar)?;
                count += 1;
            }
            log::trace!("resolved {count} deferred entries");
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Closing

    fn close(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Err(Error::Closed);
        }
        self.state = ArchiveState::Closing;
        let flushed = self.encoder.finish();
        self.state = ArchiveState::Closed;
        log::debug!("closed {:?} output archive", self.encoder.kind());
        flushed?;
        match self.deferred.len() {
            0 => Ok(()),
            pending => Err(Error::UnresolvedDeferred(pending)),
        }
    }

    /// Closes the archive and reports any failure.
    ///
    /// Dropping an archive closes it as well, but can only log failures.
    pub fn finish(mut self) -> Result<()> {
        self.close()
    }
}

impl Drop for OutputArchive<'_> {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if let Err(error) = self.close() {
            log::warn!("output archive failed to close: {error}");
        }
    }
}

impl core::fmt::Debug for OutputArchive<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputArchive")
            .field("kind", &self.encoder.kind())
            .field("state", &self.state)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}
