//! Wire formats.
//!
//! An archive drives exactly one [`Encoder`] or [`Decoder`]. The archive
//! owns the object-graph semantics (references, versions, deferral) and the
//! format only decides how scalars, sizes and nodes are laid out.
//!
//! - [`binary`]: packed values in call order, names and nodes are dropped.
//! - [`tree`]: named trees, serialized as JSON or XML when the archive closes.

// -----------------------------------------------------------------------------
// Modules

pub mod binary;
#[cfg(any(feature = "json", feature = "xml"))]
pub mod tree;

// -----------------------------------------------------------------------------
// Exports

pub use binary::{BinaryDecoder, BinaryEncoder, Endian, PortableOptions};

#[cfg(any(feature = "json", feature = "xml"))]
pub use tree::{Leaf, Node, TreeDecoder, TreeEncoder, TreeSink};

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Result;

// -----------------------------------------------------------------------------
// Kinds

/// The category of an archive, exposed to bindings through `is_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Names are discarded and call order is the wire contract.
    Binary,
    /// Names become node tags and may be looked up in any order.
    Text,
}

/// The shape a binding produces.
///
/// The archive emits a node prologue and epilogue around every binding whose
/// shape is not [`NodeKind::Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A single scalar, written in place.
    Value,
    /// A node whose children are addressed by name.
    Object,
    /// A node whose children are positional.
    Array,
}

// -----------------------------------------------------------------------------
// Scalars

/// A single primitive value on its way to or from a format.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Cow<'a, str>),
}

/// The variant a reader asks a [`Decoder`] for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    Str,
}

impl ScalarKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::Str => "string",
        }
    }
}

impl Scalar<'_> {
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Char(_) => ScalarKind::Char,
            Self::Str(_) => ScalarKind::Str,
        }
    }

    pub fn into_owned(self) -> Scalar<'static> {
        match self {
            Self::Str(s) => Scalar::Str(Cow::Owned(s.into_owned())),
            Self::Bool(v) => Scalar::Bool(v),
            Self::I8(v) => Scalar::I8(v),
            Self::I16(v) => Scalar::I16(v),
            Self::I32(v) => Scalar::I32(v),
            Self::I64(v) => Scalar::I64(v),
            Self::U8(v) => Scalar::U8(v),
            Self::U16(v) => Scalar::U16(v),
            Self::U32(v) => Scalar::U32(v),
            Self::U64(v) => Scalar::U64(v),
            Self::F32(v) => Scalar::F32(v),
            Self::F64(v) => Scalar::F64(v),
            Self::Char(v) => Scalar::Char(v),
        }
    }
}

// -----------------------------------------------------------------------------
// Encoder / Decoder

/// The output half of a format.
///
/// Calls arrive in exactly the order the bindings issue them. A name set with
/// [`set_next_name`](Encoder::set_next_name) applies to the next node or
/// scalar and is then cleared.
pub trait Encoder {
    fn kind(&self) -> ArchiveKind;

    fn set_next_name(&mut self, name: Option<&str>);

    /// Opens a node. `node` is never [`NodeKind::Value`].
    fn start_node(&mut self, node: NodeKind) -> Result<()>;

    fn finish_node(&mut self) -> Result<()>;

    /// Records the element count of a growable container.
    fn save_size(&mut self, len: usize) -> Result<()>;

    fn save_scalar(&mut self, value: Scalar<'_>) -> Result<()>;

    fn save_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Pushes everything to the sink. Called once, when the archive closes.
    fn finish(&mut self) -> Result<()>;
}

/// The input half of a format.
pub trait Decoder {
    fn kind(&self) -> ArchiveKind;

    /// Names the next node or scalar to read.
    ///
    /// Tree formats look the name up among the unread children of the
    /// current node. Binary formats ignore it.
    fn set_next_name(&mut self, name: Option<&str>);

    /// The name of the next unread child of the current node.
    ///
    /// Only tree formats keep names, binary formats always answer `None`.
    fn next_name(&self) -> Option<&str> {
        None
    }

    fn start_node(&mut self) -> Result<()>;

    fn finish_node(&mut self) -> Result<()>;

    /// Reads the element count of a growable container.
    ///
    /// Tree formats answer with the number of unread children.
    fn load_size(&mut self) -> Result<usize>;

    fn load_scalar(&mut self, kind: ScalarKind) -> Result<Scalar<'static>>;

    fn load_bytes(&mut self) -> Result<Vec<u8>>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Checks a node name against the rules shared by all tree formats.
///
/// Names must start with a letter or `_` and continue with letters, digits,
/// `_`, `-` or `.`, so every name is also a valid XML tag.
#[cfg_attr(not(any(feature = "json", feature = "xml")), allow(dead_code))]
pub(crate) fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        Ok(())
    } else {
        Err(crate::Error::InvalidName(String::from(name)))
    }
}
