//! Tree formats.
//!
//! Writers build a [`Node`] tree in memory and hand it to a [`TreeSink`]
//! only when the archive closes, so nothing reaches the sink before then.
//! Readers parse the whole document into a tree first and then walk it with
//! a [`TreeDecoder`], which resolves named reads by lookup and unnamed reads
//! by position.

// -----------------------------------------------------------------------------
// Modules

#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "xml")]
pub mod xml;

// -----------------------------------------------------------------------------
// Imports

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{ArchiveKind, Decoder, Encoder, NodeKind, Scalar, ScalarKind, check_name};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Node

/// A node of an in-memory archive tree.
///
/// Children keep their names even inside arrays, so formats that need a tag
/// for every element (XML) can use them. Formats without tags (JSON arrays)
/// drop them.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Object(Vec<(String, Node)>),
    Array(Vec<(String, Node)>),
}

/// A scalar stored in a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Leaf {
    fn from_scalar(value: Scalar<'_>) -> Self {
        match value {
            Scalar::Bool(v) => Self::Bool(v),
            Scalar::I8(v) => Self::Int(v.into()),
            Scalar::I16(v) => Self::Int(v.into()),
            Scalar::I32(v) => Self::Int(v.into()),
            Scalar::I64(v) => Self::Int(v),
            Scalar::U8(v) => Self::UInt(v.into()),
            Scalar::U16(v) => Self::UInt(v.into()),
            Scalar::U32(v) => Self::UInt(v.into()),
            Scalar::U64(v) => Self::UInt(v),
            Scalar::F32(v) => Self::Float(v.into()),
            Scalar::F64(v) => Self::Float(v),
            Scalar::Char(v) => Self::Str(v.to_string()),
            Scalar::Str(v) => Self::Str(v.into_owned()),
        }
    }

    /// The text form used by formats without typed scalars.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(v) => Cow::Borrowed(if *v { "true" } else { "false" }),
            Self::Int(v) => Cow::Owned(v.to_string()),
            Self::UInt(v) => Cow::Owned(v.to_string()),
            Self::Float(v) => float_text(*v),
            Self::Str(v) => Cow::Borrowed(v),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Null => String::from("null"),
            Self::Str(v) => format!("string `{v}`"),
            other => other.to_text().into_owned(),
        }
    }

    fn into_scalar(self, kind: ScalarKind) -> Result<Scalar<'static>> {
        Ok(match kind {
            ScalarKind::Bool => Scalar::Bool(match self {
                Self::Bool(v) => v,
                Self::Str(s) if s == "true" => true,
                Self::Str(s) if s == "false" => false,
                other => return Err(Error::mismatch("bool", other.describe())),
            }),
            ScalarKind::I8 => Scalar::I8(self.into_int(kind)?),
            ScalarKind::I16 => Scalar::I16(self.into_int(kind)?),
            ScalarKind::I32 => Scalar::I32(self.into_int(kind)?),
            ScalarKind::I64 => Scalar::I64(self.into_int(kind)?),
            ScalarKind::U8 => Scalar::U8(self.into_int(kind)?),
            ScalarKind::U16 => Scalar::U16(self.into_int(kind)?),
            ScalarKind::U32 => Scalar::U32(self.into_int(kind)?),
            ScalarKind::U64 => Scalar::U64(self.into_int(kind)?),
            // Narrowing to `f32` rounds to the nearest value, which restores
            // the `f32` that was widened on save.
            ScalarKind::F32 => Scalar::F32(self.into_float()? as f32),
            ScalarKind::F64 => Scalar::F64(self.into_float()?),
            ScalarKind::Char => match self {
                Self::Str(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Scalar::Char(c),
                        _ => return Err(Error::mismatch("char", format!("`{s}`"))),
                    }
                }
                other => return Err(Error::mismatch("char", other.describe())),
            },
            ScalarKind::Str => match self {
                Self::Str(s) => Scalar::Str(Cow::Owned(s)),
                other => return Err(Error::mismatch("string", other.describe())),
            },
        })
    }

    fn into_int<T>(self, kind: ScalarKind) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64> + core::str::FromStr,
    {
        match self {
            Self::Int(v) => {
                <T as TryFrom<i64>>::try_from(v).map_err(|_| Error::out_of_range(kind.name(), v))
            }
            Self::UInt(v) => {
                <T as TryFrom<u64>>::try_from(v).map_err(|_| Error::out_of_range(kind.name(), v))
            }
            Self::Str(s) => s
                .trim()
                .parse::<T>()
                .map_err(|_| Error::mismatch(kind.name(), format!("`{s}`"))),
            other => Err(Error::mismatch(kind.name(), other.describe())),
        }
    }

    fn into_float(self) -> Result<f64> {
        match self {
            Self::Float(v) => Ok(v),
            Self::Int(v) => Ok(v as f64),
            Self::UInt(v) => Ok(v as f64),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::mismatch("float", format!("`{s}`"))),
            other => Err(Error::mismatch("float", other.describe())),
        }
    }
}

/// Non-finite floats are spelled `NaN`, `inf` and `-inf`, which is also
/// what `f64::from_str` accepts.
pub(crate) fn float_text(value: f64) -> Cow<'static, str> {
    if value.is_nan() {
        Cow::Borrowed("NaN")
    } else if value.is_infinite() {
        Cow::Borrowed(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        Cow::Owned(value.to_string())
    }
}

mod blob {
    use alloc::string::String;
    use alloc::vec::Vec;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    use crate::error::{Error, Result};

    pub(super) fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    pub(super) fn decode(text: &str) -> Result<Vec<u8>> {
        STANDARD.decode(text.trim()).map_err(Error::malformed)
    }
}

// -----------------------------------------------------------------------------
// TreeSink

/// Serializes a finished tree. Implemented by each tree format.
pub trait TreeSink {
    /// Writes `root`, always a [`Node::Object`], and flushes.
    fn write_tree(&mut self, root: &Node) -> Result<()>;
}

// -----------------------------------------------------------------------------
// TreeEncoder

struct BuildFrame {
    name: Option<String>,
    kind: NodeKind,
    children: Vec<(String, Node)>,
}

/// An [`Encoder`] that builds a [`Node`] tree and writes it on
/// [`finish`](Encoder::finish).
///
/// Unnamed children are named `value0`, `value1`, ... after their position
/// in the enclosing node.
pub struct TreeEncoder<S: TreeSink> {
    sink: S,
    stack: Vec<BuildFrame>,
    next_name: Option<String>,
}

impl<S: TreeSink> TreeEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            stack: alloc::vec![BuildFrame {
                name: None,
                kind: NodeKind::Object,
                children: Vec::new(),
            }],
            next_name: None,
        }
    }

    fn take_name(&mut self) -> Result<Option<String>> {
        match self.next_name.take() {
            Some(name) => check_name(&name).map(|()| Some(name)),
            None => Ok(None),
        }
    }

    fn attach(&mut self, name: Option<String>, node: Node) -> Result<()> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::malformed("node closed more often than opened"))?;
        let name = name.unwrap_or_else(|| format!("value{}", frame.children.len()));
        frame.children.push((name, node));
        Ok(())
    }
}

impl<S: TreeSink> Encoder for TreeEncoder<S> {
    #[inline]
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Text
    }

    fn set_next_name(&mut self, name: Option<&str>) {
        self.next_name = name.map(String::from);
    }

    fn start_node(&mut self, kind: NodeKind) -> Result<()> {
        let name = self.take_name()?;
        self.stack.push(BuildFrame {
            name,
            kind,
            children: Vec::new(),
        });
        Ok(())
    }

    fn finish_node(&mut self) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(Error::malformed("node closed more often than opened"));
        }
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::malformed("node closed more often than opened"))?;
        let node = match frame.kind {
            NodeKind::Array => Node::Array(frame.children),
            _ => Node::Object(frame.children),
        };
        self.attach(frame.name, node)
    }

    #[inline]
    fn save_size(&mut self, _: usize) -> Result<()> {
        Ok(())
    }

    fn save_scalar(&mut self, value: Scalar<'_>) -> Result<()> {
        let name = self.take_name()?;
        self.attach(name, Node::Leaf(Leaf::from_scalar(value)))
    }

    fn save_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let name = self.take_name()?;
        self.attach(name, Node::Leaf(Leaf::Str(blob::encode(bytes))))
    }

    fn finish(&mut self) -> Result<()> {
        if self.stack.len() != 1 {
            return Err(Error::malformed(format_args!(
                "{} nodes still open when the archive closed",
                self.stack.len() - 1
            )));
        }
        let children = self
            .stack
            .last_mut()
            .map(|root| core::mem::take(&mut root.children))
            .unwrap_or_default();
        self.sink.write_tree(&Node::Object(children))
    }
}

// -----------------------------------------------------------------------------
// TreeDecoder

struct ReadFrame {
    children: Vec<Option<(String, Node)>>,
    next: usize,
    positional: bool,
}

impl ReadFrame {
    fn new(children: Vec<(String, Node)>, positional: bool) -> Self {
        Self {
            children: children.into_iter().map(Some).collect(),
            next: 0,
            positional,
        }
    }

    fn take_next(&mut self) -> Option<Node> {
        while self.next < self.children.len() {
            let slot = self.children[self.next].take();
            self.next += 1;
            if let Some((_, node)) = slot {
                return Some(node);
            }
        }
        None
    }

    fn take_named(&mut self, name: &str) -> Option<Node> {
        // Readers usually follow write order, so try the cursor first.
        let hit = |slot: &Option<(String, Node)>| slot.as_ref().is_some_and(|(n, _)| n == name);
        let index = if self.children.get(self.next).is_some_and(hit) {
            self.next
        } else {
            self.children.iter().position(hit)?
        };
        if index == self.next {
            self.next += 1;
        }
        self.children[index].take().map(|(_, node)| node)
    }

    fn peek_name(&self) -> Option<&str> {
        self.children
            .get(self.next..)?
            .iter()
            .find_map(|slot| slot.as_ref().map(|(name, _)| name.as_str()))
    }

    fn remaining(&self) -> usize {
        self.children[self.next.min(self.children.len())..]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}

/// A [`Decoder`] over a parsed [`Node`] tree.
///
/// A named read takes the child with that name wherever it is. An unnamed
/// read, or a named read inside an array, takes the next unread child.
pub struct TreeDecoder {
    stack: Vec<ReadFrame>,
    next_name: Option<String>,
}

impl TreeDecoder {
    /// Starts reading at the children of `root`.
    pub fn new(root: Node) -> Result<Self> {
        let frame = match root {
            Node::Object(children) => ReadFrame::new(children, false),
            Node::Array(children) => ReadFrame::new(children, true),
            Node::Leaf(leaf) => return Err(Error::mismatch("a root node", leaf.describe())),
        };
        Ok(Self {
            stack: alloc::vec![frame],
            next_name: None,
        })
    }

    fn take(&mut self) -> Result<Node> {
        let name = self.next_name.take();
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::malformed("node closed more often than opened"))?;
        match name {
            Some(name) => match frame.take_named(&name) {
                Some(node) => Ok(node),
                None if frame.positional => frame.take_next().ok_or(Error::EndOfNode),
                None => Err(Error::MissingNode(name)),
            },
            None => frame.take_next().ok_or(Error::EndOfNode),
        }
    }
}

impl Decoder for TreeDecoder {
    #[inline]
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Text
    }

    fn set_next_name(&mut self, name: Option<&str>) {
        self.next_name = name.map(String::from);
    }

    fn next_name(&self) -> Option<&str> {
        self.stack.last()?.peek_name()
    }

    fn start_node(&mut self) -> Result<()> {
        let frame = match self.take()? {
            Node::Object(children) => ReadFrame::new(children, false),
            Node::Array(children) => ReadFrame::new(children, true),
            // Formats without typed nodes write empty composites as empty leaves.
            Node::Leaf(Leaf::Null) => ReadFrame::new(Vec::new(), false),
            Node::Leaf(Leaf::Str(s)) if s.trim().is_empty() => ReadFrame::new(Vec::new(), false),
            Node::Leaf(leaf) => return Err(Error::mismatch("a node", leaf.describe())),
        };
        self.stack.push(frame);
        Ok(())
    }

    fn finish_node(&mut self) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(Error::malformed("node closed more often than opened"));
        }
        self.stack.pop();
        Ok(())
    }

    fn load_size(&mut self) -> Result<usize> {
        self.stack
            .last()
            .map(ReadFrame::remaining)
            .ok_or_else(|| Error::malformed("no open node"))
    }

    fn load_scalar(&mut self, kind: ScalarKind) -> Result<Scalar<'static>> {
        match self.take()? {
            Node::Leaf(leaf) => leaf.into_scalar(kind),
            Node::Object(_) | Node::Array(_) => Err(Error::mismatch(kind.name(), "a node")),
        }
    }

    fn load_bytes(&mut self) -> Result<Vec<u8>> {
        let text = match self.take()? {
            Node::Leaf(Leaf::Str(text)) => text,
            Node::Leaf(Leaf::Null) => String::new(),
            Node::Leaf(other) => return Err(Error::mismatch("binary data", other.describe())),
            _ => return Err(Error::mismatch("binary data", "a node")),
        };
        blob::decode(&text)
    }
}

// -----------------------------------------------------------------------------
// Tests
