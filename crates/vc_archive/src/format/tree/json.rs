//! JSON over [`Node`] trees, through `serde_json`.
//!
//! Objects keep their child order and may repeat a key, so a tree read back
//! from JSON is exactly the tree that was written.

use alloc::string::String;
use alloc::vec::Vec;
use std::io::{Read, Write};

use serde_core::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_core::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::ser::PrettyFormatter;

use super::{Leaf, Node, TreeDecoder, TreeEncoder, TreeSink, float_text};
use crate::error::Result;

// -----------------------------------------------------------------------------
// Options

/// Output options of JSON archives.
///
/// ```
/// use vc_archive::format::tree::json::JsonOptions;
///
/// let compact = JsonOptions::default().pretty(false);
/// assert!(!compact.pretty);
/// assert_eq!(JsonOptions::default().indent, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    pub pretty: bool,
    /// Spaces per level when `pretty` is set.
    pub indent: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 4,
        }
    }
}

impl JsonOptions {
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

// -----------------------------------------------------------------------------
// Sink / Source

/// Writes the finished tree as one JSON object.
pub struct JsonSink<W: Write> {
    writer: W,
    options: JsonOptions,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, options: JsonOptions) -> Self {
        Self { writer, options }
    }
}

impl<W: Write> TreeSink for JsonSink<W> {
    fn write_tree(&mut self, root: &Node) -> Result<()> {
        if self.options.pretty {
            let indent = " ".repeat(self.options.indent);
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut self.writer, formatter);
            root.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut self.writer, root)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub type JsonEncoder<W> = TreeEncoder<JsonSink<W>>;

/// Parses a whole JSON document into a [`TreeDecoder`].
pub fn read_json<R: Read>(reader: R) -> Result<TreeDecoder> {
    let root: Node = serde_json::from_reader(reader)?;
    TreeDecoder::new(root)
}

// -----------------------------------------------------------------------------
// Serialize

impl Serialize for Leaf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Float(v) => serializer.serialize_str(&float_text(*v)),
            Self::Str(v) => serializer.serialize_str(v),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(leaf) => leaf.serialize(serializer),
            Self::Object(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (name, child) in children {
                    map.serialize_entry(name, child)?;
                }
                map.end()
            }
            Self::Array(children) => {
                let mut seq = serializer.serialize_seq(Some(children.len()))?;
                for (_, child) in children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Deserialize

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Null))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Int(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::UInt(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Str(String::from(v))))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Leaf(Leaf::Str(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut children = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(256));
        while let Some(child) = seq.next_element::<Node>()? {
            children.push((String::new(), child));
        }
        Ok(Node::Array(children))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut children = Vec::new();
        while let Some((name, child)) = map.next_entry::<String, Node>()? {
            children.push((name, child));
        }
        Ok(Node::Object(children))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Encoder, Scalar};

    #[test]
    fn non_finite_floats_survive() {
        let mut bytes = Vec::new();
        let mut encoder = JsonEncoder::new(JsonSink::new(&mut bytes, JsonOptions::default()));
        encoder.set_next_name(Some("nan"));
        encoder.save_scalar(Scalar::F64(f64::NAN)).unwrap();
        encoder.set_next_name(Some("neg"));
        encoder.save_scalar(Scalar::F32(f32::NEG_INFINITY)).unwrap();
        encoder.finish().unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#""nan": "NaN""#), "{text}");
        assert!(text.contains(r#""neg": "-inf""#), "{text}");
    }

    #[test]
    fn duplicate_keys_are_kept_in_order() {
        let node: Node = serde_json::from_str(r#"{"a": 1, "b": [true, null], "a": "x"}"#).unwrap();
        assert_eq!(
            node,
            Node::Object(alloc::vec![
                (String::from("a"), Node::Leaf(Leaf::UInt(1))),
                (
                    String::from("b"),
                    Node::Array(alloc::vec![
                        (String::new(), Node::Leaf(Leaf::Bool(true))),
                        (String::new(), Node::Leaf(Leaf::Null)),
                    ])
                ),
                (String::from("a"), Node::Leaf(Leaf::Str(String::from("x")))),
            ])
        );
    }
}
