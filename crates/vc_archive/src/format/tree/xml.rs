//! XML over [`Node`] trees, through `quick-xml`.
//!
//! Every child becomes an element named after it. Arrays carry the attribute
//! `size="dynamic"`. Leaves are stored as text and parsed when read, so an
//! XML document does not record scalar types.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::io::{BufReader, Read, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{Leaf, Node, TreeDecoder, TreeEncoder, TreeSink};
use crate::error::{Error, Result};

const SIZE_ATTR: &str = "size";
const DYNAMIC: &str = "dynamic";

// -----------------------------------------------------------------------------
// Options

/// Output options of XML archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Spaces per level, or `None` for a single line.
    pub indent: Option<usize>,
    /// Tag of the root element.
    pub root: Cow<'static, str>,
    /// Whether to start with `<?xml version="1.0" encoding="utf-8"?>`.
    pub declaration: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            indent: Some(4),
            root: Cow::Borrowed("archive"),
            declaration: true,
        }
    }
}

impl XmlOptions {
    pub fn indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent;
        self
    }

    pub fn root(mut self, root: impl Into<Cow<'static, str>>) -> Self {
        self.root = root.into();
        self
    }

    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

// -----------------------------------------------------------------------------
// Writing

/// Writes the finished tree as one XML document.
pub struct XmlSink<W: Write> {
    writer: Option<W>,
    options: XmlOptions,
}

impl<W: Write> XmlSink<W> {
    pub fn new(writer: W, options: XmlOptions) -> Self {
        Self {
            writer: Some(writer),
            options,
        }
    }
}

fn write_node<W: Write>(xml: &mut Writer<W>, name: &str, node: &Node) -> Result<()> {
    let start = BytesStart::new(name);
    match node {
        Node::Leaf(leaf) => {
            let text = leaf.to_text();
            if text.is_empty() {
                xml.write_event(Event::Empty(start)).map_err(Error::xml)?;
            } else {
                xml.write_event(Event::Start(start)).map_err(Error::xml)?;
                xml.write_event(Event::Text(BytesText::new(&text)))
                    .map_err(Error::xml)?;
                xml.write_event(Event::End(BytesEnd::new(name)))
                    .map_err(Error::xml)?;
            }
        }
        Node::Object(children) | Node::Array(children) => {
            let mut start = start;
            if matches!(node, Node::Array(_)) {
                start.push_attribute((SIZE_ATTR, DYNAMIC));
            }
            if children.is_empty() {
                xml.write_event(Event::Empty(start)).map_err(Error::xml)?;
            } else {
                xml.write_event(Event::Start(start)).map_err(Error::xml)?;
                for (child_name, child) in children {
                    write_node(xml, child_name, child)?;
                }
                xml.write_event(Event::End(BytesEnd::new(name)))
                    .map_err(Error::xml)?;
            }
        }
    }
    Ok(())
}

impl<W: Write> TreeSink for XmlSink<W> {
    fn write_tree(&mut self, root: &Node) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::xml("the document was already written"))?;
        let mut xml = match self.options.indent {
            Some(indent) => Writer::new_with_indent(writer, b' ', indent),
            None => Writer::new(writer),
        };
        if self.options.declaration {
            xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(Error::xml)?;
        }
        write_node(&mut xml, &self.options.root, root)?;
        let mut writer = xml.into_inner();
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

pub type XmlEncoder<W> = TreeEncoder<XmlSink<W>>;

// -----------------------------------------------------------------------------
// Reading

struct OpenElement {
    name: String,
    dynamic: bool,
    children: Vec<(String, Node)>,
    text: String,
}

impl OpenElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = core::str::from_utf8(start.name().as_ref())
            .map_err(Error::xml)?
            .to_string();
        let dynamic = start
            .try_get_attribute(SIZE_ATTR)
            .map_err(Error::xml)?
            .is_some_and(|attr| attr.value.as_ref() == DYNAMIC.as_bytes());
        Ok(Self {
            name,
            dynamic,
            children: Vec::new(),
            text: String::new(),
        })
    }

    // Text between child elements is indentation and is dropped.
    fn into_node(self) -> (String, Node) {
        let node = if self.dynamic {
            Node::Array(self.children)
        } else if !self.children.is_empty() {
            Node::Object(self.children)
        } else {
            Node::Leaf(Leaf::Str(self.text))
        };
        (self.name, node)
    }
}

fn close(stack: &mut Vec<OpenElement>, root: &mut Option<Node>, element: OpenElement) -> Result<()> {
    let (name, node) = element.into_node();
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, node)),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::xml("more than one root element")),
    }
    Ok(())
}

fn push_text(stack: &mut [OpenElement], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}

/// Parses a whole XML document into a [`TreeDecoder`] positioned at the
/// children of the root element.
pub fn read_xml<R: Read>(source: R) -> Result<TreeDecoder> {
    let mut reader = Reader::from_reader(BufReader::new(source));
    let mut buf = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(Error::xml)? {
            Event::Start(start) => stack.push(OpenElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = OpenElement::from_start(&start)?;
                close(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml("closing tag without an opening tag"))?;
                close(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let raw = text.decode().map_err(Error::xml)?;
                let text = quick_xml::escape::unescape(&raw).map_err(Error::xml)?;
                push_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let text = core::str::from_utf8(&data).map_err(Error::xml)?;
                push_text(&mut stack, text);
            }
            Event::GeneralRef(reference) => {
                let resolved = match reference.resolve_char_ref().map_err(Error::xml)? {
                    Some(ch) => ch.to_string(),
                    None => {
                        let entity = reference.decode().map_err(Error::xml)?;
                        quick_xml::escape::resolve_predefined_entity(&entity)
                            .ok_or_else(|| Error::xml(format_args!("unknown entity `&{entity};`")))?
                            .to_string()
                    }
                };
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::xml("document ended inside an element"));
    }
    match root {
        // An empty root element holds an empty archive.
        Some(Node::Leaf(_)) => TreeDecoder::new(Node::Object(Vec::new())),
        Some(node) => TreeDecoder::new(node),
        None => Err(Error::xml("document has no root element")),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Decoder, Encoder, NodeKind, Scalar, ScalarKind};

    fn write(options: XmlOptions, build: impl FnOnce(&mut XmlEncoder<&mut Vec<u8>>)) -> String {
        let mut bytes = Vec::new();
        let mut encoder = XmlEncoder::new(XmlSink::new(&mut bytes, options));
        build(&mut encoder);
        encoder.finish().unwrap();
        drop(encoder);
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn arrays_are_tagged_dynamic() {
        let text = write(XmlOptions::default().indent(None).declaration(false), |e| {
            e.set_next_name(Some("list"));
            e.start_node(NodeKind::Array).unwrap();
            e.save_scalar(Scalar::U8(1)).unwrap();
            e.finish_node().unwrap();
        });
        assert_eq!(
            text.trim(),
            r#"<archive><list size="dynamic"><value0>1</value0></list></archive>"#
        );
    }

    #[test]
    fn markup_in_text_round_trips() {
        let text = write(XmlOptions::default(), |e| {
            e.set_next_name(Some("s"));
            e.save_scalar(Scalar::Str("a < b & \"c\"".into())).unwrap();
            e.set_next_name(Some("empty"));
            e.save_scalar(Scalar::Str("".into())).unwrap();
        });

        let mut decoder = read_xml(text.as_bytes()).unwrap();
        decoder.set_next_name(Some("empty"));
        assert_eq!(
            decoder.load_scalar(ScalarKind::Str).unwrap(),
            Scalar::Str("".into())
        );
        decoder.set_next_name(Some("s"));
        assert_eq!(
            decoder.load_scalar(ScalarKind::Str).unwrap(),
            Scalar::Str("a < b & \"c\"".into())
        );
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(read_xml("<archive><a>1</a>".as_bytes()).is_err());
    }
}
