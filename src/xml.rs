//! Minimal element tree over `quick-xml` events.
//!
//! Both annotation formats are small and read whole, so the readers work on
//! an owned tree instead of the event stream. Element names are stored by
//! local name (namespace prefixes dropped); attribute keys keep their
//! prefix, and [`XmlElement::attr_local`] matches on the local part.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};

/// One element with its attributes, child elements and direct text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local element name.
    pub name: String,
    /// Attributes in document order, keys as written.
    pub attrs: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated, unescaped text content (direct children only).
    pub text: String,
}

impl XmlElement {
    /// Attribute by exact key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute by local name, ignoring any namespace prefix.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_part(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// True if the element has no child elements.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn local_part(key: &str) -> &str {
    key.rsplit_once(':').map_or(key, |(_, local)| local)
}

fn malformed(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> ConvertError {
    ConvertError::MalformedXml {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}

fn open_element(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(reader, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| malformed(reader, e))?;
        attrs.push((key, value.into_owned()));
    }
    Ok(XmlElement {
        name,
        attrs,
        ..Default::default()
    })
}

/// Parse a complete document and return its root element.
pub fn parse(input: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(start) => {
                let element = open_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start)?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(&reader, "unexpected closing tag"))?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(&reader, e))?;
                push_text(&reader, &mut stack, text)?;
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = String::from_utf8_lossy(&bytes).into_owned();
                push_text(&reader, &mut stack, Cow::Owned(text))?;
            }
            Event::Eof => break,
            // declarations, doctype, comments, processing instructions
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(&reader, format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| malformed(&reader, "document has no root element"))
}

fn attach(
    reader: &Reader<&[u8]>,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed(reader, "more than one root element")),
    }
    Ok(())
}

fn push_text(reader: &Reader<&[u8]>, stack: &mut [XmlElement], text: Cow<'_, str>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.text.push_str(&text),
        None if text.trim().is_empty() => {}
        None => return Err(malformed(reader, "text outside the root element")),
    }
    Ok(())
}

/// Escape element text: only `&`, `<` and `>` are replaced.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

/// Escape an attribute value, quotes included.
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}
