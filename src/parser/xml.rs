//! Owned markup tree on top of `quick-xml`.
//!
//! This module provides [XmlElement], a small owned element tree that can be
//! read from and written back to XML text. Element and attribute names are
//! kept as written (including prefixes such as `po:accession`), so files
//! using undeclared namespace prefixes still load. Used as the foundation
//! for candidate validation, repair and the RSML parser and writer.

use crate::parser::parsing_error::ParsingError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Indentation width of written XML.
const INDENT_WIDTH: usize = 4;


// =#========================================================================#=
// XML ELEMENT
// =#========================================================================#=
/// Child of an [XmlElement]: either a nested element or a text run.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its attributes (in document order) and children.
///
/// Whitespace-only text is dropped on reading, so an element holding only
/// nested elements has no text children.
///
/// # Example
/// ```
/// use rsmltrack::parser::xml::{parse_str, XmlElement};
///
/// let element = parse_str("<point x='1.5' y='2'/>").unwrap();
/// assert_eq!(element.name(), "point");
/// assert_eq!(element.attribute("x"), Some("1.5"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl XmlElement {
    /// Creates an element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds (or replaces) an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Appends a text child.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Returns the value of attribute `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Sets attribute `key` to `value`, replacing an existing value in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<XmlNode> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Returns the child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Returns the first child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// Returns all child elements called `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.name == name)
    }

    /// Returns the trimmed concatenation of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let XmlNode::Text(run) = node {
                text.push_str(run);
            }
        }
        text.trim().to_string()
    }

    /// Returns the trimmed text of child `name`, if that child exists.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(XmlElement::text)
    }

    /// Returns an iterator over all elements below this one in document
    /// order (pre-order), excluding this element.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::new(self)
    }

    /// Returns all elements below this one called `name`, in document order.
    pub fn descendants_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.descendants().filter(move |element| element.name == name)
    }

    /// Returns the number of elements called `name` in this subtree,
    /// this element included.
    pub fn count_named(&self, name: &str) -> usize {
        usize::from(self.name == name) + self.descendants_named(name).count()
    }
}


// =#========================================================================#=
// ITERATOR
// =#========================================================================#=
/// Pre-order iterator over the descendants of an [XmlElement].
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Descendants<'a> {
    fn new(element: &'a XmlElement) -> Self {
        let mut stack: Vec<&'a XmlElement> = element.elements().collect();
        stack.reverse();
        Descendants { stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        let first_child_on_top = self.stack.len();
        self.stack.extend(element.elements());
        self.stack[first_child_on_top..].reverse();
        Some(element)
    }
}


// =#========================================================================#=
// READING
// =#========================================================================#=
/// Parses XML text into its document element.
///
/// Declarations, comments, processing instructions and whitespace-only text
/// are dropped.
///
/// # Errors
/// Returns a [ParsingError] of kind `MalformedXml` on syntax errors,
/// mismatched or unclosed tags, several top-level elements or an empty document.
pub fn parse_str(text: &str) -> Result<XmlElement, ParsingError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut document: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|error| {
            ParsingError::malformed_xml(format!("{error} at byte {}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut document, element)?;
            }
            Event::End(_) => {
                let element = stack.pop()
                    .ok_or_else(|| ParsingError::malformed_xml("closing tag without opening tag"))?;
                attach(&mut stack, &mut document, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(ParsingError::malformed_xml(format!("unclosed element <{}>", unclosed.name)));
    }

    document.ok_or_else(|| ParsingError::malformed_xml("document has no root element"))
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, ParsingError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(ParsingError::malformed_xml)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(stack: &mut [XmlElement], document: &mut Option<XmlElement>, element: XmlElement) -> Result<(), ParsingError> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None if document.is_none() => *document = Some(element),
        None => return Err(ParsingError::malformed_xml("more than one top-level element")),
    }
    Ok(())
}


// =#========================================================================#=
// WRITING
// =#========================================================================#=
/// Writes `document` as indented XML text with an XML declaration.
pub fn to_xml_string(document: &XmlElement) -> Result<String, ParsingError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, document)?;

    let mut text = String::from_utf8(writer.into_inner()).map_err(ParsingError::malformed_xml)?;
    text.push('\n');
    Ok(text)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), ParsingError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(nested) => write_element(writer, nested)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;

    Ok(())
}
