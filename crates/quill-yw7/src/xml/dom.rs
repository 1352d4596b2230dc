//! A small owned XML tree for the yw7 document.
//!
//! The yw7 schema is looked up by child name far more often than it is
//! traversed, so the reader builds a plain element tree and the writer
//! assembles one before serializing. Source locations are not tracked; the
//! legacy format carries none worth reporting.

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::escape::escape;

use crate::error::{Error, Result};

/// An XML element: name, attributes in document order, accumulated direct
/// text (including CDATA), and child elements.
#[derive(Clone, Debug, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A leaf element carrying `text`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.text = Some(text.into());
        element
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// The accumulated direct text, `None` when the element held none.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append a leaf child and return `self` for chaining.
    pub fn push_leaf(&mut self, name: &str, text: impl Into<String>) -> &mut Self {
        self.children.push(Element::with_text(name, text));
        self
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Text of the first child with the given name, if that child holds any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(Element::text)
    }

    /// Parse a document into its root element.
    pub fn parse(source: &str) -> Result<Element> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(Error::parse)? {
                Event::Start(e) => {
                    let mut element =
                        Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    for attr in e.attributes() {
                        let attr = attr.map_err(Error::parse)?;
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr.unescape_value().map_err(Error::parse)?.into_owned();
                        element.attrs.push((key, value));
                    }
                    stack.push(element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| Error::parse("unexpected end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => {
                            if root.is_some() {
                                return Err(Error::parse("multiple root elements"));
                            }
                            root = Some(element);
                        }
                    }
                }
                Event::Empty(e) => {
                    let mut element =
                        Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    for attr in e.attributes() {
                        let attr = attr.map_err(Error::parse)?;
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr.unescape_value().map_err(Error::parse)?.into_owned();
                        element.attrs.push((key, value));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => {
                            if root.is_some() {
                                return Err(Error::parse("multiple root elements"));
                            }
                            root = Some(element);
                        }
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(Error::parse)?;
                    if let Some(node) = stack.last_mut() {
                        node.append_text(&text);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if let Some(node) = stack.last_mut() {
                        node.append_text(&text);
                    }
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(node) = stack.last() {
            return Err(Error::parse(format!("missing end tag </{}>", node.name)));
        }
        root.ok_or_else(|| Error::parse("no root element"))
    }

    fn append_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Serialize with two-space indentation and no XML declaration.
    ///
    /// Leaf text stays on the element's own line; elements without content
    /// use the legacy tool's `<Tag />` spelling.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, level: usize) {
        for _ in 0..level {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            match self.text.as_deref() {
                Some(text) if !text.is_empty() => {
                    out.push('>');
                    out.push_str(&escape(text));
                    out.push_str("</");
                    out.push_str(&self.name);
                    out.push_str(">\n");
                }
                _ => out.push_str(" />\n"),
            }
        } else {
            out.push_str(">\n");
            for child in &self.children {
                child.write_into(out, level + 1);
            }
            for _ in 0..level {
                out.push_str("  ");
            }
            out.push_str("</");
            out.push_str(&self.name);
            out.push_str(">\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_finds_children_and_text() {
        let root = Element::parse(
            "<?xml version=\"1.0\"?><ROOT><A>alpha</A><B/><A>beta</A></ROOT>",
        )
        .unwrap();
        assert_eq!(root.name, "ROOT");
        assert_eq!(root.child_text("A"), Some("alpha"));
        assert!(root.has_child("B"));
        assert_eq!(root.find_all("A").count(), 2);
        assert_eq!(root.child_text("B"), None);
    }

    #[test]
    fn parse_joins_cdata_and_text() {
        let root = Element::parse("<T><![CDATA[a & b]]></T>").unwrap();
        assert_eq!(root.text(), Some("a & b"));
        let root = Element::parse("<T>x &amp; y</T>").unwrap();
        assert_eq!(root.text(), Some("x & y"));
    }

    #[test]
    fn serialize_escapes_and_indents() {
        let mut root = Element::new("ROOT");
        root.push_leaf("Title", "a < b");
        root.push(Element::new("EMPTY"));
        let xml = root.serialize();
        assert_eq!(
            xml,
            "<ROOT>\n  <Title>a &lt; b</Title>\n  <EMPTY />\n</ROOT>\n"
        );
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let mut root = Element::new("ROOT");
        root.push_leaf("Desc", "quotes \" and 'apostrophes' & more");
        let parsed = Element::parse(&root.serialize()).unwrap();
        assert_eq!(
            parsed.child_text("Desc"),
            Some("quotes \" and 'apostrophes' & more")
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<A><B></A>").is_err());
    }
}
