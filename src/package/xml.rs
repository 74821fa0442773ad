use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub const WPS_NS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingShape";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::PackageAssembly(format!("xml: {e}"))
}

pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Comments, CDATA and processing instructions, passed through untouched.
    Other(Event<'static>),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, l)| l)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let node = self.children.get_mut(*first)?;
        if rest.is_empty() {
            return Some(node);
        }
        node.as_element_mut()?.node_at_mut(rest)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        if path.is_empty() {
            return Some(self);
        }
        self.node_at_mut(path)?.as_element_mut()
    }

    pub fn declared_namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().filter_map(|(k, v)| {
            if k == "xmlns" {
                Some(("", v.as_str()))
            } else {
                k.strip_prefix("xmlns:").map(|p| (p, v.as_str()))
            }
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Namespaces {
    bindings: HashMap<String, String>,
}

impl Namespaces {
    pub fn of(el: &Element) -> Self {
        let mut ns = Namespaces::default();
        ns.declare_from(el);
        ns
    }

    pub fn declare_from(&mut self, el: &Element) {
        for (prefix, uri) in el.declared_namespaces() {
            self.declare(prefix, uri);
        }
    }

    pub fn declare(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Scope for the children of `el`; clones only when `el` declares something.
    pub fn enter<'a>(&'a self, el: &Element) -> Cow<'a, Namespaces> {
        if el.declared_namespaces().next().is_none() {
            Cow::Borrowed(self)
        } else {
            let mut inner = self.clone();
            inner.declare_from(el);
            Cow::Owned(inner)
        }
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn element_ns(&self, el: &Element) -> Option<&str> {
        self.uri(el.prefix().unwrap_or(""))
    }

    pub fn is(&self, el: &Element, ns: &str, local: &str) -> bool {
        el.local_name() == local && self.element_ns(el) == Some(ns)
    }

    /// Namespace of a qualified attribute name; unprefixed attributes have none.
    pub fn attr_ns(&self, key: &str) -> Option<&str> {
        let (prefix, _) = key.split_once(':')?;
        if prefix == "xmlns" {
            return None;
        }
        self.uri(prefix)
    }

    pub fn prefix_for(&self, ns: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, uri)| uri.as_str() == ns && !p.is_empty())
            .map(|(p, _)| p.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct XmlTree {
    prolog: Vec<Event<'static>>,
    pub root: Element,
}

fn start_to_element(start: &BytesStart) -> Result<Element> {
    let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(xml_err)?;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8(attr.key.as_ref().to_vec()).map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

impl XmlTree {
    pub fn new(root: Element) -> Self {
        XmlTree {
            prolog: Vec::new(),
            root,
        }
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(xml_err)?;
            match event {
                Event::Start(ref e) => stack.push(start_to_element(e)?),
                Event::Empty(ref e) => {
                    let el = start_to_element(e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(xml_err("multiple root elements")),
                    }
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| xml_err("unbalanced end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(xml_err("multiple root elements")),
                    }
                }
                Event::Text(ref t) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t.unescape().map_err(xml_err)?.into_owned();
                        parent.children.push(Node::Text(text));
                    }
                }
                Event::Eof => break,
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Other(other.into_owned())),
                    None if root.is_none() => prolog.push(other.into_owned()),
                    None => {}
                },
            }
        }

        if !stack.is_empty() {
            return Err(xml_err(format!("unclosed element <{}>", stack[0].name)));
        }
        let root = root.ok_or_else(|| xml_err("document has no root element"))?;
        Ok(XmlTree { prolog, root })
    }

    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data).map_err(xml_err)?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if self.prolog.is_empty() {
            writer
                .get_mut()
                .extend_from_slice(b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        }
        for event in &self.prolog {
            writer.write_event(event.borrow()).map_err(xml_err)?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attrs {
        let escaped = escape(value);
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Borrowed(escaped.as_bytes()),
        });
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    for child in &el.children {
        match child {
            Node::Element(inner) => write_element(writer, inner)?,
            Node::Text(text) => {
                let escaped = escape(text);
                writer
                    .write_event(Event::Text(BytesText::from_escaped(escaped.as_ref())))
                    .map_err(xml_err)?;
            }
            Node::Other(event) => writer.write_event(event.borrow()).map_err(xml_err)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_err)?;
    Ok(())
}
