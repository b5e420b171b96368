//! Owned, mutable XML trees for package parts.
//!
//! Parts are parsed with `roxmltree` into an [`XmlElement`] tree that callers
//! mutate in place and serialize back with `quick-xml`. Element and attribute
//! names are namespace-expanded [`QName`]s; nothing here depends on the
//! prefixes the source document happened to use. Serialization re-derives a
//! prefix table: the root element's namespace becomes the default `xmlns`,
//! the officeDocument relationships namespace keeps its conventional `r`
//! prefix, and any other namespace gets a generated one.

use std::fmt;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::XlsxError;

/// SpreadsheetML main namespace.
pub const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
/// Namespace of `r:id` style attributes.
pub const NS_DOC_RELS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// The `xml:` namespace. Every document declares it implicitly, so it is
/// never written out as an `xmlns:` declaration.
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace-expanded element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName {
    pub ns: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(local: &str) -> Self {
        Self {
            ns: None,
            local: local.to_string(),
        }
    }

    pub fn in_ns(ns: &str, local: &str) -> Self {
        Self {
            ns: Some(ns.to_string()),
            local: local.to_string(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttr {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: QName,
    pub attrs: Vec<XmlAttr>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn in_ns(ns: &str, local: &str) -> Self {
        Self::new(QName::in_ns(ns, local))
    }

    /// Parses one part's bytes into its root element.
    ///
    /// Insignificant whitespace between elements is dropped; text under an
    /// `xml:space="preserve"` scope is kept verbatim. Comments and processing
    /// instructions are not modeled.
    pub fn parse(bytes: &[u8]) -> Result<XmlElement, XlsxError> {
        let text = std::str::from_utf8(bytes)?;
        let doc = roxmltree::Document::parse(text)?;
        Ok(convert(doc.root_element(), false))
    }

    /// The namespace child lookups should use for this tree: the root
    /// element's own namespace, or the canonical SpreadsheetML namespace when
    /// the document declares none.
    pub fn main_namespace(&self) -> &str {
        self.name.ns.as_deref().unwrap_or(NS_MAIN)
    }

    pub fn is_named(&self, ns: &str, local: &str) -> bool {
        self.name.local == local && self.name.ns.as_deref() == Some(ns)
    }

    /// First unprefixed attribute with this local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.ns.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// First attribute with this namespace and local name (`r:id` lookups).
    pub fn attr_in(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.ns.as_deref() == Some(ns) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Sets an unprefixed attribute, replacing an existing one in place.
    pub fn set_attr(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        for attr in &mut self.attrs {
            if attr.name.ns.is_none() && attr.name.local == local {
                attr.value = value;
                return;
            }
        }
        self.attrs.push(XmlAttr {
            name: QName::local(local),
            value,
        });
    }

    pub fn set_attr_in(&mut self, ns: &str, local: &str, value: impl Into<String>) {
        let value = value.into();
        for attr in &mut self.attrs {
            if attr.name.ns.as_deref() == Some(ns) && attr.name.local == local {
                attr.value = value;
                return;
            }
        }
        self.attrs.push(XmlAttr {
            name: QName::in_ns(ns, local),
            value,
        });
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct child elements matching a namespace and local name.
    pub fn children_in<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.is_named(ns, local))
    }

    pub fn child(&self, ns: &str, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is_named(ns, local))
    }

    pub fn child_mut(&mut self, ns: &str, local: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(el) if el.is_named(ns, local) => Some(el),
            _ => None,
        })
    }

    /// Depth-first search for the first matching element at any depth.
    pub fn descendant(&self, ns: &str, local: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.is_named(ns, local) {
                return Some(el);
            }
            if let Some(found) = el.descendant(ns, local) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendant_mut(&mut self, ns: &str, local: &str) -> Option<&mut XmlElement> {
        for node in &mut self.children {
            if let XmlNode::Element(el) = node {
                if el.is_named(ns, local) {
                    return Some(el);
                }
                if let Some(found) = el.descendant_mut(ns, local) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Concatenated text of direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Serializes the tree as a standalone XML document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let prefixes = PrefixTable::build(self);
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write_element(&mut writer, self, &prefixes, true)?;
        Ok(writer.into_inner())
    }
}

/// Namespace prefix assignments for one serialization pass.
struct PrefixTable {
    default_ns: Option<String>,
    prefixed: Vec<(String, String)>,
}

impl PrefixTable {
    fn build(root: &XmlElement) -> Self {
        let mut table = Self {
            default_ns: root.name.ns.clone(),
            prefixed: Vec::new(),
        };
        table.scan(root);
        table
    }

    fn scan(&mut self, element: &XmlElement) {
        if let Some(ns) = &element.name.ns {
            if self.default_ns.as_deref() != Some(ns.as_str()) {
                self.ensure_prefix(ns);
            }
        }
        for attr in &element.attrs {
            // Attributes never pick up the default namespace, so any
            // namespaced attribute needs an explicit prefix.
            if let Some(ns) = &attr.name.ns {
                self.ensure_prefix(ns);
            }
        }
        for el in element.elements() {
            self.scan(el);
        }
    }

    fn ensure_prefix(&mut self, ns: &str) {
        if ns == NS_XML || self.prefixed.iter().any(|(uri, _)| uri == ns) {
            return;
        }
        let prefix = if ns == NS_DOC_RELS {
            "r".to_string()
        } else {
            format!("ns{}", self.prefixed.len() + 1)
        };
        self.prefixed.push((ns.to_string(), prefix));
    }

    fn prefix_for(&self, ns: &str) -> Option<&str> {
        if ns == NS_XML {
            return Some("xml");
        }
        self.prefixed
            .iter()
            .find(|(uri, _)| uri == ns)
            .map(|(_, prefix)| prefix.as_str())
    }

    fn element_tag(&self, name: &QName) -> String {
        match &name.ns {
            Some(ns) if self.default_ns.as_deref() != Some(ns.as_str()) => {
                match self.prefix_for(ns) {
                    Some(prefix) => format!("{prefix}:{}", name.local),
                    None => name.local.clone(),
                }
            }
            _ => name.local.clone(),
        }
    }

    fn attr_key(&self, name: &QName) -> String {
        match &name.ns {
            Some(ns) => match self.prefix_for(ns) {
                Some(prefix) => format!("{prefix}:{}", name.local),
                None => name.local.clone(),
            },
            None => name.local.clone(),
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &XmlElement,
    prefixes: &PrefixTable,
    is_root: bool,
) -> Result<(), XlsxError> {
    let tag = prefixes.element_tag(&element.name);
    let mut start = BytesStart::new(tag.as_str());
    if is_root {
        if let Some(ns) = &prefixes.default_ns {
            start.push_attribute(("xmlns", ns.as_str()));
        }
        for (ns, prefix) in &prefixes.prefixed {
            start.push_attribute((format!("xmlns:{prefix}").as_str(), ns.as_str()));
        }
    }
    for attr in &element.attrs {
        start.push_attribute((prefixes.attr_key(&attr.name).as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for node in &element.children {
        match node {
            XmlNode::Element(el) => write_element(writer, el, prefixes, false)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    Ok(())
}

fn convert(node: roxmltree::Node<'_, '_>, preserve_space: bool) -> XmlElement {
    let name = QName {
        ns: node.tag_name().namespace().map(str::to_string),
        local: node.tag_name().name().to_string(),
    };
    let mut preserve = preserve_space;
    let mut attrs = Vec::new();
    for attr in node.attributes() {
        let ns = attr.namespace().map(str::to_string);
        if ns.as_deref() == Some(NS_XML) && attr.name() == "space" {
            preserve = attr.value() == "preserve";
        }
        attrs.push(XmlAttr {
            name: QName {
                ns,
                local: attr.name().to_string(),
            },
            value: attr.value().to_string(),
        });
    }

    let mut children = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(XmlNode::Element(convert(child, preserve)));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            if preserve || !text.trim().is_empty() {
                children.push(XmlNode::Text(text.to_string()));
            }
        }
    }

    XmlElement {
        name,
        attrs,
        children,
    }
}
