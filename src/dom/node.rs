//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node always lives at index 0
pub const ROOT: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
///
/// For elements `value` is the character data (text and CDATA, joined). For
/// comments it is the comment body, for processing instructions the data
/// following the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for document root and detached nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Tag name (elements) or target (PIs); empty otherwise
    pub name: String,
    /// Text value
    pub value: String,
    /// Attributes in document order (elements only)
    pub attributes: Vec<XmlAttribute>,
    /// Depth in document tree
    pub depth: u16,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, name: String, value: String, parent: Option<NodeId>, depth: u16) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name,
            value,
            attributes: Vec::new(),
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, String::new(), String::new(), None, 0)
    }

    /// Create a new element node
    pub fn element(name: impl Into<String>, parent: Option<NodeId>, depth: u16) -> Self {
        Self::with_kind(NodeKind::Element, name.into(), String::new(), parent, depth)
    }

    /// Create a new comment node
    pub fn comment(text: impl Into<String>, parent: Option<NodeId>, depth: u16) -> Self {
        Self::with_kind(NodeKind::Comment, String::new(), text.into(), parent, depth)
    }

    /// Create a processing instruction node
    pub fn processing_instruction(
        target: impl Into<String>,
        data: impl Into<String>,
        parent: Option<NodeId>,
        depth: u16,
    ) -> Self {
        Self::with_kind(NodeKind::ProcessingInstruction, target.into(), data.into(), parent, depth)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Document and element nodes may have children
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Document | NodeKind::Element)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Get attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Insert or replace an attribute, keeping the position of an existing one
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute::new(name, value)),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }
}

/// Stored attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        XmlAttribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert_eq!(doc.depth, 0);
        assert!(doc.is_container());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element("item", Some(0), 1);
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name, "item");
        assert_eq!(elem.depth, 1);
    }

    #[test]
    fn test_attribute_replace_keeps_order() {
        let mut elem = XmlNode::element("item", Some(0), 1);
        elem.set_attribute("a", "1");
        elem.set_attribute("b", "2");
        elem.set_attribute("a", "3");
        assert_eq!(elem.attributes, vec![XmlAttribute::new("a", "3"), XmlAttribute::new("b", "2")]);
        assert_eq!(elem.remove_attribute("a"), Some("3".to_string()));
        assert_eq!(elem.attribute("a"), None);
        assert_eq!(elem.attribute("b"), Some("2"));
    }
}
