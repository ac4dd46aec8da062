//! XML Tree - Mutable arena-based DOM
//!
//! Nodes live in a single arena and link to each other by NodeId. The
//! document node is always at index 0; clearing the tree truncates the arena
//! back to it.

use super::node::{NodeId, XmlAttribute, XmlNode, ROOT};
use super::writer::{write_tree, WriteOptions};
use crate::core::attributes::{is_name_char, is_name_start_char};
use crate::core::tokenizer::ParseError;
use crate::reader::{SliceReader, StartElement, XmlEvent};

/// Deepest nesting level a node may have; the document node is level 0.
/// Bounded by the width of [`XmlNode::depth`].
pub const MAX_DEPTH: u16 = u16::MAX;

/// An owned, mutable XML tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<XmlNode>,
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTree {
    /// Create an empty tree holding only the document node
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        XmlTree { nodes }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// First element child of the document node
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(ROOT).find(|&id| self.nodes[id as usize].is_element())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut XmlNode> {
        self.nodes.get_mut(id as usize)
    }

    /// Number of nodes in the arena, document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document node has no children and no attributes
    pub fn is_empty(&self) -> bool {
        let doc = &self.nodes[ROOT as usize];
        !doc.has_children() && !doc.has_attributes()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| n.name.as_str())
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| n.value.as_str())
    }

    /// Replace a node's text value. Returns false for an unknown node.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        match self.get_node_mut(id) {
            Some(node) => {
                node.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        self.get_node(id).map(|n| n.attributes.as_slice()).unwrap_or(&[])
    }

    /// Get attribute value by name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get_node(id)?.attribute(name)
    }

    /// Insert or replace an attribute on an element. Returns false if `id`
    /// is not an element or `name` is not a valid XML name.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        if !is_valid_name(name) {
            return false;
        }
        match self.get_node_mut(id) {
            Some(node) if node.is_element() => {
                node.set_attribute(name, value);
                true
            }
            _ => false,
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.get_node_mut(id)?.remove_attribute(name)
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { tree: self, next: first }
    }

    /// Iterate over all descendants of a node in pre-order (node excluded)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        self.push_children_reversed(id, &mut stack);
        DescendantIter { tree: self, stack }
    }

    fn push_children_reversed(&self, id: NodeId, stack: &mut Vec<NodeId>) {
        let mut child_id = self.get_node(id).and_then(|n| n.last_child);
        while let Some(cid) = child_id {
            stack.push(cid);
            child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
        }
    }

    /// Every element at or below `id` named `name`, in pre-order
    pub fn find_elements(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        std::iter::once(id)
            .filter(|&id| self.get_node(id).is_some())
            .chain(self.descendants(id))
            .filter(|&nid| {
                let node = &self.nodes[nid as usize];
                node.is_element() && node.name == name
            })
            .collect()
    }

    /// Append a new element under a document or element node.
    ///
    /// Returns None if the parent cannot hold children, is already at
    /// [`MAX_DEPTH`], or `name` is not a valid XML name.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        if !is_valid_name(name) {
            return None;
        }
        let depth = self.child_depth(parent)?;
        Some(self.push_child(parent, XmlNode::element(name, Some(parent), depth)))
    }

    /// Append an element carrying a text value
    pub fn append_text_element(&mut self, parent: NodeId, name: &str, value: impl Into<String>) -> Option<NodeId> {
        let id = self.append_element(parent, name)?;
        self.nodes[id as usize].value = value.into();
        Some(id)
    }

    /// Append a comment. Returns None if the text contains `--` or ends with `-`.
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
        if text.contains("--") || text.ends_with('-') {
            return None;
        }
        let depth = self.child_depth(parent)?;
        Some(self.push_child(parent, XmlNode::comment(text, Some(parent), depth)))
    }

    /// Append a processing instruction. Returns None for an invalid or
    /// reserved (`xml`) target, or data containing `?>`.
    pub fn append_processing_instruction(&mut self, parent: NodeId, target: &str, data: &str) -> Option<NodeId> {
        if !is_valid_name(target) || target.eq_ignore_ascii_case("xml") || data.contains("?>") {
            return None;
        }
        let depth = self.child_depth(parent)?;
        Some(self.push_child(
            parent,
            XmlNode::processing_instruction(target, data, Some(parent), depth),
        ))
    }

    /// Depth of a new child of `parent`, if it may take one
    fn child_depth(&self, parent: NodeId) -> Option<u16> {
        self.get_node(parent)
            .filter(|n| n.is_container())
            .and_then(|n| n.depth.checked_add(1))
    }

    fn push_child(&mut self, parent: NodeId, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    fn push_element(&mut self, parent: NodeId, depth: u16, elem: StartElement<'_>) -> NodeId {
        let mut node = XmlNode::element(elem.name, Some(parent), depth);
        node.attributes = elem
            .attributes
            .into_iter()
            .map(|a| {
                let (name, value) = a.into_owned();
                XmlAttribute::new(name, value)
            })
            .collect();
        self.push_child(parent, node)
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let prev_last = self.nodes[parent_id as usize].last_child;

        if let Some(last_id) = prev_last {
            self.nodes[last_id as usize].next_sibling = Some(child_id);
            self.nodes[child_id as usize].prev_sibling = Some(last_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Remove every node except the document node, and its attributes
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT as usize] = XmlNode::document();
    }

    /// Serialize the whole tree
    pub fn to_xml(&self, options: &WriteOptions) -> String {
        write_tree(self, options)
    }

    /// Parse a well-formed document.
    ///
    /// The XML declaration and DOCTYPE are consumed but not stored. Text and
    /// CDATA inside an element are joined into its value; for elements with
    /// children, whitespace around that value is trimmed. A document with no
    /// root element parses to an empty tree.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut tree = XmlTree::new();
        let mut reader = SliceReader::new(input);
        // Open elements with their accumulated character data
        let mut stack: Vec<(NodeId, String)> = vec![(ROOT, String::new())];
        let mut seen_root = false;
        let mut seen_doctype = false;

        while let Some(event) = reader.next_event() {
            let at = reader.last_position();
            let at_top = stack.len() == 1;
            let parent = stack.last().map_or(ROOT, |(id, _)| *id);
            let depth = u16::try_from(stack.len()).ok();
            let too_deep = || ParseError::new("Maximum nesting depth exceeded", at);

            match event {
                XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_) if at_top && seen_root => {
                    return Err(ParseError::new("Document has multiple root elements", at));
                }

                XmlEvent::StartElement(elem) => {
                    seen_root |= at_top;
                    let id = tree.push_element(parent, depth.ok_or_else(too_deep)?, elem);
                    stack.push((id, String::new()));
                }

                XmlEvent::EmptyElement(elem) => {
                    seen_root |= at_top;
                    tree.push_element(parent, depth.ok_or_else(too_deep)?, elem);
                }

                XmlEvent::EndElement(end) => {
                    if at_top {
                        return Err(ParseError::new(
                            format!("Unexpected end tag: </{}> without matching start tag", end.name),
                            at,
                        ));
                    }
                    let (id, text) = stack.pop().unwrap_or((ROOT, String::new()));
                    let node = &mut tree.nodes[id as usize];
                    if node.name != end.name {
                        return Err(ParseError::new(
                            format!("Tag mismatch: <{}> closed with </{}>", node.name, end.name),
                            at,
                        ));
                    }
                    node.value = if node.has_children() {
                        text.trim().to_string()
                    } else {
                        text
                    };
                }

                XmlEvent::Text(content) => {
                    if at_top {
                        if !content.trim().is_empty() {
                            return Err(ParseError::new("Text content not allowed at document level", at));
                        }
                    } else if let Some((_, text)) = stack.last_mut() {
                        text.push_str(&content);
                    }
                }

                XmlEvent::CData(content) => {
                    if at_top {
                        return Err(ParseError::new("CDATA section not allowed at document level", at));
                    }
                    if let Some((_, text)) = stack.last_mut() {
                        text.push_str(content);
                    }
                }

                XmlEvent::Comment(content) => {
                    let depth = depth.ok_or_else(too_deep)?;
                    tree.push_child(parent, XmlNode::comment(content, Some(parent), depth));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let depth = depth.ok_or_else(too_deep)?;
                    tree.push_child(
                        parent,
                        XmlNode::processing_instruction(target, data.unwrap_or(""), Some(parent), depth),
                    );
                }

                XmlEvent::DocType(_) => {
                    if seen_doctype {
                        return Err(ParseError::new("Multiple DOCTYPE declarations not allowed", at));
                    }
                    if seen_root || !at_top {
                        return Err(ParseError::new("DOCTYPE must come before root element", at));
                    }
                    seen_doctype = true;
                }

                XmlEvent::XmlDeclaration => {}
            }
        }

        if let Some(err) = reader.into_error() {
            return Err(err);
        }
        if stack.len() > 1 {
            let unclosed = &tree.nodes[stack[1].0 as usize].name;
            return Err(ParseError::new(format!("Unclosed tag: <{}>", unclosed), input.len()));
        }

        Ok(tree)
    }
}

/// Check a string against the (ASCII-approximated) XML Name production
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.split_first() {
        Some((&first, rest)) => is_name_start_char(first) && rest.iter().all(|&b| is_name_char(b)),
        None => false,
    }
}

/// Iterator over child nodes
pub struct ChildIter<'a> {
    tree: &'a XmlTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (pre-order)
pub struct DescendantIter<'a> {
    tree: &'a XmlTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.tree.push_children_reversed(current, &mut self.stack);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::NodeKind;

    fn names(tree: &XmlTree, ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
        ids.into_iter()
            .map(|id| tree.name(id).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_parse_simple() {
        let tree = XmlTree::parse("<root>hello</root>").unwrap();
        let root = tree.root_element().unwrap();
        assert_eq!(tree.name(root), Some("root"));
        assert_eq!(tree.value(root), Some("hello"));
        assert_eq!(tree.get_node(root).unwrap().depth, 1);
    }

    #[test]
    fn test_parse_nested() {
        let tree = XmlTree::parse("<a><b><c/></b><d>x</d></a>").unwrap();
        let a = tree.root_element().unwrap();
        assert_eq!(names(&tree, tree.children(a)), vec!["b", "d"]);
        assert_eq!(names(&tree, tree.descendants(a)), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_value_joins_text_and_cdata() {
        let tree = XmlTree::parse("<a>x &amp; <![CDATA[<y>]]> z</a>").unwrap();
        assert_eq!(tree.value(tree.root_element().unwrap()), Some("x & <y> z"));
    }

    #[test]
    fn test_value_trimmed_only_with_children() {
        let tree = XmlTree::parse("<a>\n  v\n  <b>  keep  </b>\n</a>").unwrap();
        let a = tree.root_element().unwrap();
        let b = tree.children(a).next().unwrap();
        assert_eq!(tree.value(a), Some("v"));
        assert_eq!(tree.value(b), Some("  keep  "));
    }

    #[test]
    fn test_prolog_and_comments() {
        let tree = XmlTree::parse(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE r>\n<!-- top -->\n<r><?app go?></r>",
        )
        .unwrap();
        let kinds: Vec<_> = tree
            .descendants(ROOT)
            .map(|id| tree.get_node(id).unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![NodeKind::Comment, NodeKind::Element, NodeKind::ProcessingInstruction]);
    }

    #[test]
    fn test_empty_document_parses() {
        let tree = XmlTree::parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n").unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let msg = |s: &str| XmlTree::parse(s).unwrap_err().message;
        assert_eq!(msg("<a></b>"), "Tag mismatch: <a> closed with </b>");
        assert_eq!(msg("<a><b></b>"), "Unclosed tag: <a>");
        assert_eq!(msg("<a/><b/>"), "Document has multiple root elements");
        assert_eq!(msg("text<a/>"), "Text content not allowed at document level");
        assert_eq!(msg("</a>"), "Unexpected end tag: </a> without matching start tag");
        assert_eq!(msg("<a/><!DOCTYPE a>"), "DOCTYPE must come before root element");
        assert_eq!(msg("<a x='1' x='2'/>"), "Duplicate attribute");
    }

    #[test]
    fn test_build_programmatically() {
        let mut tree = XmlTree::new();
        let root = tree.append_element(ROOT, "config").unwrap();
        let item = tree.append_text_element(root, "item", "v").unwrap();
        assert!(tree.set_attribute(item, "id", "7"));
        assert_eq!(tree.attribute(item, "id"), Some("7"));
        assert_eq!(tree.get_node(item).unwrap().depth, 2);

        assert!(tree.append_element(ROOT, "bad name").is_none());
        assert!(tree.append_comment(root, "a--b").is_none());
        assert!(tree.append_processing_instruction(root, "xml", "").is_none());
        assert!(!tree.set_attribute(ROOT, "id", "1"));
        assert!(!tree.set_attribute(item, "1d", "1"));
        assert!(tree.append_element(999, "x").is_none());
    }

    #[test]
    fn test_find_elements_includes_start_node() {
        let tree = XmlTree::parse("<item><a><item/></a><item/></item>").unwrap();
        let root = tree.root_element().unwrap();
        let found = tree.find_elements(root, "item");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], root);
        assert!(tree.find_elements(999, "item").is_empty());
    }

    fn nested(levels: usize) -> String {
        format!("{}{}", "<a>".repeat(levels), "</a>".repeat(levels))
    }

    #[test]
    fn test_depth_limit_on_append() {
        let levels = MAX_DEPTH as usize;
        let mut tree = XmlTree::parse(&nested(levels)).unwrap();
        let deepest = (tree.node_count() - 1) as NodeId;
        assert_eq!(tree.get_node(deepest).unwrap().depth, MAX_DEPTH);

        assert!(tree.append_element(deepest, "b").is_none());
        assert!(tree.append_text_element(deepest, "b", "v").is_none());
        assert!(tree.append_comment(deepest, "c").is_none());
        assert!(tree.append_processing_instruction(deepest, "pi", "").is_none());
        assert!(tree.set_value(deepest, "still fine"));
    }

    #[test]
    fn test_depth_limit_on_parse() {
        let err = XmlTree::parse(&nested(MAX_DEPTH as usize + 1)).unwrap_err();
        assert_eq!(err.message, "Maximum nesting depth exceeded");

        let levels = MAX_DEPTH as usize;
        let comment_too_deep = format!("{}<!--c-->{}", "<a>".repeat(levels), "</a>".repeat(levels));
        assert_eq!(
            XmlTree::parse(&comment_too_deep).unwrap_err().message,
            "Maximum nesting depth exceeded"
        );
    }

    #[test]
    fn test_clear() {
        let mut tree = XmlTree::parse("<a b='c'><d/></a>").unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.root_element().is_none());
        assert!(tree.append_element(ROOT, "fresh").is_some());
    }
}
