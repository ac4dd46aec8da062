//! XML Text Generation
//!
//! Serializes an XmlTree back to markup. Uses an explicit stack instead of
//! recursion so deep trees cannot overflow.

use super::node::{NodeId, NodeKind, ROOT};
use super::tree::XmlTree;
use crate::core::encoding::FileEncoding;
use crate::core::entities::{escape_attribute, escape_text};

/// Rules for turning a tree into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit `<?xml version="1.0" ...?>` first
    pub declaration: bool,
    /// Encoding named in the declaration, if any
    pub encoding: Option<FileEncoding>,
    /// Spaces per nesting level; None writes everything on one line
    pub indent: Option<usize>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            declaration: true,
            encoding: None,
            indent: Some(2),
        }
    }
}

impl WriteOptions {
    /// Single-line output without a declaration
    pub fn compact() -> Self {
        WriteOptions {
            declaration: false,
            encoding: None,
            indent: None,
        }
    }

    pub fn with_encoding(mut self, encoding: FileEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Serialize a whole tree
pub fn write_tree(tree: &XmlTree, options: &WriteOptions) -> String {
    let mut buf = String::with_capacity(1024);

    if options.declaration {
        buf.push_str("<?xml version=\"1.0\"");
        if let Some(encoding) = options.encoding {
            buf.push_str(" encoding=\"");
            buf.push_str(encoding.label());
            buf.push('"');
        }
        buf.push_str("?>");
        buf.push('\n');
    }

    write_node(tree, ROOT, options, &mut buf);
    buf
}

/// Serialize one node and its subtree
pub fn write_node(tree: &XmlTree, node_id: NodeId, options: &WriteOptions, buf: &mut String) {
    // Stack entries: Either entering a node or need to write closing tag
    enum StackEntry {
        Enter(NodeId),
        Close(NodeId),
    }

    let newline = if options.indent.is_some() { "\n" } else { "" };
    let base_depth = tree.get_node(node_id).map_or(0, |n| n.depth);
    let pad = |depth: u16, buf: &mut String| {
        if let Some(width) = options.indent {
            let level = depth.saturating_sub(base_depth.max(1)) as usize;
            buf.extend(std::iter::repeat(' ').take(level * width));
        }
    };

    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close(id) => {
                if let Some(node) = tree.get_node(id) {
                    pad(node.depth, buf);
                    buf.push_str("</");
                    buf.push_str(&node.name);
                    buf.push('>');
                    buf.push_str(newline);
                }
            }
            StackEntry::Enter(current_id) => {
                let node = match tree.get_node(current_id) {
                    Some(n) => n,
                    None => continue,
                };

                match node.kind {
                    NodeKind::Document => {
                        push_children_reversed(tree, current_id, &mut stack, StackEntry::Enter);
                    }
                    NodeKind::Element => {
                        pad(node.depth, buf);
                        buf.push('<');
                        buf.push_str(&node.name);
                        for attr in &node.attributes {
                            buf.push(' ');
                            buf.push_str(&attr.name);
                            buf.push_str("=\"");
                            buf.push_str(&escape_attribute(&attr.value));
                            buf.push('"');
                        }

                        if !node.has_children() {
                            if node.value.is_empty() {
                                buf.push_str("/>");
                            } else {
                                buf.push('>');
                                buf.push_str(&escape_text(&node.value));
                                buf.push_str("</");
                                buf.push_str(&node.name);
                                buf.push('>');
                            }
                            buf.push_str(newline);
                        } else {
                            buf.push('>');
                            buf.push_str(&escape_text(&node.value));
                            buf.push_str(newline);

                            // Closing tag is processed after the children
                            stack.push(StackEntry::Close(current_id));
                            push_children_reversed(tree, current_id, &mut stack, StackEntry::Enter);
                        }
                    }
                    NodeKind::Comment => {
                        pad(node.depth, buf);
                        buf.push_str("<!--");
                        buf.push_str(&node.value);
                        buf.push_str("-->");
                        buf.push_str(newline);
                    }
                    NodeKind::ProcessingInstruction => {
                        pad(node.depth, buf);
                        buf.push_str("<?");
                        buf.push_str(&node.name);
                        if !node.value.is_empty() {
                            buf.push(' ');
                            buf.push_str(&node.value);
                        }
                        buf.push_str("?>");
                        buf.push_str(newline);
                    }
                }
            }
        }
    }

    fn push_children_reversed<E>(tree: &XmlTree, id: NodeId, stack: &mut Vec<E>, wrap: fn(NodeId) -> E) {
        let children: Vec<NodeId> = tree.children(id).collect();
        stack.extend(children.into_iter().rev().map(wrap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_output() {
        let tree = XmlTree::parse("<a x=\"1\"><b>t</b><c/></a>").unwrap();
        assert_eq!(tree.to_xml(&WriteOptions::compact()), "<a x=\"1\"><b>t</b><c/></a>");
    }

    #[test]
    fn test_indented_output_with_declaration() {
        let tree = XmlTree::parse("<a>v<b><c>t</c></b><!--note--></a>").unwrap();
        let xml = tree.to_xml(&WriteOptions::default().with_encoding(FileEncoding::Utf8));
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <a>v\n\
             \x20\x20<b>\n\
             \x20\x20\x20\x20<c>t</c>\n\
             \x20\x20</b>\n\
             \x20\x20<!--note-->\n\
             </a>\n"
        );
    }

    #[test]
    fn test_escaping() {
        let mut tree = XmlTree::new();
        let a = tree.append_text_element(ROOT, "a", "1 < 2 & \"q\"").unwrap();
        tree.set_attribute(a, "title", "say \"hi\" <now>");
        assert_eq!(
            tree.to_xml(&WriteOptions::compact()),
            "<a title=\"say &quot;hi&quot; &lt;now&gt;\">1 &lt; 2 &amp; \"q\"</a>"
        );
    }

    #[test]
    fn test_attribute_whitespace_survives_roundtrip() {
        let mut tree = XmlTree::new();
        let a = tree.append_element(ROOT, "a").unwrap();
        tree.set_attribute(a, "lines", "one\ntwo\tthree\r");
        let xml = tree.to_xml(&WriteOptions::compact());
        assert_eq!(xml, "<a lines=\"one&#10;two&#9;three&#13;\"/>");

        let reparsed = XmlTree::parse(&xml).unwrap();
        let a = reparsed.root_element().unwrap();
        assert_eq!(reparsed.attribute(a, "lines"), Some("one\ntwo\tthree\r"));
    }

    #[test]
    fn test_empty_tree_with_declaration() {
        let tree = XmlTree::new();
        assert_eq!(tree.to_xml(&WriteOptions::default()), "<?xml version=\"1.0\"?>\n");
        assert_eq!(tree.to_xml(&WriteOptions::compact()), "");
    }

    #[test]
    fn test_write_subtree() {
        let tree = XmlTree::parse("<a><b><c/></b></a>").unwrap();
        let b = tree.find_elements(ROOT, "b")[0];
        let mut buf = String::new();
        write_node(&tree, b, &WriteOptions::default(), &mut buf);
        assert_eq!(buf, "<b>\n  <c/>\n</b>\n");
    }
}
